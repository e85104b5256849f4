use super::parsers::order_by_valid;
use anyhow::Context;
use clap::Args;
use resp_berry::displacement::{absolute_magnitude, OrderBy};
use resp_berry::record::StructureTable;
use resp_berry::report::{self, DisplacementRow};
use resp_berry::AnalysisConfig;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Magnitude {
    /// 结构统计表。
    #[arg(long, short)]
    table: PathBuf,
    /// 逗号分隔的结构列表, 每个结构一个面板。
    #[arg(long, short, value_delimiter = ',', required = true)]
    pub(crate) structures: Vec<String>,
    /// 排序方式：phase, numeric 或 auto。
    #[arg(long, default_value = "auto", value_parser = order_by_valid)]
    pub(crate) order: OrderBy,
    /// 输出目录。缺省为统计表所在目录。
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Magnitude {
    pub fn run(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let table = StructureTable::from_path(&self.table)
            .with_context(|| format!("读取 `{}` 失败", self.table.display()))?
            .without_averages();

        let mut panels = Vec::with_capacity(self.structures.len());
        let mut rows = Vec::new();
        for name in self.structures.iter().map(|s| s.trim()) {
            let results = absolute_magnitude(table.records(), name, self.order, &config.phase_order)?;
            if results.is_empty() {
                log::warn!("`{name}` 没有完整坐标的记录");
            }
            rows.extend(DisplacementRow::from_results(table.source(), name, &results));
            panels.push((name.to_string(), results));
        }

        let out_dir = match self.output {
            Some(ref d) => d.clone(),
            None => self
                .table
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default(),
        };
        std::fs::create_dir_all(&out_dir)?;
        let stem = self
            .table
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let svg = out_dir.join(format!("{stem}_magnitude.svg"));
        report::plot::plot_magnitudes(&panels, &svg)?;
        println!("模长曲线已保存至 `{}`", svg.display());

        let csv = out_dir.join(format!("{stem}_magnitude.csv"));
        report::write_to_path(&csv, &rows, |f, r| report::write_displacement_csv(f, r))?;
        println!("汇总已保存至 `{}`", csv.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_run_writes_panels_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("scan1.csv");
        fs::write(
            &table,
            "series_id,name,x,y,z\n\
             0in,t1,3.0,4.0,0.0\n\
             25in,t1,0.0,0.0,5.0\n\
             0in,t2,1.0,2.0,2.0\n\
             25in,t2,nan,2.0,2.0\n\
             Average,t1,1.0,1.0,1.0\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        let m = Magnitude {
            table: table.clone(),
            structures: vec!["t1".to_string(), " t2".to_string(), "t3".to_string()],
            order: OrderBy::Auto,
            output: Some(out.clone()),
        };
        m.run(&AnalysisConfig::default()).unwrap();

        assert!(out.join("scan1_magnitude.svg").is_file());
        let text = fs::read_to_string(out.join("scan1_magnitude.csv")).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| !r.contains("Average") && !r.contains("NaN")));
        assert_eq!(rows.iter().filter(|r| r.contains(",t2,")).count(), 1);
    }

    #[test]
    fn test_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let m = Magnitude {
            table: dir.path().join("missing.csv"),
            structures: vec!["t1".to_string()],
            order: OrderBy::Auto,
            output: None,
        };
        assert!(m.run(&AnalysisConfig::default()).is_err());
    }
}
