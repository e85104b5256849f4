use super::parsers::{coord_axis_valid, order_by_valid};
use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use resp_berry::displacement::{relative_displacement, OrderBy};
use resp_berry::record::{CoordAxis, StructureTable};
use resp_berry::report::{self, DisplacementRow, DISPLACEMENT_SUMMARY};
use resp_berry::AnalysisConfig;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 输入表格式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum TableFormat {
    /// `series_id, name, x, y, z, volume` 宽表.
    #[default]
    Stats,
    /// `phase, axis, com` 长表.
    AxisCom,
}

#[derive(Args, Debug)]
pub struct Displacement {
    /// 结构统计表所在目录。处理其中每个 CSV 文件。缺省时取环境变量 `RESP_EVAL_DATA_DIR`,
    /// 再缺省为 `$HOME/dataset/resp`。
    #[arg(long, short)]
    folder: Option<PathBuf>,
    /// 结构名。
    #[arg(long, short)]
    structure: String,
    /// 参考时相/序列。缺省时使用配置中的参考, 再缺省为时相序列的第一个。
    #[arg(long, short)]
    reference: Option<String>,
    /// 排序方式：phase, numeric 或 auto。
    #[arg(long, default_value = "phase", value_parser = order_by_valid)]
    pub(crate) order: OrderBy,
    /// 坐标轴：x, y 或 z。
    #[arg(long, default_value = "z", value_parser = coord_axis_valid)]
    pub(crate) axis: CoordAxis,
    /// 输入表格式。
    #[arg(long, value_enum, default_value_t = TableFormat::Stats)]
    pub(crate) format: TableFormat,
    /// 输出目录。缺省为输入目录。
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Displacement {
    fn input_tables(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut tables = Vec::new();
        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        {
            let entry = entry.with_context(|| format!("无法读取 `{}`", folder.display()))?;
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_file() && name.ends_with(".csv") && name != DISPLACEMENT_SUMMARY {
                tables.push(entry.path().to_path_buf());
            }
        }
        Ok(tables)
    }

    fn load(&self, path: &Path) -> anyhow::Result<StructureTable> {
        let table = match self.format {
            TableFormat::Stats => StructureTable::from_path(path)?.without_averages(),
            TableFormat::AxisCom => StructureTable::from_axis_com_path(path, &self.structure)?,
        };
        Ok(table)
    }

    fn process(
        &self,
        path: &Path,
        out_dir: &Path,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Vec<DisplacementRow>> {
        let table = self.load(path)?;
        let reference = self.reference.as_deref().or(config.reference.as_deref());
        let results = relative_displacement(
            table.records(),
            &self.structure,
            reference,
            self.order,
            &config.phase_order,
            self.axis,
        )?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let svg = out_dir.join(format!("{stem}_disp_{}.svg", self.structure));
        report::plot::plot_displacement(&results, &format!("{stem}: {}", self.structure), &svg)?;

        let mut buf = Vec::new();
        report::describe_displacement_into(&self.structure, &results, &mut buf)?;
        print!("{stem}: {}", String::from_utf8_lossy(&buf));

        let source = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(DisplacementRow::from_results(&source, &self.structure, &results))
    }

    pub fn run(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let folder = ::utils::loader::data_dir_or_default(self.folder.as_deref(), "folder")?;
        let tables = Self::input_tables(&folder)?;
        if tables.is_empty() {
            bail!("`{}` 中没有 CSV 表", folder.display());
        }
        let out_dir = self.output.as_deref().unwrap_or(&folder);
        std::fs::create_dir_all(out_dir)?;

        let mut rows = Vec::new();
        for path in tables.iter() {
            log::info!("处理 `{}`", path.display());
            match self.process(path, out_dir, config) {
                Ok(r) => rows.extend(r),
                // 单个文件时直接报错.
                Err(e) if tables.len() == 1 => {
                    return Err(e.context(format!("处理 `{}` 失败", path.display())))
                }
                Err(e) => log::warn!("跳过 `{}`: {e:#}", path.display()),
            }
        }

        let output = out_dir.join(DISPLACEMENT_SUMMARY);
        report::write_to_path(&output, &rows, |f, r| report::write_displacement_csv(f, r))?;
        println!("汇总已保存至 `{}`", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = "series_id,name,x,y,z,volume\n0in,t1,0.0,0.0,10.0,1.0\n25in,t1,0.0,0.0,12.5,1.0\n";
    // 缺少参考时相 `0in`.
    const NO_REFERENCE: &str = "series_id,name,x,y,z,volume\n25in,t1,0.0,0.0,12.5,1.0\n";

    fn displacement(folder: &Path) -> Displacement {
        Displacement {
            folder: Some(folder.to_path_buf()),
            structure: "t1".to_string(),
            reference: None,
            order: OrderBy::Phase,
            axis: CoordAxis::Z,
            format: TableFormat::Stats,
            output: None,
        }
    }

    fn summary_rows(folder: &Path) -> Vec<String> {
        fs::read_to_string(folder.join(DISPLACEMENT_SUMMARY))
            .unwrap()
            .lines()
            .skip(1)
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_bad_table_skipped_among_many() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        fs::write(folder.join("a_valid.csv"), VALID).unwrap();
        fs::write(folder.join("b_bad.csv"), NO_REFERENCE).unwrap();

        displacement(folder).run(&AnalysisConfig::default()).unwrap();
        let rows = summary_rows(folder);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.starts_with("a_valid.csv,t1,")));
        assert!(folder.join("a_valid_disp_t1.svg").is_file());
        assert!(!folder.join("b_bad_disp_t1.svg").exists());
    }

    #[test]
    fn test_single_bad_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        fs::write(folder.join("b_bad.csv"), NO_REFERENCE).unwrap();
        // 旧的汇总表不算输入, 否则会变成 "多个输入" 而跳过出错的表.
        fs::write(folder.join(DISPLACEMENT_SUMMARY), "source,structure,key,displacement\n").unwrap();

        assert!(displacement(folder).run(&AnalysisConfig::default()).is_err());
    }

    #[test]
    fn test_summary_not_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        fs::write(folder.join("a_valid.csv"), VALID).unwrap();
        fs::write(folder.join("notes.txt"), "").unwrap();
        fs::write(folder.join(DISPLACEMENT_SUMMARY), "stale").unwrap();

        assert_eq!(
            Displacement::input_tables(folder).unwrap(),
            [folder.join("a_valid.csv")]
        );
        displacement(folder).run(&AnalysisConfig::default()).unwrap();
        displacement(folder).run(&AnalysisConfig::default()).unwrap();
        assert_eq!(summary_rows(folder).len(), 2);
    }

    #[test]
    fn test_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(displacement(dir.path()).run(&AnalysisConfig::default()).is_err());
    }
}
