use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use resp_berry::compare::{
    common_structures, compare_structures_with, verify_structure, ComparisonSide,
    FallbackResolver, FileLoader, PatientDirResolver, SegResolver,
};
use resp_berry::consts::NOT_AVAILABLE;
use resp_berry::record::StructureTable;
use resp_berry::report::{self, COMPARISON_SUMMARY};
use resp_berry::{AnalysisConfig, ConfigError};
use std::path::{Path, PathBuf};

/// 分割文件目录布局.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Layout {
    /// 依次尝试若干常见布局, 最后递归搜索.
    #[default]
    Fallback,
    /// `{模态}_pat{病人}_segmentations/{序列}_{结构}.nii.gz`.
    Patient,
}

#[derive(Args, Debug)]
pub struct Compare {
    /// 数据根目录。缺省时取环境变量 `RESP_EVAL_DATA_DIR`, 再缺省为 `$HOME/dataset/resp`。
    #[arg(long = "base-dir", short = 'D')]
    base_dir: Option<PathBuf>,
    /// 第一个模态名。
    #[arg(long)]
    modality1: String,
    /// 第一个模态的序列。
    #[arg(long)]
    series1: String,
    /// 第二个模态名。
    #[arg(long)]
    modality2: String,
    /// 第二个模态的序列。
    #[arg(long)]
    series2: String,
    /// 只比较单个结构。
    #[arg(long, conflicts_with = "structures")]
    structure: Option<String>,
    /// 逗号分隔的结构列表。缺省时比较两张表共有的全部结构。
    #[arg(long, value_delimiter = ',')]
    structures: Option<Vec<String>>,
    /// 第一个模态的结构统计表。缺省时在根目录下查找文件名包含模态名的 CSV。
    #[arg(long)]
    csv1: Option<PathBuf>,
    /// 第二个模态的结构统计表。
    #[arg(long)]
    csv2: Option<PathBuf>,
    /// 分割文件目录布局。
    #[arg(long, value_enum, default_value_t = Layout::Fallback)]
    pub(crate) layout: Layout,
    /// 病人编号，`--layout patient` 时必需。
    #[arg(long)]
    patient: Option<String>,
    /// 汇总表输出路径。缺省为根目录下的 `dice_summary.csv`。
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Compare {
    /// 显式给出的结构列表.
    pub(crate) fn structure_list(&self) -> Option<Vec<String>> {
        match (&self.structure, &self.structures) {
            (Some(s), _) => Some(vec![s.clone()]),
            (None, Some(v)) => Some(v.iter().map(|s| s.trim().to_string()).collect()),
            (None, None) => None,
        }
    }

    fn resolver(&self, base_dir: &Path) -> Result<Box<dyn SegResolver>, ConfigError> {
        let resolver: Box<dyn SegResolver> = match self.layout {
            Layout::Fallback => Box::new(FallbackResolver::new(base_dir)),
            Layout::Patient => {
                let patient = self
                    .patient
                    .as_deref()
                    .ok_or(ConfigError::MissingParameter("patient"))?;
                Box::new(PatientDirResolver::new(base_dir, patient))
            }
        };
        Ok(resolver)
    }

    fn table(
        base_dir: &Path,
        modality: &str,
        explicit: Option<&PathBuf>,
    ) -> anyhow::Result<StructureTable> {
        let path = ::utils::loader::find_table(base_dir, modality, explicit.map(|p| p.as_path()))?;
        StructureTable::from_path(&path).with_context(|| format!("读取 `{}` 失败", path.display()))
    }

    pub fn run(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let base_dir = ::utils::loader::data_dir_or_default(self.base_dir.as_deref(), "base-dir")?;
        let resolver = self.resolver(&base_dir)?;
        let table1 = Self::table(&base_dir, &self.modality1, self.csv1.as_ref())?;
        let table2 = Self::table(&base_dir, &self.modality2, self.csv2.as_ref())?;

        let structures = match self.structure_list() {
            Some(list) => {
                for name in list.iter() {
                    verify_structure(&table1, &self.series1, name)?;
                    verify_structure(&table2, &self.series2, name)?;
                }
                list
            }
            None => common_structures(&table1, &self.series1, &table2, &self.series2),
        };
        if structures.is_empty() {
            bail!(
                "`{}/{}` 与 `{}/{}` 没有共同的结构",
                self.modality1,
                self.series1,
                self.modality2,
                self.series2
            );
        }

        let side1 = ComparisonSide::new(&self.modality1, &self.series1);
        let side2 = ComparisonSide::new(&self.modality2, &self.series2);
        log::info!("比较 {side1} 与 {side2}: {} 个结构", structures.len());
        let results =
            compare_structures_with(&resolver, &FileLoader, &side1, &side2, &structures, config);

        ::utils::sep();
        let mut buf = Vec::with_capacity(512);
        report::describe_comparisons_into(&results, &mut buf)?;
        print!("{}", String::from_utf8_lossy(&buf));
        for r in results.iter() {
            let v1 = table1.volume_of(&self.series1, &r.structure);
            let v2 = table2.volume_of(&self.series2, &r.structure);
            println!(
                "    {} volume (mm³): {} / {}",
                r.structure,
                v1.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}")),
                v2.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}")),
            );
        }
        ::utils::sep();

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| base_dir.join(COMPARISON_SUMMARY));
        report::write_to_path(&output, &results, |f, r| report::write_comparison_csv(f, r))?;
        println!("汇总已保存至 `{}`", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn compare(base: &Path, structure: Option<&str>) -> Compare {
        Compare {
            base_dir: Some(base.to_path_buf()),
            modality1: "MRI".to_string(),
            series1: "0in".to_string(),
            modality2: "CT".to_string(),
            series2: "0in".to_string(),
            structure: structure.map(|s| s.to_string()),
            structures: None,
            csv1: None,
            csv2: None,
            layout: Layout::Fallback,
            patient: None,
            output: None,
        }
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        fs::write(
            base.join("mri_stats.csv"),
            "series_id,name,volume\n0in,t1,10.0\n0in,t2,20.0\n",
        )
        .unwrap();
        fs::write(base.join("ct_stats.csv"), "series_id,name,volume\n0in,t1,11.0\n").unwrap();
        dir
    }

    #[test]
    fn test_run_common_structures() {
        let dir = fixture();
        let base = dir.path();
        compare(base, None).run(&AnalysisConfig::default()).unwrap();

        let text = fs::read_to_string(base.join(COMPARISON_SUMMARY)).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        // 只有 t1 在两张表中都出现; 没有分割文件, 记为不可计算.
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("t1,N/A,N/A,N/A,"));
    }

    #[test]
    fn test_run_rejects_unknown_structure() {
        let dir = fixture();
        assert!(compare(dir.path(), Some("t2"))
            .run(&AnalysisConfig::default())
            .is_err());
        assert!(!dir.path().join(COMPARISON_SUMMARY).exists());
    }

    #[test]
    fn test_patient_layout_requires_patient() {
        let dir = fixture();
        let mut c = compare(dir.path(), None);
        c.layout = Layout::Patient;
        assert!(c.run(&AnalysisConfig::default()).is_err());
    }
}
