use anyhow::Context;
use clap::Args;
use resp_berry::compare::{compare_folder, FileLoader, FolderScore};
use resp_berry::record::StructureTable;
use resp_berry::report::{self, FOLDER_SUMMARY};
use resp_berry::AnalysisConfig;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Folder {
    /// 金标准分割文件。
    #[arg(long = "ground-truth", short = 'g')]
    ground_truth: PathBuf,
    /// 待比较的分割目录。汇总表写入该目录。
    #[arg(long, short)]
    folder: PathBuf,
    /// 含 ITV 体积的结构统计表。
    #[arg(long = "itv-csv")]
    itv_csv: Option<PathBuf>,
}

impl Folder {
    pub fn run(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let table = match self.itv_csv {
            Some(ref p) => Some(
                StructureTable::from_path(p)
                    .with_context(|| format!("读取 `{}` 失败", p.display()))?,
            ),
            None => None,
        };

        let rows = compare_folder(
            &FileLoader,
            &self.ground_truth,
            &self.folder,
            table.as_ref(),
            config,
        )
        .with_context(|| format!("加载金标准 `{}` 失败", self.ground_truth.display()))?;

        let failed = rows
            .iter()
            .filter(|r| matches!(r.score, FolderScore::Error(_)))
            .count();
        println!("比较了 {} 个文件, {failed} 个出错", rows.len());

        let output = self.folder.join(FOLDER_SUMMARY);
        report::write_to_path(&output, &rows, |f, r| report::write_folder_csv(f, r))?;
        println!("汇总已保存至 `{}`", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::fs;

    #[test]
    fn test_run_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        let ones = Array3::<f32>::from_elem((2, 2, 2), 1.0);
        ndarray_npy::write_npy(folder.join("gt.npy"), &ones).unwrap();
        ndarray_npy::write_npy(folder.join("3_t1.npy"), &ones).unwrap();
        ndarray_npy::write_npy(
            folder.join("4_t1.npy"),
            &Array3::<f32>::from_elem((2, 2, 3), 1.0),
        )
        .unwrap();
        fs::write(folder.join("readme.txt"), "").unwrap();
        let itv = folder.join("itv.csv");
        fs::write(&itv, "series_id,name,volume\n3,t1,12.5\n").unwrap();

        let f = Folder {
            ground_truth: folder.join("gt.npy"),
            folder: folder.to_path_buf(),
            itv_csv: Some(itv),
        };
        f.run(&AnalysisConfig::default()).unwrap();

        let text = fs::read_to_string(folder.join(FOLDER_SUMMARY)).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "3_t1.npy,1.0000,12.5");
        assert!(rows[1].starts_with("4_t1.npy,ERROR,"));
    }

    #[test]
    fn test_missing_ground_truth() {
        let dir = tempfile::tempdir().unwrap();
        let f = Folder {
            ground_truth: dir.path().join("gt.npy"),
            folder: dir.path().to_path_buf(),
            itv_csv: None,
        };
        assert!(f.run(&AnalysisConfig::default()).is_err());
        assert!(!dir.path().join(FOLDER_SUMMARY).exists());
    }
}
