use anyhow::{anyhow, Context};
use clap::Args;
use resp_berry::compare::{score_volumes, FileLoader, VolumeLoader};
use resp_berry::AnalysisConfig;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Dice {
    /// 第一个分割文件（.nii, .nii.gz 或 .npy）。
    a: PathBuf,
    /// 第二个分割文件。
    b: PathBuf,
}

impl Dice {
    pub fn run(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let a = FileLoader
            .load(&self.a)
            .with_context(|| format!("加载 `{}` 失败", self.a.display()))?;
        let b = FileLoader
            .load(&self.b)
            .with_context(|| format!("加载 `{}` 失败", self.b.display()))?;

        let (counts, note) = score_volumes(&a, &b, config).map_err(|e| anyhow!(e))?;
        println!("DICE: {:.4}", counts.dice());
        println!(
            "voxels: {} / {} / {} (intersection)",
            counts.left, counts.right, counts.intersection
        );
        if !note.is_empty() {
            println!("note: {note}");
        }
        Ok(())
    }
}
