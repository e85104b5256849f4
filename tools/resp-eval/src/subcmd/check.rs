use anyhow::Context;
use clap::{Args, ValueEnum};
use resp_berry::compare::{FileLoader, VolumeLoader};
use resp_berry::{AnalysisConfig, BinaryMask, ProjectionAxis, SegVolume};
use std::path::{Path, PathBuf};

/// 投影方向.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Axis {
    /// 沿切片方向, 得到横断面.
    #[default]
    Z,
    /// 沿高方向, 得到冠状面.
    Height,
    /// 沿宽方向, 得到矢状面.
    Width,
}

impl From<Axis> for ProjectionAxis {
    fn from(value: Axis) -> Self {
        match value {
            Axis::Z => ProjectionAxis::Z,
            Axis::Height => ProjectionAxis::Height,
            Axis::Width => ProjectionAxis::Width,
        }
    }
}

#[derive(Args, Debug)]
pub struct Check {
    /// 待检查的分割文件。
    a: PathBuf,
    /// 用于检查体素对齐的另一个分割文件。
    b: Option<PathBuf>,
    /// 最大强度投影预览图输出路径（PNG）。
    #[arg(long, short)]
    projection: Option<PathBuf>,
    /// 投影方向。
    #[arg(long, value_enum, default_value_t = Axis::Z)]
    axis: Axis,
}

fn load(path: &Path) -> anyhow::Result<SegVolume> {
    let v = FileLoader
        .load(path)
        .with_context(|| format!("加载 `{}` 失败", path.display()))?;
    log::debug!("`{}`:\n{}", path.display(), v.header_summary());
    Ok(v)
}

impl Check {
    pub fn run(&self, config: &AnalysisConfig) -> anyhow::Result<()> {
        let a = load(&self.a)?;
        ::utils::sep();
        println!("`{}`:\n{}", self.a.display(), a.header_summary());

        if let Some(ref pb) = self.b {
            let b = load(pb)?;
            ::utils::sep();
            println!("`{}`:\n{}", pb.display(), b.header_summary());
            ::utils::sep();
            let al = a.alignment_with_tolerance(&b, config.affine_tolerance);
            if al.shape_match {
                println!("Shapes match.");
            } else {
                println!("Shapes are different!");
            }
            if al.affine_match {
                println!("Affines match, images are aligned voxel-wise.");
            } else {
                println!(
                    "Affine matrices differ (max |diff| = {:.6})!",
                    al.max_affine_diff
                );
            }
        }

        ::utils::sep();
        let mask = BinaryMask::from_volume_with(&a, config.mask_threshold);
        let comps = mask.components();
        println!("Number of components: {}", comps.count);
        match comps.count {
            0 => println!("No foreground detected."),
            1 => println!("Largest component: {} voxels, likely clean.", comps.largest),
            _ => println!(
                "Largest component: {} voxels, multiple components might contain speckles or noise.",
                comps.largest
            ),
        }

        if let Some(ref out) = self.projection {
            mask.save_projection(out, self.axis.into())?;
            println!("投影预览图已保存至 `{}`", out.display());
        }
        Ok(())
    }
}
