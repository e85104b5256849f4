//! 金标准与目录内其它分割的逐个比较.

use super::{score_volumes, VolumeLoader};
use crate::config::AnalysisConfig;
use crate::error::LoadError;
use crate::record::StructureTable;
use std::path::Path;
use walkdir::WalkDir;

const VOLUME_EXTS: [&str; 3] = [".nii.gz", ".nii", ".npy"];

/// 单个文件的比较结果.
#[derive(Clone, Debug, PartialEq)]
pub enum FolderScore {
    /// 成功计算.
    Scored {
        /// DICE 系数.
        dice: f64,

        /// ITV 表中对应的体积 (mm³). 没有表或表中无对应记录时为 `None`.
        itv_volume: Option<f64>,
    },

    /// 加载, 文件名解析或评分失败, 附带原因.
    Error(String),
}

/// 目录汇总表中的一行.
#[derive(Clone, Debug, PartialEq)]
pub struct FolderRow {
    /// 文件名.
    pub filename: String,

    /// 结果.
    pub score: FolderScore,
}

/// 把 `{series_id}_{name}.nii.gz` 形式的文件名解析为 `(series_id, name)`.
///
/// `series_id` 必须是整数. 不符合格式时返回 `None`.
pub fn parse_seg_file_name(file_name: &str) -> Option<(i64, String)> {
    let stem = VOLUME_EXTS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))?;
    let (series, name) = stem.split_once('_')?;
    let series = series.trim().parse::<i64>().ok()?;
    (!name.is_empty()).then(|| (series, name.to_string()))
}

#[inline]
fn is_volume_file(file_name: &str) -> bool {
    VOLUME_EXTS.iter().any(|ext| file_name.ends_with(ext))
}

/// 将目录 `folder` 中除金标准以外的每个分割文件 (`.nii`, `.nii.gz`, `.npy`)
/// 与金标准 `ground_truth` 比较. 文件按文件名排序处理.
///
/// 金标准本身加载失败或目录无法读取时返回 `Err`; 其余单个文件的失败记为
/// [`FolderScore::Error`] 行.
pub fn compare_folder<L: VolumeLoader + ?Sized>(
    loader: &L,
    ground_truth: &Path,
    folder: &Path,
    itv_table: Option<&StructureTable>,
    config: &AnalysisConfig,
) -> Result<Vec<FolderRow>, LoadError> {
    let gt = loader.load(ground_truth)?;
    let gt_name = ground_truth.file_name();

    let mut rows = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.map_err(|e| LoadError::Io(e.into()))?;
        let path = entry.path();
        let Some(filename) = entry.file_name().to_str() else {
            continue;
        };
        if !entry.file_type().is_file() || !is_volume_file(filename) {
            continue;
        }
        if Some(entry.file_name()) == gt_name {
            continue;
        }

        let score = match score_file(loader, &gt, path, filename, itv_table, config) {
            Ok((dice, itv_volume)) => {
                log::info!("`{filename}`: DICE = {dice:.4}");
                FolderScore::Scored { dice, itv_volume }
            }
            Err(msg) => {
                log::warn!("`{filename}`: {msg}");
                FolderScore::Error(msg)
            }
        };
        rows.push(FolderRow {
            filename: filename.to_string(),
            score,
        });
    }
    Ok(rows)
}

fn score_file<L: VolumeLoader + ?Sized>(
    loader: &L,
    gt: &crate::SegVolume,
    path: &Path,
    filename: &str,
    itv_table: Option<&StructureTable>,
    config: &AnalysisConfig,
) -> Result<(f64, Option<f64>), String> {
    let pred = loader.load(path).map_err(|e| e.to_string())?;
    let (counts, _) = score_volumes(gt, &pred, config)?;
    let (series, name) = parse_seg_file_name(filename)
        .ok_or_else(|| format!("文件名 `{filename}` 不是 `{{整数序列号}}_{{结构名}}` 格式"))?;
    let itv_volume = itv_table.and_then(|t| t.volume_of(&series.to_string(), &name));
    Ok((counts.dice(), itv_volume))
}
