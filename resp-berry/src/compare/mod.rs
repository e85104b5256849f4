//! 批量比较.
//!
//! 路径解析 ([`SegResolver`]) 与体积加载 ([`VolumeLoader`]) 都由调用方注入.
//! 单个条目的任何失败 (找不到文件, 加载失败, 形状不一致) 都只会产生一条
//! [`Score::NotComputable`] 诊断行, 不会中断批次.

mod folder;
mod resolver;

pub use folder::{compare_folder, parse_seg_file_name, FolderRow, FolderScore};
pub use resolver::{FallbackResolver, PatientDirResolver, SegResolver};

use crate::config::AnalysisConfig;
use crate::error::{LoadError, TableError};
use crate::overlap::{overlap_counts, OverlapCounts};
use crate::record::StructureTable;
use crate::{BinaryMask, SegVolume};
use std::fmt;
use std::path::{Path, PathBuf};

/// 体积加载能力.
pub trait VolumeLoader {
    /// 加载 `path` 处的分割体积.
    fn load(&self, path: &Path) -> Result<SegVolume, LoadError>;
}

/// 从本地文件加载. `.npy` 由 `ndarray-npy` 读取, 其余按 NIfTI 读取.
#[derive(Copy, Clone, Debug, Default)]
pub struct FileLoader;

impl VolumeLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<SegVolume, LoadError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("npy") => SegVolume::open_npy(path),
            _ => SegVolume::open(path),
        }
    }
}

/// 比较的一侧: 模态与序列.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparisonSide {
    /// 模态名, 如 `MRI`, `CT`.
    pub modality: String,

    /// 序列标识.
    pub series: String,
}

impl ComparisonSide {
    /// 创建.
    pub fn new(modality: impl Into<String>, series: impl Into<String>) -> Self {
        Self {
            modality: modality.into(),
            series: series.into(),
        }
    }
}

impl fmt::Display for ComparisonSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.modality, self.series)
    }
}

/// 比较得分.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Score {
    /// DICE 系数, 位于 `[0, 1]`.
    Value(f64),

    /// 缺少输入, 形状不一致或加载失败.
    NotComputable,
}

impl Score {
    /// 数值得分.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::NotComputable => None,
        }
    }
}

/// 单个结构的比较结果.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonResult {
    /// 结构名.
    pub structure: String,

    /// 第一侧的文件路径.
    pub path_a: Option<PathBuf>,

    /// 第二侧的文件路径.
    pub path_b: Option<PathBuf>,

    /// 得分.
    pub score: Score,

    /// 体素计数. 只有成功计算时存在.
    pub counts: Option<OverlapCounts>,

    /// 诊断信息. 正常情况下为空.
    pub note: String,
}

impl ComparisonResult {
    fn not_computable(
        structure: &str,
        path_a: Option<PathBuf>,
        path_b: Option<PathBuf>,
        note: String,
    ) -> Self {
        log::warn!("`{structure}`: {note}");
        Self {
            structure: structure.to_string(),
            path_a,
            path_b,
            score: Score::NotComputable,
            counts: None,
            note,
        }
    }
}

/// 把两个已加载的体积二值化后评分. 形状不一致时为 `Err(诊断信息)`.
///
/// 形状一致但仿射矩阵超出容差时仍然评分, 诊断信息写入返回的 note.
pub fn score_volumes(
    a: &SegVolume,
    b: &SegVolume,
    config: &AnalysisConfig,
) -> Result<(OverlapCounts, String), String> {
    let ma = BinaryMask::from_volume_with(a, config.mask_threshold);
    let mb = BinaryMask::from_volume_with(b, config.mask_threshold);
    let counts = overlap_counts(&ma, &mb).map_err(|e| e.to_string())?;

    let mut notes = Vec::new();
    let alignment = a.alignment_with_tolerance(b, config.affine_tolerance);
    if !alignment.affine_match {
        notes.push(format!(
            "仿射矩阵不一致 (最大差 {:.6})",
            alignment.max_affine_diff
        ));
    }
    if counts.both_empty() {
        notes.push("两侧均无前景".to_string());
    }
    Ok((counts, notes.join("; ")))
}

/// 对每个结构: 解析两侧路径, 加载, 检查形状并计算 DICE 系数.
///
/// 使用默认参数, 见 [`compare_structures_with`].
pub fn compare_structures<R, L, S>(
    resolver: &R,
    loader: &L,
    side_a: &ComparisonSide,
    side_b: &ComparisonSide,
    structures: &[S],
) -> Vec<ComparisonResult>
where
    R: SegResolver + ?Sized,
    L: VolumeLoader + ?Sized,
    S: AsRef<str>,
{
    compare_structures_with(
        resolver,
        loader,
        side_a,
        side_b,
        structures,
        &AnalysisConfig::default(),
    )
}

/// 同 [`compare_structures`], 二值化阈值与仿射容差取自 `config`.
pub fn compare_structures_with<R, L, S>(
    resolver: &R,
    loader: &L,
    side_a: &ComparisonSide,
    side_b: &ComparisonSide,
    structures: &[S],
    config: &AnalysisConfig,
) -> Vec<ComparisonResult>
where
    R: SegResolver + ?Sized,
    L: VolumeLoader + ?Sized,
    S: AsRef<str>,
{
    structures
        .iter()
        .map(|s| compare_one(resolver, loader, side_a, side_b, s.as_ref(), config))
        .collect()
}

fn compare_one<R, L>(
    resolver: &R,
    loader: &L,
    side_a: &ComparisonSide,
    side_b: &ComparisonSide,
    structure: &str,
    config: &AnalysisConfig,
) -> ComparisonResult
where
    R: SegResolver + ?Sized,
    L: VolumeLoader + ?Sized,
{
    let path_a = resolver.resolve(&side_a.modality, &side_a.series, structure);
    let path_b = resolver.resolve(&side_b.modality, &side_b.series, structure);
    log::debug!("`{structure}`: {side_a} -> {path_a:?}, {side_b} -> {path_b:?}");

    let (pa, pb) = match (&path_a, &path_b) {
        (Some(pa), Some(pb)) => (pa, pb),
        _ => {
            let missing: Vec<String> = [(side_a, &path_a), (side_b, &path_b)]
                .into_iter()
                .filter(|(_, p)| p.is_none())
                .map(|(side, _)| side.to_string())
                .collect();
            let note = format!("找不到分割文件: {}", missing.join(", "));
            return ComparisonResult::not_computable(structure, path_a, path_b, note);
        }
    };

    let loaded = loader
        .load(pa)
        .map_err(|e| format!("加载 `{}` 失败: {e}", pa.display()))
        .and_then(|a| {
            loader
                .load(pb)
                .map(|b| (a, b))
                .map_err(|e| format!("加载 `{}` 失败: {e}", pb.display()))
        });
    let (va, vb) = match loaded {
        Ok(v) => v,
        Err(note) => return ComparisonResult::not_computable(structure, path_a, path_b, note),
    };

    match score_volumes(&va, &vb, config) {
        Ok((counts, mut note)) => {
            if pa == pb {
                log::warn!("`{structure}`: 两侧解析到同一文件 `{}`", pa.display());
                let same = format!("两侧解析到同一文件 `{}`", pa.display());
                note = if note.is_empty() {
                    same
                } else {
                    format!("{same}; {note}")
                };
            }
            let score = counts.dice();
            log::info!("`{structure}`: DICE = {score:.4}");
            ComparisonResult {
                structure: structure.to_string(),
                path_a,
                path_b,
                score: Score::Value(score),
                counts: Some(counts),
                note,
            }
        }
        Err(note) => ComparisonResult::not_computable(structure, path_a, path_b, note),
    }
}

/// 两张表中各自指定序列的结构名交集, 有序.
pub fn common_structures(
    table_a: &StructureTable,
    series_a: &str,
    table_b: &StructureTable,
    series_b: &str,
) -> Vec<String> {
    let names_b = table_b.names_in_series(series_b);
    table_a
        .names_in_series(series_a)
        .intersection(&names_b)
        .map(|s| s.to_string())
        .collect()
}

/// 结构性检查: `table` 中必须存在序列 `series` 以及其中的结构 `name`.
#[inline]
pub fn verify_structure(table: &StructureTable, series: &str, name: &str) -> Result<(), TableError> {
    table.require(series, name).map(|_| ())
}
