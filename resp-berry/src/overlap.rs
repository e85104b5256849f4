//! DICE 重叠评分.
//!
//! `score = 2·|A∩B| / (|A|+|B|)`, 其中 `|·|` 为前景体素个数.
//!
//! 两个掩膜都不存在前景时 (`|A|+|B| = 0`), 约定返回 `1.0`:
//! "都没有前景" 视为完全一致. 这是有意的约定, 而不是除零的副产物.
//!
//! 形状不一致的两个掩膜无法逐体素比较, 评分函数直接返回 [`ShapeMismatch`],
//! 不会给出任何数值.

use crate::{BinaryMask, Idx3d};
use thiserror::Error;

/// 两个掩膜形状不一致.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("形状不一致: {left:?} vs {right:?}")]
pub struct ShapeMismatch {
    /// 左侧掩膜 (z, H, W) 形状.
    pub left: Idx3d,

    /// 右侧掩膜 (z, H, W) 形状.
    pub right: Idx3d,
}

/// 重叠计数.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OverlapCounts {
    /// 左侧前景体素数.
    pub left: usize,

    /// 右侧前景体素数.
    pub right: usize,

    /// 交集体素数.
    pub intersection: usize,
}

impl OverlapCounts {
    /// 由计数求 DICE 系数. 两侧均为空时返回 `1.0`.
    #[inline]
    pub fn dice(&self) -> f64 {
        match self.left + self.right {
            0 => 1.0,
            total => 2.0 * self.intersection as f64 / total as f64,
        }
    }

    /// 两侧是否都没有前景.
    #[inline]
    pub fn both_empty(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

impl std::ops::Add for OverlapCounts {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            left: self.left + rhs.left,
            right: self.right + rhs.right,
            intersection: self.intersection + rhs.intersection,
        }
    }
}

#[inline]
fn check_shape(a: &BinaryMask, b: &BinaryMask) -> Result<(), ShapeMismatch> {
    if a.shape() == b.shape() {
        Ok(())
    } else {
        Err(ShapeMismatch {
            left: a.shape(),
            right: b.shape(),
        })
    }
}

/// 单次遍历统计两个掩膜的前景体素数与交集体素数.
pub fn overlap_counts(a: &BinaryMask, b: &BinaryMask) -> Result<OverlapCounts, ShapeMismatch> {
    check_shape(a, b)?;
    Ok(a.data()
        .iter()
        .zip(b.data().iter())
        .fold(OverlapCounts::default(), |mut acc, (&x, &y)| {
            acc.left += x as usize;
            acc.right += y as usize;
            acc.intersection += (x && y) as usize;
            acc
        }))
}

/// 计算两个掩膜的 DICE 系数, 结果位于 `[0, 1]`.
///
/// 形状不一致时返回 `Err`.
#[inline]
pub fn dice_score(a: &BinaryMask, b: &BinaryMask) -> Result<f64, ShapeMismatch> {
    overlap_counts(a, b).map(|c| c.dice())
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

        /// 借助 `rayon`, 按水平切片并行地统计重叠计数. 结果与 [`overlap_counts`] 完全一致.
        pub fn par_overlap_counts(a: &BinaryMask, b: &BinaryMask) -> Result<OverlapCounts, ShapeMismatch> {
            check_shape(a, b)?;
            let (da, db) = (a.data(), b.data());
            Ok(da
                .axis_iter(Axis(0))
                .into_par_iter()
                .zip(db.axis_iter(Axis(0)).into_par_iter())
                .map(|(sa, sb)| {
                    sa.iter().zip(sb.iter()).fold(OverlapCounts::default(), |mut acc, (&x, &y)| {
                        acc.left += x as usize;
                        acc.right += y as usize;
                        acc.intersection += (x && y) as usize;
                        acc
                    })
                })
                .reduce(OverlapCounts::default, |l, r| l + r))
        }

        /// 借助 `rayon` 并行计算 DICE 系数. 结果与 [`dice_score`] 完全一致.
        #[inline]
        pub fn par_dice_score(a: &BinaryMask, b: &BinaryMask) -> Result<f64, ShapeMismatch> {
            par_overlap_counts(a, b).map(|c| c.dice())
        }
    }
}
