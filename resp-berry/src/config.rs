//! 分析参数.

use crate::consts::{AFFINE_TOLERANCE, MASK_THRESHOLD};
use crate::error::ConfigError;
use crate::phase::PhaseOrder;
use serde::{Deserialize, Serialize};

/// 一次分析共享的参数. 所有字段都有默认值, 由调用方显式传递.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 呼吸时相顺序.
    pub phase_order: PhaseOrder,

    /// 参考时相/序列. 缺省时取 `phase_order` 的第一个时相.
    pub reference: Option<String>,

    /// 二值化阈值, 严格大于该值为前景.
    pub mask_threshold: f32,

    /// 仿射矩阵逐元素比较容差.
    pub affine_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            phase_order: PhaseOrder::canonical(),
            reference: None,
            mask_threshold: MASK_THRESHOLD,
            affine_tolerance: AFFINE_TOLERANCE,
        }
    }
}

impl AnalysisConfig {
    /// 实际使用的参考键.
    #[inline]
    pub fn reference(&self) -> &str {
        self.reference
            .as_deref()
            .unwrap_or_else(|| self.phase_order.first())
    }

    /// 检查数值参数.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mask_threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.mask_threshold));
        }
        if !self.affine_tolerance.is_finite() || self.affine_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.affine_tolerance));
        }
        Ok(())
    }
}
