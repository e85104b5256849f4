//! 通用常量.

/// 体素值严格大于该阈值时视为前景.
pub const MASK_THRESHOLD: f32 = 0.5;

/// 判断两个仿射矩阵一致时, 每个元素允许的最大绝对误差.
pub const AFFINE_TOLERANCE: f64 = 1e-5;

/// 规范呼吸时相序列: 吸气 0% -> 100%, 再呼气 75% -> 25%.
pub const CANONICAL_PHASES: [&str; 8] = [
    "0in", "25in", "50in", "75in", "100in", "75ex", "50ex", "25ex",
];

/// 分割文件扩展名. 路径解析策略只查找该格式.
pub const SEG_EXT: &str = ".nii.gz";

/// 写入汇总表的不可计算分数占位符.
pub const NOT_AVAILABLE: &str = "N/A";

/// 写入汇总表的出错条目占位符.
pub const ERROR_MARK: &str = "ERROR";

/// 体素/像素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElemType {
    /// 值大于 [`MASK_THRESHOLD`], 代表前景.
    Foreground,

    /// 其余值, 代表背景.
    Background,
}

impl ElemType {
    /// 按照 [`MASK_THRESHOLD`] 对体素值分类. `NaN` 视为背景.
    #[inline]
    pub fn classify(value: f32) -> Self {
        if value > MASK_THRESHOLD {
            Self::Foreground
        } else {
            Self::Background
        }
    }

    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }
}

#[cfg(test)]
mod tests {
    use super::ElemType;

    #[test]
    fn test_classify_threshold_is_exclusive() {
        assert!(ElemType::classify(0.5).is_background());
        assert!(ElemType::classify(0.500_01).is_foreground());
        assert!(ElemType::classify(1.0).is_foreground());
        assert!(ElemType::classify(f32::NAN).is_background());
        assert!(ElemType::classify(-3.0).is_background());
    }
}
