//! 呼吸时相顺序.

use crate::consts::CANONICAL_PHASES;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 规范化时相标签: 去除首尾空白并转为小写.
#[inline]
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// 由调用方给定的呼吸时相全序. 只作为排序键使用.
///
/// 内部标签均已规范化 (见 [`normalize_label`]), 且互不重复.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PhaseOrder {
    labels: Vec<String>,
}

impl PhaseOrder {
    /// 从标签序列创建. 标签会被规范化; 序列为空或存在重复时返回 `Err`.
    pub fn new<I, S>(labels: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|s| normalize_label(s.as_ref()))
            .collect();
        if labels.is_empty() {
            return Err(ConfigError::InvalidPhaseOrder("空序列".to_string()));
        }
        for (i, l) in labels.iter().enumerate() {
            if l.is_empty() {
                return Err(ConfigError::InvalidPhaseOrder(format!("第 {i} 个标签为空")));
            }
            if labels[..i].contains(l) {
                return Err(ConfigError::InvalidPhaseOrder(format!("标签 `{l}` 重复")));
            }
        }
        Ok(Self { labels })
    }

    /// 规范时相序列 `0in, 25in, 50in, 75in, 100in, 75ex, 50ex, 25ex`.
    pub fn canonical() -> Self {
        Self {
            labels: CANONICAL_PHASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 获取 `label` (会先规范化) 在序列中的位置. 不在序列中时返回 `None`.
    #[inline]
    pub fn position(&self, label: &str) -> Option<usize> {
        let label = normalize_label(label);
        self.labels.iter().position(|l| *l == label)
    }

    /// `label` 是否为已知时相.
    #[inline]
    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    /// 序列中的第一个时相, 即默认参考时相.
    #[inline]
    pub fn first(&self) -> &str {
        // `new` 保证非空.
        &self.labels[0]
    }

    /// 按顺序迭代所有时相标签.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// 时相个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// 总是返回 `false`, 空序列无法构造.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for PhaseOrder {
    fn default() -> Self {
        Self::canonical()
    }
}

impl TryFrom<Vec<String>> for PhaseOrder {
    type Error = ConfigError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PhaseOrder> for Vec<String> {
    fn from(value: PhaseOrder) -> Self {
        value.labels
    }
}
