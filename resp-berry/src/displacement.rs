//! 质心位移.
//!
//! 这里有两种 **不同** 的运算:
//!
//! 1. [`relative_displacement`]: 单轴相对位移, `record.axis - reference.axis`.
//! 2. [`absolute_magnitude`]: 每条记录自身位置向量的欧氏范数, 不涉及参考.
//!
//! 两者都先按结构名过滤记录, 再按 [`OrderBy`] 排序, 输出保持排序后的顺序.

use crate::phase::{normalize_label, PhaseOrder};
use crate::record::{CoordAxis, StructureRecord};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 位移计算错误. 均为结构性错误.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum DisplacementError {
    /// 过滤排序后的记录中找不到参考时相/序列.
    #[error("结构 `{structure}` 中找不到参考 `{key}`")]
    ReferenceNotFound {
        /// 参考键.
        key: String,
        /// 结构名.
        structure: String,
    },

    /// 按数值排序时遇到无法解析为数字的键.
    #[error("`{key}` 不是数值")]
    NonNumericKey {
        /// 出错的键.
        key: String,
    },

    /// 参与计算的记录缺少所需坐标.
    #[error("序列 `{series}` 缺少 {axis:?} 坐标")]
    MissingCoordinate {
        /// 序列标识.
        series: String,
        /// 缺少的坐标轴.
        axis: CoordAxis,
    },
}

/// 记录排序方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    /// 按 [`PhaseOrder`] 中的位置排序, 不在序列中的记录被丢弃.
    #[default]
    Phase,

    /// 把序列标识解析为数字后升序排列.
    Numeric,

    /// 全部序列标识都是数字时按 [`OrderBy::Numeric`], 否则按 [`OrderBy::Phase`].
    Auto,
}

impl OrderBy {
    /// 从 `"phase"`, `"numeric"`, `"auto"` (大小写不敏感) 解析.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phase" => Some(Self::Phase),
            "numeric" => Some(Self::Numeric),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// 排序键.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderKey {
    /// 规范化后的时相标签.
    Phase(String),

    /// 数值序列标识.
    Numeric(f64),
}

impl OrderKey {
    /// 数值键返回其数值.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OrderKey::Numeric(v) => Some(*v),
            OrderKey::Phase(_) => None,
        }
    }

    /// 与参考键 `reference` 是否相同. 时相按规范化标签比较, 数值按值比较.
    fn matches(&self, reference: &str) -> bool {
        match self {
            OrderKey::Phase(label) => *label == normalize_label(reference),
            OrderKey::Numeric(v) => reference.trim().parse::<f64>().map_or(false, |r| r == *v),
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::Phase(label) => write!(f, "{label}"),
            OrderKey::Numeric(v) => write!(f, "{v}"),
        }
    }
}

/// 单条位移结果.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplacementResult {
    /// 排序键.
    pub key: OrderKey,

    /// 位移或模长 (mm).
    pub value: f64,
}

impl DisplacementResult {
    #[inline]
    fn new(key: OrderKey, value: f64) -> Self {
        Self { key, value }
    }
}

#[inline]
fn parse_numeric(series_id: &str) -> Option<f64> {
    series_id.trim().parse::<f64>().ok()
}

/// 按结构名过滤并排序, 返回 `(排序键, 记录)`. 排序是稳定的.
fn ordered<'a>(
    records: &'a [StructureRecord],
    structure: &str,
    order_by: OrderBy,
    phases: &PhaseOrder,
) -> Result<Vec<(OrderKey, &'a StructureRecord)>, DisplacementError> {
    let selected: Vec<&StructureRecord> = records.iter().filter(|r| r.name == structure).collect();

    let order_by = match order_by {
        OrderBy::Auto if selected.iter().all(|r| parse_numeric(&r.series_id).is_some()) => {
            OrderBy::Numeric
        }
        OrderBy::Auto => OrderBy::Phase,
        other => other,
    };

    match order_by {
        OrderBy::Numeric => {
            let mut keyed = selected
                .into_iter()
                .map(|r| match parse_numeric(&r.series_id) {
                    Some(v) => Ok((v, r)),
                    None => Err(DisplacementError::NonNumericKey {
                        key: r.series_id.clone(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            keyed.sort_by_key(|(v, _)| OrderedFloat(*v));
            Ok(keyed
                .into_iter()
                .map(|(v, r)| (OrderKey::Numeric(v), r))
                .collect())
        }
        _ => {
            let mut keyed: Vec<(usize, String, &StructureRecord)> = selected
                .into_iter()
                .filter_map(|r| {
                    let label = normalize_label(&r.series_id);
                    match phases.position(&label) {
                        Some(pos) => Some((pos, label, r)),
                        None => {
                            log::debug!("丢弃不在时相序列中的记录 `{}`", r.series_id);
                            None
                        }
                    }
                })
                .collect();
            keyed.sort_by_key(|(pos, _, _)| *pos);
            Ok(keyed
                .into_iter()
                .map(|(_, label, r)| (OrderKey::Phase(label), r))
                .collect())
        }
    }
}

#[inline]
fn coord_of(r: &StructureRecord, axis: CoordAxis) -> Result<f64, DisplacementError> {
    r.coord(axis).ok_or_else(|| DisplacementError::MissingCoordinate {
        series: r.series_id.clone(),
        axis,
    })
}

/// 计算结构 `structure` 在各时相/序列上相对参考的单轴位移.
///
/// `reference` 为 `None` 时使用 `phases` 的第一个时相.
/// 参考键重复时, 取排序后的第一条记录.
///
/// # 错误
///
/// 1. 数值排序时存在非数字键: [`DisplacementError::NonNumericKey`].
/// 2. 找不到参考: [`DisplacementError::ReferenceNotFound`].
/// 3. 任意参与计算的记录缺少 `axis` 坐标: [`DisplacementError::MissingCoordinate`].
pub fn relative_displacement(
    records: &[StructureRecord],
    structure: &str,
    reference: Option<&str>,
    order_by: OrderBy,
    phases: &PhaseOrder,
    axis: CoordAxis,
) -> Result<Vec<DisplacementResult>, DisplacementError> {
    let sorted = ordered(records, structure, order_by, phases)?;
    let reference = reference.unwrap_or_else(|| phases.first());

    let (_, ref_record) = sorted.iter().find(|(k, _)| k.matches(reference)).ok_or_else(|| {
        DisplacementError::ReferenceNotFound {
            key: reference.to_string(),
            structure: structure.to_string(),
        }
    })?;
    let base = coord_of(ref_record, axis)?;

    let out = sorted
        .into_iter()
        .map(|(key, r)| Ok(DisplacementResult::new(key, coord_of(r, axis)? - base)))
        .collect::<Result<Vec<_>, DisplacementError>>()?;
    log::debug!("`{structure}`: {} 条相对位移, 参考 `{reference}`", out.len());
    Ok(out)
}

/// 计算结构 `structure` 每条记录位置向量的欧氏范数 `sqrt(x²+y²+z²)`.
///
/// 缺少任一坐标的记录会被丢弃.
pub fn absolute_magnitude(
    records: &[StructureRecord],
    structure: &str,
    order_by: OrderBy,
    phases: &PhaseOrder,
) -> Result<Vec<DisplacementResult>, DisplacementError> {
    Ok(ordered(records, structure, order_by, phases)?
        .into_iter()
        .filter_map(|(key, r)| {
            let [x, y, z] = r.position()?;
            Some(DisplacementResult::new(key, (x * x + y * y + z * z).sqrt()))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn keys(v: &[DisplacementResult]) -> Vec<String> {
        v.iter().map(|r| r.key.to_string()).collect()
    }

    #[test]
    fn test_relative_two_phases() {
        let records = [
            StructureRecord::with_z("0in", "t1", 10.0),
            StructureRecord::with_z("25in", "t1", 12.5),
        ];
        let phases = PhaseOrder::canonical();
        let out =
            relative_displacement(&records, "t1", None, OrderBy::Phase, &phases, CoordAxis::Z)
                .unwrap();
        assert_eq!(
            out,
            vec![
                DisplacementResult::new(OrderKey::Phase("0in".into()), 0.0),
                DisplacementResult::new(OrderKey::Phase("25in".into()), 2.5),
            ]
        );
    }

    #[test]
    fn test_phase_order_not_lexical() {
        let records = [
            StructureRecord::with_z("50in", "t1", 3.0),
            StructureRecord::with_z(" 0IN ", "t1", 1.0),
            StructureRecord::with_z("25in", "t1", 2.0),
            StructureRecord::with_z("25in", "t2", 9.0),
            StructureRecord::with_z("average", "t1", 7.0),
        ];
        let phases = PhaseOrder::canonical();
        let out =
            relative_displacement(&records, "t1", None, OrderBy::Phase, &phases, CoordAxis::Z)
                .unwrap();
        assert_eq!(keys(&out), ["0in", "25in", "50in"]);
        assert!(f64_eq(out[0].value, 0.0));
        assert!(f64_eq(out[2].value, 2.0));

        // 吸气后接呼气.
        let records = [
            StructureRecord::with_z("25ex", "t1", 0.0),
            StructureRecord::with_z("100in", "t1", 0.0),
            StructureRecord::with_z("0in", "t1", 0.0),
        ];
        let out = absolute_magnitude(&records, "t1", OrderBy::Phase, &phases).unwrap();
        assert!(out.is_empty());
        let out =
            relative_displacement(&records, "t1", None, OrderBy::Phase, &phases, CoordAxis::Z)
                .unwrap();
        assert_eq!(keys(&out), ["0in", "100in", "25ex"]);
    }

    #[test]
    fn test_numeric_order_and_reference() {
        let records = [
            StructureRecord::with_z("30", "t1", 5.0),
            StructureRecord::with_z("4", "t1", 1.0),
            StructureRecord::with_z("12", "t1", 2.0),
        ];
        let phases = PhaseOrder::canonical();
        let out = relative_displacement(
            &records,
            "t1",
            Some("4.0"),
            OrderBy::Numeric,
            &phases,
            CoordAxis::Z,
        )
        .unwrap();
        assert_eq!(keys(&out), ["4", "12", "30"]);
        assert_eq!(out[0].key.as_f64(), Some(4.0));
        assert!(f64_eq(out[2].value, 4.0));

        // 默认参考 `0in` 不在数值序列中.
        let err =
            relative_displacement(&records, "t1", None, OrderBy::Numeric, &phases, CoordAxis::Z)
                .unwrap_err();
        assert!(matches!(err, DisplacementError::ReferenceNotFound { .. }));
    }

    #[test]
    fn test_numeric_rejects_non_numeric_key() {
        let records = [
            StructureRecord::with_z("4", "t1", 1.0),
            StructureRecord::with_z("late", "t1", 2.0),
        ];
        let phases = PhaseOrder::canonical();
        let err = relative_displacement(
            &records,
            "t1",
            Some("4"),
            OrderBy::Numeric,
            &phases,
            CoordAxis::Z,
        )
        .unwrap_err();
        assert_eq!(
            err,
            DisplacementError::NonNumericKey {
                key: "late".to_string()
            }
        );
        assert!(absolute_magnitude(&records, "t1", OrderBy::Numeric, &phases).is_err());
    }

    #[test]
    fn test_auto_order() {
        let phases = PhaseOrder::canonical();
        let numeric = [
            StructureRecord::with_xyz("20", "t1", [0.0, 0.0, 1.0]),
            StructureRecord::with_xyz("10", "t1", [3.0, 4.0, 0.0]),
        ];
        let out = absolute_magnitude(&numeric, "t1", OrderBy::Auto, &phases).unwrap();
        assert_eq!(keys(&out), ["10", "20"]);
        assert!(f64_eq(out[0].value, 5.0));

        let mixed = [
            StructureRecord::with_xyz("25in", "t1", [0.0, 0.0, 1.0]),
            StructureRecord::with_xyz("10", "t1", [3.0, 4.0, 0.0]),
        ];
        let out = absolute_magnitude(&mixed, "t1", OrderBy::Auto, &phases).unwrap();
        assert_eq!(keys(&out), ["25in"]);
    }

    #[test]
    fn test_reference_errors() {
        let phases = PhaseOrder::canonical();
        let records = [StructureRecord::with_z("25in", "t1", 1.0)];
        let err =
            relative_displacement(&records, "t1", None, OrderBy::Phase, &phases, CoordAxis::Z)
                .unwrap_err();
        assert_eq!(
            err,
            DisplacementError::ReferenceNotFound {
                key: "0in".to_string(),
                structure: "t1".to_string()
            }
        );

        // 参考时相缺少 x 坐标.
        let records = [
            StructureRecord::with_z("0in", "t1", 1.0),
            StructureRecord::with_xyz("25in", "t1", [1.0, 1.0, 1.0]),
        ];
        let err =
            relative_displacement(&records, "t1", None, OrderBy::Phase, &phases, CoordAxis::X)
                .unwrap_err();
        assert!(matches!(
            err,
            DisplacementError::MissingCoordinate {
                axis: CoordAxis::X,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_reference_takes_first() {
        let phases = PhaseOrder::canonical();
        let records = [
            StructureRecord::with_z("25in", "t1", 0.0),
            StructureRecord::with_z("0in", "t1", 4.0),
            StructureRecord::with_z("0in", "t1", 8.0),
        ];
        let out =
            relative_displacement(&records, "t1", Some("0IN"), OrderBy::Phase, &phases, CoordAxis::Z)
                .unwrap();
        let values: Vec<f64> = out.iter().map(|r| r.value).collect();
        assert_eq!(values, [0.0, 4.0, -4.0]);
    }

    #[test]
    fn test_magnitude_drops_incomplete() {
        let phases = PhaseOrder::canonical();
        let records = [
            StructureRecord::with_xyz("0in", "t1", [1.0, 2.0, 2.0]),
            StructureRecord::with_z("25in", "t1", 5.0),
            StructureRecord::with_xyz("50in", "t1", [0.0, -6.0, 8.0]),
            StructureRecord::with_xyz("75in", "t1", [f64::NAN, 1.0, 1.0]),
        ];
        let out = absolute_magnitude(&records, "t1", OrderBy::Phase, &phases).unwrap();
        assert_eq!(keys(&out), ["0in", "50in"]);
        assert!(f64_eq(out[0].value, 3.0));
        assert!(f64_eq(out[1].value, 10.0));
    }

    #[test]
    fn test_order_by_parse() {
        assert_eq!(OrderBy::parse("Numeric"), Some(OrderBy::Numeric));
        assert_eq!(OrderBy::parse(" auto"), Some(OrderBy::Auto));
        assert_eq!(OrderBy::parse("lexical"), None);
        assert_eq!(OrderBy::default(), OrderBy::Phase);
    }
}
