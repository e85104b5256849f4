//! 结构统计表.
//!
//! 支持两种 CSV 格式:
//!
//! 1. 宽表: 每行一个结构记录, 列为 `series_id, name, x, y, z, volume`
//!   (坐标与体积列可缺省, 其余未知列忽略).
//! 2. 长表: 每行一个坐标分量, 列为 `phase, axis, com`. 整张表只描述一个结构,
//!   读取时需要调用方给出结构名.

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io;
use std::path::Path;

/// 坐标轴.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordAxis {
    /// 左右方向.
    X,

    /// 前后方向.
    Y,

    /// 上下 (头脚) 方向.
    Z,
}

impl CoordAxis {
    /// 从 `"x"`, `"y"`, `"z"` (大小写不敏感) 解析.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "z" => Some(Self::Z),
            _ => None,
        }
    }
}

/// 单个结构在单个序列 (时相) 上的统计记录. 身份键为 `(series_id, name)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    /// 序列标识. 可能是时相标签, 也可能是数字编号.
    pub series_id: String,

    /// 结构名.
    pub name: String,

    /// 质心 x 坐标 (mm).
    #[serde(default)]
    pub x: Option<f64>,

    /// 质心 y 坐标 (mm).
    #[serde(default)]
    pub y: Option<f64>,

    /// 质心 z 坐标 (mm).
    #[serde(default)]
    pub z: Option<f64>,

    /// 结构体积 (mm³).
    #[serde(default)]
    pub volume: Option<f64>,
}

impl StructureRecord {
    /// 创建只有 z 坐标的记录.
    pub fn with_z(series_id: &str, name: &str, z: f64) -> Self {
        Self {
            series_id: series_id.to_string(),
            name: name.to_string(),
            x: None,
            y: None,
            z: Some(z),
            volume: None,
        }
    }

    /// 创建带完整三维坐标的记录.
    pub fn with_xyz(series_id: &str, name: &str, [x, y, z]: [f64; 3]) -> Self {
        Self {
            series_id: series_id.to_string(),
            name: name.to_string(),
            x: Some(x),
            y: Some(y),
            z: Some(z),
            volume: None,
        }
    }

    /// 获取指定轴坐标. `NaN` 与无穷视为缺失.
    #[inline]
    pub fn coord(&self, axis: CoordAxis) -> Option<f64> {
        let v = match axis {
            CoordAxis::X => self.x,
            CoordAxis::Y => self.y,
            CoordAxis::Z => self.z,
        };
        v.filter(|v| v.is_finite())
    }

    /// 三个坐标都存在 (且有限) 时返回 `[x, y, z]`.
    #[inline]
    pub fn position(&self) -> Option<[f64; 3]> {
        Some([
            self.coord(CoordAxis::X)?,
            self.coord(CoordAxis::Y)?,
            self.coord(CoordAxis::Z)?,
        ])
    }

    #[inline]
    fn coord_mut(&mut self, axis: CoordAxis) -> &mut Option<f64> {
        match axis {
            CoordAxis::X => &mut self.x,
            CoordAxis::Y => &mut self.y,
            CoordAxis::Z => &mut self.z,
        }
    }
}

/// 判断表中的序列标识 `stored` 是否与请求的 `wanted` 相同.
///
/// 先按去除空白后的字符串比较, 再按数值比较 (`"30"` 与 `"30.0"` 相同).
pub fn series_matches(stored: &str, wanted: &str) -> bool {
    let (s, w) = (stored.trim(), wanted.trim());
    if s == w {
        return true;
    }
    match (s.parse::<f64>(), w.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// 长表中的一行.
#[derive(Debug, Deserialize)]
struct AxisComRow {
    phase: String,
    axis: String,
    com: f64,
}

#[inline]
fn reader_builder() -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    b.trim(csv::Trim::All);
    b
}

/// 一张结构统计表. 读入后不可变.
#[derive(Clone, Debug)]
pub struct StructureTable {
    source: String,
    records: Vec<StructureRecord>,
}

impl StructureTable {
    /// 直接由记录创建. `source` 仅用于错误信息.
    pub fn from_records(source: impl Into<String>, records: Vec<StructureRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    /// 读取宽表格式 CSV 文件.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let rdr = reader_builder().from_path(path)?;
        Self::from_csv(rdr, path.display().to_string())
    }

    /// 从任意输入读取宽表格式 CSV.
    pub fn from_reader<R: io::Read>(r: R, source: impl Into<String>) -> Result<Self, TableError> {
        Self::from_csv(reader_builder().from_reader(r), source.into())
    }

    fn from_csv<R: io::Read>(mut rdr: csv::Reader<R>, source: String) -> Result<Self, TableError> {
        let records = rdr.deserialize().collect::<Result<Vec<StructureRecord>, _>>()?;
        log::debug!("`{source}`: 读入 {} 条结构记录", records.len());
        Ok(Self { source, records })
    }

    /// 读取长表格式 CSV 文件, 全部记录归属结构 `name`.
    pub fn from_axis_com_path<P: AsRef<Path>>(path: P, name: &str) -> Result<Self, TableError> {
        let path = path.as_ref();
        let rdr = reader_builder().from_path(path)?;
        Self::from_axis_com_csv(rdr, name, path.display().to_string())
    }

    /// 从任意输入读取长表格式 CSV, 全部记录归属结构 `name`.
    pub fn from_axis_com_reader<R: io::Read>(
        r: R,
        name: &str,
        source: impl Into<String>,
    ) -> Result<Self, TableError> {
        Self::from_axis_com_csv(reader_builder().from_reader(r), name, source.into())
    }

    fn from_axis_com_csv<R: io::Read>(
        mut rdr: csv::Reader<R>,
        name: &str,
        source: String,
    ) -> Result<Self, TableError> {
        let mut records: Vec<StructureRecord> = Vec::new();
        for row in rdr.deserialize() {
            let row: AxisComRow = row?;
            let Some(axis) = CoordAxis::parse(&row.axis) else {
                log::debug!("`{source}`: 忽略未知坐标轴 `{}`", row.axis);
                continue;
            };
            // 按时相首次出现的顺序组织记录.
            let idx = match records.iter().position(|r| r.series_id == row.phase) {
                Some(i) => i,
                None => {
                    records.push(StructureRecord {
                        series_id: row.phase.clone(),
                        name: name.to_string(),
                        x: None,
                        y: None,
                        z: None,
                        volume: None,
                    });
                    records.len() - 1
                }
            };
            *records[idx].coord_mut(axis) = Some(row.com);
        }
        Ok(Self { source, records })
    }

    /// 表的来源描述.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 全部记录.
    #[inline]
    pub fn records(&self) -> &[StructureRecord] {
        &self.records
    }

    /// 去掉 `series_id` 含有 `average` (大小写不敏感) 的记录.
    pub fn without_averages(mut self) -> Self {
        let before = self.records.len();
        self.records
            .retain(|r| !r.series_id.to_lowercase().contains("average"));
        log::debug!(
            "`{}`: 去除 {} 条 average 记录",
            self.source,
            before - self.records.len()
        );
        self
    }

    /// 表中是否存在序列 `series`.
    pub fn has_series(&self, series: &str) -> bool {
        self.records
            .iter()
            .any(|r| series_matches(&r.series_id, series))
    }

    /// 序列 `series` 中出现的结构名, 有序去重.
    pub fn names_in_series(&self, series: &str) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter(|r| series_matches(&r.series_id, series))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// 查找 `(series, name)` 对应的第一条记录.
    pub fn find(&self, series: &str, name: &str) -> Option<&StructureRecord> {
        self.records
            .iter()
            .find(|r| r.name == name && series_matches(&r.series_id, series))
    }

    /// 查找 `(series, name)` 对应的体积.
    #[inline]
    pub fn volume_of(&self, series: &str, name: &str) -> Option<f64> {
        self.find(series, name)?.volume
    }

    /// 结构性检查: 序列与结构都必须存在于表中.
    pub fn require(&self, series: &str, name: &str) -> Result<&StructureRecord, TableError> {
        if !self.has_series(series) {
            return Err(TableError::SeriesNotFound {
                series: series.to_string(),
                table: self.source.clone(),
            });
        }
        self.find(series, name)
            .ok_or_else(|| TableError::StructureNotFound {
                name: name.to_string(),
                series: series.to_string(),
            })
    }
}
