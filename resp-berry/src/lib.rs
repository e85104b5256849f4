#![warn(missing_docs)]

//! 核心库. 提供呼吸运动研究中肿瘤分割体积的重叠评分 (DICE)
//! 与质心位移提取功能.
//!
//! 该 crate 只依赖本地已加载的数据, 不存在持久化状态. 所有核心运算都是纯函数.
//!
//! # 注意
//!
//! 1. 分割体积以 NIfTI (`.nii`, `.nii.gz`) 或 `.npy` 格式读入, 只用到数组和几何变换两部分.
//! 2. 批处理中单个条目的失败不会终止整个批次, 而是记录为诊断行.
//!   只有结构性错误 (缺少参考时相、缺少必要参数等) 会直接返回 `Err`.
//!
//! # 开发计划
//!
//! ### DICE 重叠评分 ✅
//!
//! `2·|A∩B| / (|A|+|B|)`. 两个掩膜都为空时约定为 `1.0`.
//! 形状不一致时拒绝计算.
//!
//! 实现位于 `resp-berry/src/overlap.rs`.
//!
//! ### 分割体积与二值掩膜 ✅
//!
//! 1. NIfTI header 几何信息 (sform / qform / pixdim) 解析为 4x4 仿射矩阵. ✅
//! 2. 体素对齐检查 (形状 + 仿射矩阵, 容差 `1e-5`). ✅
//! 3. 6-连通分量统计, 用于发现分割噪点. ✅
//! 4. 最大强度投影 (MIP) 预览图. ✅
//!
//! 实现位于 `resp-berry/src/data`.
//!
//! ### 结构统计表与呼吸时相 ✅
//!
//! 读取 `series_id, name, x, y, z, volume` 格式的结构统计 CSV,
//! 以及 `phase, axis, com` 格式的长表.
//!
//! 实现位于 `resp-berry/src/record.rs` 和 `resp-berry/src/phase.rs`.
//!
//! ### 质心位移 ✅
//!
//! 两种 **不同** 的运算, 不要混用:
//!
//! 1. 相对位移: 单轴 (默认 Z 轴), 相对参考时相/序列.
//! 2. 绝对位置模长: 三维位置向量的欧氏范数, 不涉及参考.
//!
//! 实现位于 `resp-berry/src/displacement.rs`.
//!
//! ### 批量比较 ✅
//!
//! 路径解析策略通过 [`compare::SegResolver`] 注入, 体积加载通过
//! [`compare::VolumeLoader`] 注入.
//!
//! 实现位于 `resp-berry/src/compare`.
//!
//! ### 汇总输出 ✅
//!
//! CSV 汇总表; 开启 `plot` feature 后输出 SVG 位移曲线.
//!
//! 实现位于 `resp-berry/src/report`.

/// 三维索引, 按 `(z, h, w)` 顺序.
pub type Idx3d = (usize, usize, usize);

/// 4x4 体素到世界坐标的仿射矩阵, 行优先.
pub type Affine = [[f64; 4]; 4];

/// 分割体积与二值掩膜.
mod data;

pub use data::mask::{BinaryMask, ComponentReport, ProjectionAxis};
pub use data::{Alignment, HeaderSummary, NiftiHeaderAttr, SegVolume};

pub mod compare;
pub mod config;
pub mod consts;
pub mod displacement;
mod error;
pub mod overlap;
pub mod phase;
pub mod prelude;
pub mod record;
pub mod report;

pub use config::AnalysisConfig;
pub use error::{ConfigError, LoadError, ReportError, TableError};
