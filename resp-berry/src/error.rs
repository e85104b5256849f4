//! 运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// 分割体积加载错误. 批处理中属于单条目错误, 不会中断批次.
#[derive(Debug, Error)]
pub enum LoadError {
    /// NIfTI 文件解析错误.
    #[error("NIfTI 解析失败: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// npy 文件解析错误.
    #[error("npy 解析失败: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),

    /// 底层 I/O 错误.
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不是三维体积 (多余维度长度不为 1).
    #[error("不是三维体积, 形状为 {0:?}")]
    NotVolume3d(Vec<usize>),
}

/// 结构统计表错误.
#[derive(Debug, Error)]
pub enum TableError {
    /// CSV 读取或反序列化错误.
    #[error("CSV 错误: {0}")]
    Csv(#[from] csv::Error),

    /// 表中不存在指定序列.
    #[error("序列 `{series}` 不在 `{table}` 中")]
    SeriesNotFound {
        /// 请求的序列标识.
        series: String,
        /// 表的来源描述 (通常为路径).
        table: String,
    },

    /// 指定序列中不存在该结构.
    #[error("结构 `{name}` 不在序列 `{series}` 中")]
    StructureNotFound {
        /// 请求的结构名.
        name: String,
        /// 所在序列标识.
        series: String,
    },
}

/// 汇总表/图片输出错误.
#[derive(Debug, Error)]
pub enum ReportError {
    /// CSV 写入错误.
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),

    /// 底层 I/O 错误.
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 图像写入错误.
    #[error("图像写入失败: {0}")]
    Image(#[from] image::ImageError),

    /// 绘图后端错误.
    #[error("绘图失败: {0}")]
    Plot(String),
}

/// 配置错误. 属于结构性错误, 应当立即终止调用.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 时相序列为空或存在重复.
    #[error("时相序列无效: {0}")]
    InvalidPhaseOrder(String),

    /// 阈值不是有限数.
    #[error("阈值无效: {0}")]
    InvalidThreshold(f32),

    /// 容差不是非负有限数.
    #[error("容差无效: {0}")]
    InvalidTolerance(f64),

    /// 缺少必要参数.
    #[error("缺少必要参数 `{0}`")]
    MissingParameter(&'static str),

    /// 找不到输入表.
    #[error("在 `{dir}` 下找不到 `{modality}` 对应的 CSV 表")]
    TableNotFound {
        /// 搜索目录.
        dir: PathBuf,
        /// 模态名.
        modality: String,
    },
}
