//! 命令行工具依赖的通用组件.

use log::LevelFilter;
use resp_berry::{AnalysisConfig, ConfigError};
use simple_logger::SimpleLogger;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 安装全局日志. 默认 `Info` 级别, `verbose` 时为 `Debug`.
///
/// 重复调用时保留第一次的设置.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if SimpleLogger::new().with_level(level).init().is_err() {
        log::debug!("日志已经初始化");
    }
}

/// 读取配置文件时的错误.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// 文件无法打开.
    #[error("无法读取配置文件: {0}")]
    Io(#[from] io::Error),

    /// JSON 格式错误或字段无效.
    #[error("配置文件格式错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 字段取值无效.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 从 JSON 文件读取 [`AnalysisConfig`]. 缺省字段取默认值.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, LoadConfigError> {
    let path = path.as_ref();
    let config: AnalysisConfig = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    config.validate()?;
    log::debug!("从 `{}` 读取配置: {config:?}", path.display());
    Ok(config)
}

/// 读取可选的配置文件. `path` 为 `None` 时返回默认配置.
pub fn load_config_or_default<P: AsRef<Path>>(
    path: Option<P>,
) -> Result<AnalysisConfig, LoadConfigError> {
    match path {
        Some(p) => load_config(p),
        None => Ok(AnalysisConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"phase_order": ["Max", "min"], "mask_threshold": 0.25}"#,
        )
        .unwrap();
        let c = load_config(&path).unwrap();
        assert_eq!(c.phase_order.iter().collect::<Vec<_>>(), ["max", "min"]);
        assert_eq!(c.reference(), "max");
        assert_eq!(c.mask_threshold, 0.25);
        assert_eq!(c.affine_tolerance, resp_berry::consts::AFFINE_TOLERANCE);
    }

    #[test]
    fn test_load_config_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.json");
        fs::write(&path, r#"{"phase_order": ["0in", "0IN"]}"#).unwrap();
        assert!(matches!(load_config(&path), Err(LoadConfigError::Json(_))));

        let path = dir.path().join("tol.json");
        fs::write(&path, r#"{"affine_tolerance": -0.1}"#).unwrap();
        assert!(matches!(load_config(&path), Err(LoadConfigError::Config(_))));

        assert!(matches!(
            load_config(dir.path().join("missing.json")),
            Err(LoadConfigError::Io(_))
        ));
    }

    #[test]
    fn test_default_round_trip() {
        let c = load_config_or_default(None::<&Path>).unwrap();
        let text = serde_json::to_string(&c).unwrap();
        assert!(text.contains("\"0in\""));
        let back: AnalysisConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, c);
    }
}
