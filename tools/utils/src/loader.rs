//! 数据目录与输入表定位.

use resp_berry::ConfigError;
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 数据根目录环境变量.
pub const DATA_DIR_VAR: &str = "RESP_EVAL_DATA_DIR";

/// `$HOME/dataset` 下的默认数据子目录.
pub const DATA_SUB_DIR: &str = "resp";

/// 获取 `$HOME/dataset/...` 路径. 找不到家目录时返回 `None`.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 获取数据基本路径.
///
/// 1. 若环境变量 `$var` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/{sub}`.
pub fn data_dir_from_env_or_home(var: &str, sub: &[&str]) -> Option<PathBuf> {
    match env::var(var) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(sub),
    }
}

/// 命令行给出的数据目录优先; 否则取 `$RESP_EVAL_DATA_DIR`, 再否则取 `$HOME/dataset/resp`.
///
/// `param` 为对应的命令行参数名, 三者都拿不到时用于报错.
pub fn data_dir_or_default(
    explicit: Option<&Path>,
    param: &'static str,
) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => {
            let dir = data_dir_from_env_or_home(DATA_DIR_VAR, &[DATA_SUB_DIR])
                .ok_or(ConfigError::MissingParameter(param))?;
            log::info!("未指定 `--{param}`, 使用 `{}`", dir.display());
            Ok(dir)
        }
    }
}

/// 在 `dir` 中查找模态 `modality` 对应的结构统计表.
///
/// 1. 若给出了 `explicit`, 直接使用;
/// 2. 否则, 按文件名排序, 返回第一个文件名包含 `modality` (大小写不敏感) 的 `*.csv` 文件.
pub fn find_table(
    dir: &Path,
    modality: &str,
    explicit: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    let not_found = || ConfigError::TableNotFound {
        dir: dir.to_path_buf(),
        modality: modality.to_string(),
    };
    let wanted = modality.to_lowercase();
    let found = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            name.ends_with(".csv") && name.contains(&wanted)
        })
        .map(|e| e.into_path())
        .ok_or_else(not_found)?;
    log::debug!("`{modality}` 使用表 `{}`", found.display());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_env_overrides_home() {
        let var = "RESP_EVAL_TEST_DATA_DIR";
        env::set_var(var, "/data/resp");
        assert_eq!(
            data_dir_from_env_or_home(var, &["scan1"]),
            Some(PathBuf::from("/data/resp"))
        );
        env::remove_var(var);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                data_dir_from_env_or_home(var, &["scan1"]),
                Some(home.join("dataset").join("scan1"))
            );
        }
    }

    #[test]
    fn test_find_table() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("stats_CT_b.csv"), "").unwrap();
        fs::write(base.join("stats_CT_a.csv"), "").unwrap();
        fs::write(base.join("stats_MRI.txt"), "").unwrap();

        assert_eq!(find_table(base, "CT", None).unwrap(), base.join("stats_CT_a.csv"));
        assert!(matches!(
            find_table(base, "MRI", None),
            Err(ConfigError::TableNotFound { .. })
        ));
        let explicit = base.join("mine.csv");
        assert_eq!(find_table(base, "ct", None).unwrap(), base.join("stats_CT_a.csv"));
        assert_eq!(find_table(base, "MRI", Some(&explicit)).unwrap(), explicit);
    }

    #[test]
    fn test_find_table_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        fs::write(base.join("4dct_structure_stats.CSV"), "").unwrap();
        fs::create_dir(base.join("4DCT_extra.csv")).unwrap();
        assert_eq!(
            find_table(base, "4DCT", None).unwrap(),
            base.join("4dct_structure_stats.CSV")
        );
        assert!(find_table(&base.join("missing"), "4DCT", None).is_err());
    }

    #[test]
    fn test_data_dir_or_default() {
        let explicit = PathBuf::from("/data/given");
        assert_eq!(
            data_dir_or_default(Some(&explicit), "base-dir").unwrap(),
            explicit
        );
        if let Some(home) = dirs::home_dir() {
            if env::var(DATA_DIR_VAR).map_or(true, |v| v.is_empty()) {
                assert_eq!(
                    data_dir_or_default(None, "base-dir").unwrap(),
                    home.join("dataset").join(DATA_SUB_DIR)
                );
            }
        }
    }
}
