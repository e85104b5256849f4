//! 分割文件路径解析.

use crate::consts::SEG_EXT;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 根据 `(模态, 序列, 结构)` 定位分割文件.
pub trait SegResolver {
    /// 返回存在的文件路径. 找不到时返回 `None`.
    fn resolve(&self, modality: &str, series: &str, structure: &str) -> Option<PathBuf>;
}

impl<T: SegResolver + ?Sized> SegResolver for Box<T> {
    #[inline]
    fn resolve(&self, modality: &str, series: &str, structure: &str) -> Option<PathBuf> {
        (**self).resolve(modality, series, structure)
    }
}

/// 依次尝试以下布局, 返回第一个存在的文件:
///
/// 1. `{base}/{modality}/{series}/segmentations/{structure}.nii.gz`
/// 2. `{base}/{modality}/segmentations/{series}_{structure}.nii.gz`
/// 3. `{base}/segmentations/{modality}_{series}_{structure}.nii.gz`
/// 4. 递归搜索 `base`, 按文件名排序, 取第一个文件名包含 `structure` 的 `*.nii.gz` 文件.
#[derive(Clone, Debug)]
pub struct FallbackResolver {
    base_dir: PathBuf,
}

impl FallbackResolver {
    /// 以 `base_dir` 为根目录.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn candidates(&self, modality: &str, series: &str, structure: &str) -> [PathBuf; 3] {
        let b = self.base_dir.as_path();
        [
            b.join(modality)
                .join(series)
                .join("segmentations")
                .join(format!("{structure}{SEG_EXT}")),
            b.join(modality)
                .join("segmentations")
                .join(format!("{series}_{structure}{SEG_EXT}")),
            b.join("segmentations")
                .join(format!("{modality}_{series}_{structure}{SEG_EXT}")),
        ]
    }

    fn search(&self, structure: &str) -> Option<PathBuf> {
        WalkDir::new(self.base_dir.as_path())
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .find(|e| {
                e.file_name()
                    .to_str()
                    .map_or(false, |n| n.ends_with(SEG_EXT) && n.contains(structure))
            })
            .map(|e| e.into_path())
    }
}

impl SegResolver for FallbackResolver {
    fn resolve(&self, modality: &str, series: &str, structure: &str) -> Option<PathBuf> {
        self.candidates(modality, series, structure)
            .into_iter()
            .find(|p| p.is_file())
            .or_else(|| self.search(structure))
    }
}

/// 按病人目录布局:
/// `{base}/{modality}_pat{patient}_segmentations/{series}_{structure}.nii.gz`.
#[derive(Clone, Debug)]
pub struct PatientDirResolver {
    base_dir: PathBuf,
    patient: String,
}

impl PatientDirResolver {
    /// 以 `base_dir` 为根目录, 病人编号为 `patient`.
    pub fn new<P: AsRef<Path>>(base_dir: P, patient: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            patient: patient.into(),
        }
    }
}

impl SegResolver for PatientDirResolver {
    fn resolve(&self, modality: &str, series: &str, structure: &str) -> Option<PathBuf> {
        let p = self
            .base_dir
            .join(format!("{modality}_pat{}_segmentations", self.patient))
            .join(format!("{series}_{structure}{SEG_EXT}"));
        p.is_file().then_some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(p: &Path) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"").unwrap();
    }

    #[test]
    fn test_fallback_order() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let r = FallbackResolver::new(base);
        assert_eq!(r.resolve("MRI", "0in", "t1"), None);

        // 只有递归搜索能命中.
        let deep = base.join("misc/b/xx_t1_final.nii.gz");
        touch(&deep);
        touch(&base.join("misc/a/t1.nii"));
        assert_eq!(r.resolve("MRI", "0in", "t1"), Some(deep));

        let third = base.join("segmentations/MRI_0in_t1.nii.gz");
        touch(&third);
        assert_eq!(r.resolve("MRI", "0in", "t1"), Some(third));

        let second = base.join("MRI/segmentations/0in_t1.nii.gz");
        touch(&second);
        assert_eq!(r.resolve("MRI", "0in", "t1"), Some(second));

        let first = base.join("MRI/0in/segmentations/t1.nii.gz");
        touch(&first);
        assert_eq!(r.resolve("MRI", "0in", "t1"), Some(first));
    }

    #[test]
    fn test_search_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        touch(&base.join("z_t2.nii.gz"));
        touch(&base.join("a_t2.nii.gz"));
        let r = FallbackResolver::new(base);
        assert_eq!(r.resolve("CT", "1", "t2"), Some(base.join("a_t2.nii.gz")));
    }

    #[test]
    fn test_patient_dir() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let r = PatientDirResolver::new(base, "07");
        assert_eq!(r.resolve("CT", "25in", "t1"), None);

        let p = base.join("CT_pat07_segmentations/25in_t1.nii.gz");
        touch(&p);
        assert_eq!(r.resolve("CT", "25in", "t1"), Some(p));
        assert_eq!(r.resolve("MRI", "25in", "t1"), None);

        let boxed: Box<dyn SegResolver> = Box::new(r);
        assert!(boxed.resolve("CT", "25in", "t1").is_some());
    }
}
