//! 汇总输出.
//!
//! 每次批处理结束时一次性写出 CSV 汇总表. 分数保留 4 位小数,
//! 不可计算的分数写为 `N/A`, 出错的目录条目写为 `ERROR`.

#[cfg(feature = "plot")]
pub mod plot;

use crate::compare::{ComparisonResult, FolderRow, FolderScore, Score};
use crate::consts::{ERROR_MARK, NOT_AVAILABLE};
use crate::displacement::DisplacementResult;
use crate::error::ReportError;
use itertools::Itertools;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// 比较汇总表文件名.
pub const COMPARISON_SUMMARY: &str = "dice_summary.csv";

/// 目录比较汇总表文件名.
pub const FOLDER_SUMMARY: &str = "dice_itv_summary.csv";

/// 位移汇总表文件名.
pub const DISPLACEMENT_SUMMARY: &str = "displacement_summary.csv";

/// 以 4 位小数格式化分数.
#[inline]
pub fn format_score(score: Score) -> String {
    match score {
        Score::Value(v) => format!("{v:.4}"),
        Score::NotComputable => NOT_AVAILABLE.to_string(),
    }
}

#[inline]
fn path_or_na(p: Option<&Path>) -> String {
    p.map_or_else(|| NOT_AVAILABLE.to_string(), |p| p.display().to_string())
}

#[derive(Serialize)]
struct ComparisonRow<'a> {
    structure: &'a str,
    modality1_path: String,
    modality2_path: String,
    dice_score: String,
    note: &'a str,
}

#[derive(Serialize)]
struct FolderCsvRow<'a> {
    filename: &'a str,
    dice_score: String,
    itv_volume_mm3: String,
}

/// 位移汇总表中的一行. 批处理中逐个文件累积, 最后一次写出.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplacementRow {
    /// 来源 (通常为输入表文件名).
    pub source: String,

    /// 结构名.
    pub structure: String,

    /// 排序键.
    pub key: String,

    /// 位移或模长 (mm).
    pub displacement: f64,
}

impl DisplacementRow {
    /// 把一组结果展开为汇总行.
    pub fn from_results(source: &str, structure: &str, results: &[DisplacementResult]) -> Vec<Self> {
        results
            .iter()
            .map(|r| Self {
                source: source.to_string(),
                structure: structure.to_string(),
                key: r.key.to_string(),
                displacement: r.value,
            })
            .collect()
    }
}

/// 写出比较汇总表: `structure, modality1_path, modality2_path, dice_score, note`.
pub fn write_comparison_csv<W: Write>(w: W, results: &[ComparisonResult]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(w);
    for r in results {
        wtr.serialize(ComparisonRow {
            structure: &r.structure,
            modality1_path: path_or_na(r.path_a.as_deref()),
            modality2_path: path_or_na(r.path_b.as_deref()),
            dice_score: format_score(r.score),
            note: &r.note,
        })?;
    }
    if results.is_empty() {
        wtr.write_record(["structure", "modality1_path", "modality2_path", "dice_score", "note"])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 写出目录比较汇总表: `filename, dice_score, itv_volume_mm3`.
///
/// ITV 体积保留 1 位小数. 出错的行 `dice_score` 为 `ERROR`, `itv_volume_mm3` 为出错原因.
pub fn write_folder_csv<W: Write>(w: W, rows: &[FolderRow]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(w);
    for r in rows {
        let (dice_score, itv_volume_mm3) = match &r.score {
            FolderScore::Scored { dice, itv_volume } => (
                format_score(Score::Value(*dice)),
                itv_volume.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}")),
            ),
            FolderScore::Error(msg) => (ERROR_MARK.to_string(), msg.clone()),
        };
        wtr.serialize(FolderCsvRow {
            filename: &r.filename,
            dice_score,
            itv_volume_mm3,
        })?;
    }
    if rows.is_empty() {
        wtr.write_record(["filename", "dice_score", "itv_volume_mm3"])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 写出位移汇总表: `source, structure, key, displacement`.
pub fn write_displacement_csv<W: Write>(w: W, rows: &[DisplacementRow]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(w);
    for r in rows {
        wtr.serialize(r)?;
    }
    if rows.is_empty() {
        wtr.write_record(["source", "structure", "key", "displacement"])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 以 `write` 把汇总写入文件 `path`.
pub fn write_to_path<P, T, F>(path: P, items: &[T], write: F) -> Result<(), ReportError>
where
    P: AsRef<Path>,
    F: FnOnce(File, &[T]) -> Result<(), ReportError>,
{
    let path = path.as_ref();
    write(File::create(path)?, items)?;
    log::info!("汇总已写入 `{}`", path.display());
    Ok(())
}

/// 将比较结果写成便于阅读的文本.
pub fn describe_comparisons_into<W: Write>(results: &[ComparisonResult], w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    let scored = results.iter().filter_map(|r| r.score.value()).collect::<Vec<_>>();
    writeln!(
        w,
        "Compared {} structures, {} scored:",
        results.len(),
        scored.len()
    )?;
    for r in results {
        write!(w, "{S4}{}: {}", r.structure, format_score(r.score))?;
        if let Some(c) = r.counts {
            write!(w, " ({} / {} / {} voxels)", c.left, c.right, c.intersection)?;
        }
        if !r.note.is_empty() {
            write!(w, " [{}]", r.note)?;
        }
        writeln!(w)?;
    }
    if !scored.is_empty() {
        let mean = scored.iter().sum::<f64>() / scored.len() as f64;
        writeln!(w, "{S4}mean: {mean:.4}")?;
    }
    Ok(())
}

/// 将位移结果写成一行 `key: value` 列表.
pub fn describe_displacement_into<W: Write>(
    structure: &str,
    results: &[DisplacementResult],
    w: &mut W,
) -> io::Result<()> {
    let body = results
        .iter()
        .map(|r| format!("{}: {:.2}", r.key, r.value))
        .join(", ");
    writeln!(w, "`{structure}` [{body}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::displacement::OrderKey;
    use crate::overlap::OverlapCounts;
    use std::path::PathBuf;

    fn result(structure: &str, score: Score, note: &str) -> ComparisonResult {
        ComparisonResult {
            structure: structure.to_string(),
            path_a: Some(PathBuf::from("a.nii.gz")),
            path_b: None,
            score,
            counts: None,
            note: note.to_string(),
        }
    }

    #[test]
    fn test_comparison_csv() {
        let rows = [
            result("t1", Score::Value(2.0 / 3.0), ""),
            result("t2", Score::NotComputable, "找不到分割文件"),
        ];
        let mut buf = Vec::new();
        write_comparison_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "structure,modality1_path,modality2_path,dice_score,note");
        assert_eq!(lines[1], "t1,a.nii.gz,N/A,0.6667,");
        assert_eq!(lines[2], "t2,a.nii.gz,N/A,N/A,找不到分割文件");
    }

    #[test]
    fn test_folder_csv() {
        let rows = [
            FolderRow {
                filename: "10_t1.nii.gz".to_string(),
                score: FolderScore::Scored {
                    dice: 0.5,
                    itv_volume: Some(523.44),
                },
            },
            FolderRow {
                filename: "11_t1.nii.gz".to_string(),
                score: FolderScore::Scored {
                    dice: 1.0,
                    itv_volume: None,
                },
            },
            FolderRow {
                filename: "x_t1.nii".to_string(),
                score: FolderScore::Error("bad".to_string()),
            },
        ];
        let mut buf = Vec::new();
        write_folder_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "filename,dice_score,itv_volume_mm3\n\
             10_t1.nii.gz,0.5000,523.4\n\
             11_t1.nii.gz,1.0000,N/A\n\
             x_t1.nii,ERROR,bad\n"
        );
    }

    #[test]
    fn test_displacement_csv_and_empty() {
        let results = [
            DisplacementResult {
                key: OrderKey::Phase("0in".to_string()),
                value: 0.0,
            },
            DisplacementResult {
                key: OrderKey::Numeric(12.0),
                value: 2.5,
            },
        ];
        let rows = DisplacementRow::from_results("scan1.csv", "t1", &results);
        let mut buf = Vec::new();
        write_displacement_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "source,structure,key,displacement\nscan1.csv,t1,0in,0.0\nscan1.csv,t1,12,2.5\n"
        );

        let mut buf = Vec::new();
        write_displacement_csv(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "source,structure,key,displacement\n");
    }

    #[test]
    fn test_write_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMPARISON_SUMMARY);
        let rows = [result("t1", Score::Value(1.0), "")];
        write_to_path(&path, &rows, |f, r| write_comparison_csv(f, r)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("t1,a.nii.gz,N/A,1.0000,"));
    }

    #[test]
    fn test_describe() {
        let mut r = result("t1", Score::Value(0.5), "");
        r.counts = Some(OverlapCounts {
            left: 4,
            right: 4,
            intersection: 2,
        });
        let rows = [r, result("t2", Score::NotComputable, "missing")];
        let mut buf = Vec::new();
        describe_comparisons_into(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Compared 2 structures, 1 scored:"));
        assert!(text.contains("t1: 0.5000 (4 / 4 / 2 voxels)"));
        assert!(text.contains("t2: N/A [missing]"));
        assert!(text.contains("mean: 0.5000"));

        let mut buf = Vec::new();
        let d = [DisplacementResult {
            key: OrderKey::Phase("25in".to_string()),
            value: 2.5,
        }];
        describe_displacement_into("t1", &d, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "`t1` [25in: 2.50]\n");
    }
}
