//! SVG 位移曲线. 只用于人工检查.

use crate::displacement::DisplacementResult;
use crate::error::ReportError;
use itertools::{Itertools, MinMaxResult};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const PLOT_SIZE: (u32, u32) = (800, 500);

#[inline]
fn plot_err<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Plot(e.to_string())
}

/// y 轴范围, 上下各留 10% 空白. 所有值相同时扩展为 `±1`.
fn y_range(results: &[DisplacementResult]) -> (f64, f64) {
    match results.iter().map(|r| r.value).minmax() {
        MinMaxResult::NoElements => (-1.0, 1.0),
        MinMaxResult::OneElement(v) => (v - 1.0, v + 1.0),
        MinMaxResult::MinMax(lo, hi) if (hi - lo).abs() < f64::EPSILON => (lo - 1.0, hi + 1.0),
        MinMaxResult::MinMax(lo, hi) => {
            let pad = (hi - lo) * 0.1;
            (lo - pad, hi + pad)
        }
    }
}

fn draw_series_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    caption: &str,
    y_desc: &str,
    results: &[DisplacementResult],
) -> Result<(), ReportError> {
    if results.is_empty() {
        let (w, h) = area.dim_in_pixel();
        area.draw(&Text::new(
            format!("No data for {caption}"),
            (w as i32 / 3, h as i32 / 2),
            ("sans-serif", 18).into_font().color(&BLACK),
        ))
        .map_err(plot_err)?;
        return Ok(());
    }

    let labels: Vec<String> = results.iter().map(|r| r.key.to_string()).collect();
    let (lo, hi) = y_range(results);
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0usize..results.len().max(2) - 1, lo..hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|x| labels.get(*x).cloned().unwrap_or_default())
        .x_desc("Phase / series")
        .y_desc(y_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(
            results.iter().enumerate().map(|(i, r)| (i, r.value)),
            &BLUE,
        ))
        .map_err(plot_err)?;
    chart
        .draw_series(
            results
                .iter()
                .enumerate()
                .map(|(i, r)| Circle::new((i, r.value), 4, BLUE.filled())),
        )
        .map_err(plot_err)?;
    Ok(())
}

/// 绘制单个结构的相对位移曲线. 横轴为排序键, 纵轴为位移 (mm).
pub fn plot_displacement<P: AsRef<Path>>(
    results: &[DisplacementResult],
    title: &str,
    path: P,
) -> Result<(), ReportError> {
    let root = SVGBackend::new(path.as_ref(), PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    draw_series_panel(&root, title, "Displacement (mm)", results)?;
    root.present().map_err(plot_err)?;
    log::debug!("位移曲线已写入 `{}`", path.as_ref().display());
    Ok(())
}

/// 绘制多面板绝对位置模长曲线, 每个结构一个面板, 纵向排列.
/// 没有数据的面板显示 `No data for ...`.
pub fn plot_magnitudes<P: AsRef<Path>>(
    panels: &[(String, Vec<DisplacementResult>)],
    path: P,
) -> Result<(), ReportError> {
    let n = panels.len().max(1);
    let size = (PLOT_SIZE.0, PLOT_SIZE.1 / 2 * n as u32);
    let root = SVGBackend::new(path.as_ref(), size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    for (area, (name, results)) in root.split_evenly((n, 1)).iter().zip(panels) {
        draw_series_panel(area, name, "|r| (mm)", results)?;
    }
    root.present().map_err(plot_err)?;
    log::debug!("模长曲线已写入 `{}`", path.as_ref().display());
    Ok(())
}
