// 📈 Charts - Static PNG views of a reconciliation run
//
// failed_checks_by_month.png  line chart, one point per month
// revenue_diff_heatmap.png    region × month grid of mean revenue_diff_pct
// workflow.png                fixed diagram of the pipeline stages
//
// Sizes match a 160 dpi render of the usual figure sizes.

use crate::config::{FAILURES_CHART, HEATMAP_CHART, WORKFLOW_CHART};
use crate::reconcile::{ReconciliationReport, RevenueDiffMatrix};
use crate::report::format_month;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const FAILURES_SIZE: (u32, u32) = (1024, 768);
pub const HEATMAP_SIZE: (u32, u32) = (1600, 512);
pub const WORKFLOW_SIZE: (u32, u32) = (1440, 416);

const FONT: &str = "sans-serif";
const COLORBAR_WIDTH: u32 = 170;
const COLORBAR_STEPS: usize = 100;

const NEGATIVE: RGBColor = RGBColor(33, 102, 172);
const NEUTRAL: RGBColor = RGBColor(247, 247, 247);
const POSITIVE: RGBColor = RGBColor(178, 24, 43);
const NO_DATA: RGBColor = RGBColor(200, 200, 200);

/// Render all three charts into `image_dir`, returning the files written
pub fn render_all(image_dir: &Path, report: &ReconciliationReport) -> Result<Vec<PathBuf>> {
    let failures = image_dir.join(FAILURES_CHART);
    render_failures_by_month(&failures, &report.failures_by_month())?;

    let heatmap = image_dir.join(HEATMAP_CHART);
    render_revenue_diff_heatmap(&heatmap, &report.revenue_diff_matrix())?;

    let workflow = image_dir.join(WORKFLOW_CHART);
    render_workflow(&workflow)?;

    Ok(vec![failures, heatmap, workflow])
}

// ============================================================================
// LABEL + COLOR HELPERS
// ============================================================================

fn rotated_label_style() -> TextStyle<'static> {
    (FONT, 14).into_font().transform(FontTransform::Rotate90).into()
}

fn centered(size: i32) -> TextStyle<'static> {
    TextStyle::from((FONT, size).into_font()).pos(Pos::new(HPos::Center, VPos::Center))
}

/// Axis label for a 0-based category index, blank outside the range
fn index_label(labels: &[String], idx: i32) -> String {
    usize::try_from(idx)
        .ok()
        .and_then(|i| labels.get(i))
        .cloned()
        .unwrap_or_default()
}

/// Heatmap cells span two axis units; odd positions are cell centers
fn cell_center_label(labels: &[String], pos: i32) -> String {
    if pos % 2 == 1 {
        index_label(labels, (pos - 1) / 2)
    } else {
        String::new()
    }
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Diverging scale: blue below zero, near-white at zero, red above.
/// `bound` is the absolute value mapped to full saturation; ±inf saturates.
pub fn diff_color(value: f64, bound: f64) -> RGBColor {
    if value.is_nan() || bound <= 0.0 {
        return NEUTRAL;
    }
    let t = (value / bound).clamp(-1.0, 1.0);
    if t < 0.0 {
        lerp(NEUTRAL, NEGATIVE, -t)
    } else {
        lerp(NEUTRAL, POSITIVE, t)
    }
}

fn color_bound(matrix: &RevenueDiffMatrix) -> f64 {
    match matrix.value_range() {
        Some((lo, hi)) => {
            let bound = lo.abs().max(hi.abs());
            if bound > 0.0 {
                bound
            } else {
                1.0
            }
        }
        None => 1.0,
    }
}

// ============================================================================
// FAILED CHECKS BY MONTH
// ============================================================================

pub fn render_failures_by_month(path: &Path, points: &[(NaiveDate, usize)]) -> Result<()> {
    let root = BitMapBackend::new(path, FAILURES_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<String> = points.iter().map(|(month, _)| format_month(*month)).collect();
    let n = points.len() as i32;
    let y_max = points.iter().map(|(_, count)| *count).max().unwrap_or(0) as i32 + 1;

    let mut chart = ChartBuilder::on(&root)
        .caption("Failed Reconciliation Checks by Month", (FONT, 28))
        .margin(20)
        .x_label_area_size(130)
        .y_label_area_size(70)
        .build_cartesian_2d(-1..n, 0..y_max)?;

    chart
        .configure_mesh()
        .x_labels(points.len() + 2)
        .x_label_formatter(&|x| index_label(&labels, *x))
        .x_label_style(rotated_label_style())
        .x_desc("Month")
        .y_desc("Failed checks")
        .draw()?;

    let series: Vec<(i32, i32)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, count))| (i as i32, *count as i32))
        .collect();

    chart.draw_series(LineSeries::new(series.iter().copied(), BLUE.stroke_width(2)))?;
    chart.draw_series(series.iter().map(|&p| Circle::new(p, 5, BLUE.filled())))?;

    root.present()
        .with_context(|| format!("Failed to write chart: {:?}", path))?;
    debug!(path = %path.display(), months = points.len(), "rendered failures chart");
    Ok(())
}

// ============================================================================
// REVENUE DIFF HEATMAP
// ============================================================================

pub fn render_revenue_diff_heatmap(path: &Path, matrix: &RevenueDiffMatrix) -> Result<()> {
    let root = BitMapBackend::new(path, HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (grid_area, bar_area) = root.split_horizontally(HEATMAP_SIZE.0 - COLORBAR_WIDTH);
    let bound = color_bound(matrix);

    let month_labels: Vec<String> = matrix
        .months
        .iter()
        .map(|m| m.format("%Y-%m").to_string())
        .collect();
    // Row 0 (first region) is drawn at the top
    let region_labels: Vec<String> = matrix.regions.iter().rev().cloned().collect();

    let cols = matrix.months.len() as i32;
    let rows = matrix.regions.len() as i32;

    let mut chart = ChartBuilder::on(&grid_area)
        .caption("Revenue Difference % (Dashboard - Source)", (FONT, 26))
        .margin(15)
        .x_label_area_size(90)
        .y_label_area_size(90)
        .build_cartesian_2d(0..(2 * cols).max(1), 0..(2 * rows).max(1))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels((2 * cols + 1) as usize)
        .y_labels((2 * rows + 1) as usize)
        .x_label_formatter(&|x| cell_center_label(&month_labels, *x))
        .y_label_formatter(&|y| cell_center_label(&region_labels, *y))
        .x_label_style(rotated_label_style())
        .draw()?;

    let mut cells = Vec::new();
    for (r, row) in matrix.cells.iter().enumerate() {
        let y0 = 2 * (rows - 1 - r as i32);
        for (c, cell) in row.iter().enumerate() {
            let x0 = 2 * c as i32;
            let color = match cell {
                Some(v) => diff_color(*v, bound),
                None => NO_DATA,
            };
            cells.push(Rectangle::new([(x0, y0), (x0 + 2, y0 + 2)], color.filled()));
        }
    }
    chart.draw_series(cells)?;

    render_colorbar(&bar_area, bound)?;

    root.present()
        .with_context(|| format!("Failed to write chart: {:?}", path))?;
    debug!(
        path = %path.display(),
        regions = matrix.regions.len(),
        months = matrix.months.len(),
        "rendered revenue diff heatmap"
    );
    Ok(())
}

fn render_colorbar(area: &DrawingArea<BitMapBackend<'_>, Shift>, bound: f64) -> Result<()> {
    let mut bar = ChartBuilder::on(area)
        .margin_top(60)
        .margin_bottom(15)
        .margin_left(20)
        .margin_right(10)
        .x_label_area_size(90)
        .right_y_label_area_size(80)
        .build_cartesian_2d(0.0..1.0, -bound..bound)?;

    bar.configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_labels(7)
        .y_label_formatter(&|v| format!("{:.2}", v))
        .y_desc("Diff %")
        .draw()?;

    let step = 2.0 * bound / COLORBAR_STEPS as f64;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let lo = -bound + i as f64 * step;
        let color = diff_color(lo + step / 2.0, bound);
        Rectangle::new([(0.0, lo), (1.0, lo + step)], color.filled())
    }))?;

    Ok(())
}

// ============================================================================
// WORKFLOW DIAGRAM
// ============================================================================

const WORKFLOW_STAGES: [&[&str]; 4] = [
    &["Source Data", "(transactions)"],
    &["Aggregate", "(Month/Region)"],
    &["Compare to", "Dashboard Extract"],
    &["Pass/Fail"],
];

pub fn render_workflow(path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, WORKFLOW_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (width, _) = WORKFLOW_SIZE;
    root.draw(&Text::new("Workflow", (width as i32 / 2, 50), centered(30)))?;

    let box_w = 260;
    let box_h = 130;
    let gap = 100;
    let top = 150;
    let left = (width as i32 - (4 * box_w + 3 * gap)) / 2;
    let line_h = 28;

    for (i, lines) in WORKFLOW_STAGES.iter().enumerate() {
        let x0 = left + i as i32 * (box_w + gap);
        let x1 = x0 + box_w;
        let corners = [(x0, top), (x1, top + box_h)];

        root.draw(&Rectangle::new(corners, RGBColor(222, 235, 247).filled()))?;
        root.draw(&Rectangle::new(corners, BLACK.stroke_width(2)))?;

        let cx = x0 + box_w / 2;
        let first_y = top + box_h / 2 - (lines.len() as i32 - 1) * line_h / 2;
        for (j, line) in lines.iter().enumerate() {
            root.draw(&Text::new(*line, (cx, first_y + j as i32 * line_h), centered(22)))?;
        }

        if i + 1 < WORKFLOW_STAGES.len() {
            let y = top + box_h / 2;
            let ax0 = x1 + 12;
            let ax1 = x1 + gap - 12;
            root.draw(&PathElement::new(vec![(ax0, y), (ax1 - 14, y)], BLACK.stroke_width(3)))?;
            root.draw(&Polygon::new(
                vec![(ax1, y), (ax1 - 16, y - 10), (ax1 - 16, y + 10)],
                BLACK.filled(),
            ))?;
        }
    }

    root.present()
        .with_context(|| format!("Failed to write chart: {:?}", path))?;
    debug!(path = %path.display(), "rendered workflow diagram");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assert_png(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.len() > PNG_MAGIC.len());
        assert_eq!(bytes[..8], PNG_MAGIC);
    }

    #[test]
    fn test_diff_color_scale() {
        assert_eq!(diff_color(0.0, 2.0), NEUTRAL);
        assert_eq!(diff_color(2.0, 2.0), POSITIVE);
        assert_eq!(diff_color(-5.0, 2.0), NEGATIVE);
        assert_eq!(diff_color(f64::NAN, 2.0), NEUTRAL);
        assert_eq!(diff_color(f64::INFINITY, 2.0), POSITIVE);
        assert_eq!(diff_color(f64::NEG_INFINITY, 2.0), NEGATIVE);

        // halfway between near-white and red
        assert_eq!(diff_color(1.0, 2.0), RGBColor(213, 136, 145));
    }

    #[test]
    fn test_axis_labels() {
        let labels = vec!["2024-01".to_string(), "2024-02".to_string()];

        assert_eq!(index_label(&labels, -1), "");
        assert_eq!(index_label(&labels, 1), "2024-02");
        assert_eq!(index_label(&labels, 2), "");

        assert_eq!(cell_center_label(&labels, 0), "");
        assert_eq!(cell_center_label(&labels, 1), "2024-01");
        assert_eq!(cell_center_label(&labels, 3), "2024-02");
        assert_eq!(cell_center_label(&labels, 4), "");
    }

    #[test]
    fn test_render_failures_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FAILURES_CHART);

        render_failures_by_month(
            &path,
            &[(ymd(2024, 1, 1), 2), (ymd(2024, 2, 1), 0), (ymd(2024, 3, 1), 5)],
        )
        .unwrap();

        assert_png(&path);
    }

    #[test]
    fn test_render_heatmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HEATMAP_CHART);

        let matrix = RevenueDiffMatrix {
            regions: vec!["EU".to_string(), "US".to_string()],
            months: vec![ymd(2024, 1, 1), ymd(2024, 2, 1)],
            cells: vec![vec![Some(-1.5), None], vec![Some(0.0), Some(3.25)]],
        };
        render_revenue_diff_heatmap(&path, &matrix).unwrap();

        assert_png(&path);
    }

    #[test]
    fn test_render_empty_charts() {
        let dir = tempfile::tempdir().unwrap();

        let failures = dir.path().join(FAILURES_CHART);
        render_failures_by_month(&failures, &[]).unwrap();
        assert_png(&failures);

        let heatmap = dir.path().join(HEATMAP_CHART);
        let empty = RevenueDiffMatrix {
            regions: vec![],
            months: vec![],
            cells: vec![],
        };
        render_revenue_diff_heatmap(&heatmap, &empty).unwrap();
        assert_png(&heatmap);
    }

    #[test]
    fn test_render_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORKFLOW_CHART);

        render_workflow(&path).unwrap();

        assert_png(&path);
        println!("✅ Workflow diagram rendered: {:?}", path);
    }
}
