// 📝 Reporter - CSV report, CSV summary, markdown summary
//
// Cell conventions shared by every table:
//   month      → YYYY-MM-DD
//   missing    → empty cell
//   NaN        → empty cell
//   ±inf       → inf / -inf
//   booleans   → True / False

use crate::reconcile::{ReconciliationReport, ReconciliationRow, ReconciliationSummary};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Rows shown in the markdown sample table
pub const MARKDOWN_FAILED_LIMIT: usize = 15;

// ============================================================================
// CELL FORMATTING
// ============================================================================

pub fn format_month(month: NaiveDate) -> String {
    month.format("%Y-%m-%d").to_string()
}

/// Shortest round-trip float ("100.0", "0.5"), with CSV conventions for non-finite
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:?}", value)
    }
}

fn format_opt_float(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

fn format_opt_int(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Two-decimal money/percent cell for the markdown table
fn format_md_amount(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        Some(v) => format_float(v),
        None => String::new(),
    }
}

// ============================================================================
// RECONCILIATION REPORT CSV
// ============================================================================

#[derive(Debug, Serialize)]
struct ReportCsvRow {
    month: String,
    region: String,
    source_revenue: String,
    source_orders: i64,
    dashboard_revenue: String,
    dashboard_orders: String,
    revenue_diff: String,
    revenue_diff_pct: String,
    orders_diff: String,
    revenue_pass: &'static str,
    orders_pass: &'static str,
    overall_pass: &'static str,
}

impl From<&ReconciliationRow> for ReportCsvRow {
    fn from(row: &ReconciliationRow) -> Self {
        ReportCsvRow {
            month: format_month(row.month),
            region: row.region.clone(),
            source_revenue: format_float(row.source_revenue),
            source_orders: row.source_orders,
            dashboard_revenue: format_opt_float(row.dashboard_revenue),
            dashboard_orders: format_opt_int(row.dashboard_orders),
            revenue_diff: format_opt_float(row.revenue_diff),
            revenue_diff_pct: format_opt_float(row.revenue_diff_pct),
            orders_diff: format_opt_int(row.orders_diff),
            revenue_pass: format_bool(row.revenue_pass),
            orders_pass: format_bool(row.orders_pass),
            overall_pass: format_bool(row.overall_pass),
        }
    }
}

pub fn write_report_rows<W: io::Write>(writer: W, rows: &[ReconciliationRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(ReportCsvRow::from(row))
            .context("Failed to serialize reconciliation row")?;
    }
    wtr.flush().context("Failed to flush reconciliation report")?;
    Ok(())
}

pub fn write_report_csv(path: &Path, rows: &[ReconciliationRow]) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create report file: {:?}", path))?;
    write_report_rows(file, rows)
}

// ============================================================================
// SUMMARY CSV
// ============================================================================

pub fn write_summary_row<W: io::Write>(writer: W, summary: &ReconciliationSummary) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.serialize(summary).context("Failed to serialize summary")?;
    wtr.flush().context("Failed to flush summary")?;
    Ok(())
}

pub fn write_summary_csv(path: &Path, summary: &ReconciliationSummary) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create summary file: {:?}", path))?;
    write_summary_row(file, summary)
}

// ============================================================================
// MARKDOWN SUMMARY
// ============================================================================

const MD_COLUMNS: [&str; 9] = [
    "month",
    "region",
    "source_revenue",
    "dashboard_revenue",
    "revenue_diff",
    "revenue_diff_pct",
    "source_orders",
    "dashboard_orders",
    "orders_diff",
];

pub fn render_markdown(report: &ReconciliationReport) -> String {
    let summary = &report.summary;

    let mut lines = vec![
        "# Reconciliation Summary".to_string(),
        String::new(),
        format!("- Checks run: **{}**", summary.checks_run),
        format!(
            "- Failed checks: **{}** ({:?}%)",
            summary.checks_failed, summary.failed_pct
        ),
        format!(
            "- Tolerances: revenue ±{:?}% ; orders ±{}",
            summary.revenue_tolerance_pct, summary.orders_tolerance_abs
        ),
        String::new(),
        format!("## Sample failed checks (top {})", MARKDOWN_FAILED_LIMIT),
        String::new(),
    ];

    let failed = report.failed_rows();
    if failed.is_empty() {
        lines.push("No failed checks.".to_string());
        return lines.join("\n");
    }

    lines.push(format!("| {} |", MD_COLUMNS.join(" | ")));
    // month/region left, numbers right
    lines.push(format!(
        "|:---|:---|{}",
        "---:|".repeat(MD_COLUMNS.len() - 2)
    ));

    for row in failed.into_iter().take(MARKDOWN_FAILED_LIMIT) {
        let cells = [
            format_month(row.month),
            row.region.clone(),
            format_md_amount(Some(row.source_revenue)),
            format_md_amount(row.dashboard_revenue),
            format_md_amount(row.revenue_diff),
            format_md_amount(row.revenue_diff_pct),
            row.source_orders.to_string(),
            format_opt_int(row.dashboard_orders),
            format_opt_int(row.orders_diff),
        ];
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    lines.join("\n")
}

pub fn write_markdown(path: &Path, report: &ReconciliationReport) -> Result<()> {
    fs::write(path, render_markdown(report))
        .with_context(|| format!("Failed to write markdown summary: {:?}", path))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SourceAggregate;
    use crate::loader::DashboardRecord;
    use crate::reconcile::ReconciliationEngine;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dash(month: NaiveDate, region: &str, revenue: f64, orders: i64) -> DashboardRecord {
        DashboardRecord {
            month: month.and_hms_opt(0, 0, 0).unwrap(),
            region: region.to_string(),
            revenue: Some(revenue),
            orders: Some(orders),
        }
    }

    fn sample_report() -> ReconciliationReport {
        let jan = ymd(2024, 1, 1);
        let feb = ymd(2024, 2, 1);

        let aggregates = vec![
            SourceAggregate {
                month: jan,
                region: "EU".to_string(),
                source_revenue: 100.0,
                source_orders: 1,
            },
            SourceAggregate {
                month: feb,
                region: "US".to_string(),
                source_revenue: 1000.0,
                source_orders: 10,
            },
            SourceAggregate {
                month: feb,
                region: "APAC".to_string(),
                source_revenue: 50.5,
                source_orders: 2,
            },
        ];
        let dashboard = vec![
            dash(jan, "EU", 100.0, 1),
            dash(feb, "US", 1020.0, 10),
        ];

        ReconciliationEngine::new().reconcile(&aggregates, &dashboard)
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(100.0), "100.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(-3.33), "-3.33");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_float(f64::NAN), "");
    }

    #[test]
    fn test_report_csv_contents() {
        let report = sample_report();
        let mut buf = Vec::new();

        write_report_rows(&mut buf, &report.rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "month,region,source_revenue,source_orders,dashboard_revenue,dashboard_orders,\
             revenue_diff,revenue_diff_pct,orders_diff,revenue_pass,orders_pass,overall_pass"
        );
        assert_eq!(lines[1], "2024-01-01,EU,100.0,1,100.0,1,0.0,0.0,0,True,True,True");
        assert_eq!(lines[2], "2024-02-01,APAC,50.5,2,,,,,,False,False,False");
        assert_eq!(
            lines[3],
            "2024-02-01,US,1000.0,10,1020.0,10,20.0,2.0,0,False,True,False"
        );
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_summary_csv_contents() {
        let report = sample_report();
        let mut buf = Vec::new();

        write_summary_row(&mut buf, &report.summary).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(
            text,
            "checks_run,checks_passed,checks_failed,failed_pct,revenue_tolerance_pct,orders_tolerance_abs\n\
             3,1,2,66.67,0.5,1\n"
        );
    }

    #[test]
    fn test_markdown_summary() {
        let md = render_markdown(&sample_report());

        assert!(md.starts_with("# Reconciliation Summary\n"));
        assert!(md.contains("- Checks run: **3**"));
        assert!(md.contains("- Failed checks: **2** (66.67%)"));
        assert!(md.contains("- Tolerances: revenue ±0.5% ; orders ±1"));
        assert!(md.contains("## Sample failed checks (top 15)"));
        assert!(md.contains("| 2024-02-01 | APAC | 50.50 |  |  |  | 2 |  |  |"));
        assert!(md.contains("| 2024-02-01 | US | 1000.00 | 1020.00 | 20.00 | 2.00 | 10 | 10 | 0 |"));
        assert!(!md.contains("| 2024-01-01 | EU"));

        println!("✅ Markdown test passed:\n{}", md);
    }

    #[test]
    fn test_markdown_caps_failed_rows() {
        let jan = ymd(2024, 1, 1);
        let aggregates: Vec<SourceAggregate> = (0..20)
            .map(|i| SourceAggregate {
                month: jan,
                region: format!("R{:02}", i),
                source_revenue: 10.0,
                source_orders: 1,
            })
            .collect();

        let report = ReconciliationEngine::new().reconcile(&aggregates, &[]);
        let md = render_markdown(&report);
        let table_rows = md.lines().filter(|l| l.starts_with("| 2024-")).count();

        assert_eq!(table_rows, MARKDOWN_FAILED_LIMIT);
        assert!(md.contains("| 2024-01-01 | R00 |"));
        assert!(md.contains("| 2024-01-01 | R14 |"));
        assert!(!md.contains("| 2024-01-01 | R15 |"));
    }

    #[test]
    fn test_markdown_without_failures() {
        let jan = ymd(2024, 1, 1);
        let report = ReconciliationEngine::new().reconcile(
            &[SourceAggregate {
                month: jan,
                region: "EU".to_string(),
                source_revenue: 1.0,
                source_orders: 1,
            }],
            &[dash(jan, "EU", 1.0, 1)],
        );

        let md = render_markdown(&report);

        assert!(md.contains("- Failed checks: **0** (0.0%)"));
        assert!(md.ends_with("No failed checks."));
    }

    #[test]
    fn test_markdown_tolerance_matches_summary_csv() {
        let report = ReconciliationEngine::with_tolerances(1.0, 2).reconcile(&[], &[]);

        let md = render_markdown(&report);
        let mut buf = Vec::new();
        write_summary_row(&mut buf, &report.summary).unwrap();
        let csv = String::from_utf8(buf).unwrap();

        assert!(md.contains("- Tolerances: revenue ±1.0% ; orders ±2"));
        assert!(csv.ends_with(",1.0,2\n"));
    }
}
