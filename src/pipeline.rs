// 🔁 Pipeline - load → aggregate → reconcile → emit
//
// One synchronous pass. Output directories are created first, so a run that
// fails on a missing input still leaves them behind. Writes are not atomic:
// a failure part-way leaves earlier outputs updated and later ones stale.

use crate::aggregate::aggregate_by_month_region;
use crate::charts;
use crate::config::{ReconConfig, REPORT_CSV, SUMMARY_CSV, SUMMARY_MD};
use crate::loader::{ensure_exists, load_dashboard_extract, load_source_transactions};
use crate::reconcile::{ReconciliationEngine, ReconciliationSummary};
use crate::report::{write_markdown, write_report_csv, write_summary_csv};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_dir: PathBuf,
    pub image_dir: PathBuf,
    pub chart_files: Vec<PathBuf>,
    pub summary: ReconciliationSummary,
}

pub fn run(config: &ReconConfig) -> Result<RunOutcome> {
    config.validate()?;

    fs::create_dir_all(&config.report_dir)
        .with_context(|| format!("Failed to create report directory: {:?}", config.report_dir))?;
    fs::create_dir_all(&config.image_dir)
        .with_context(|| format!("Failed to create image directory: {:?}", config.image_dir))?;

    // 1. Load (both inputs must exist before either is read)
    let source_path = config.source_path();
    let dashboard_path = config.dashboard_path();
    ensure_exists(&source_path, "source")?;
    ensure_exists(&dashboard_path, "dashboard extract")?;

    let transactions = load_source_transactions(&source_path)?;
    let dashboard = load_dashboard_extract(&dashboard_path)?;
    info!(
        transactions = transactions.len(),
        dashboard_rows = dashboard.len(),
        "inputs loaded"
    );

    // 2. Aggregate
    let aggregates = aggregate_by_month_region(&transactions);
    info!(groups = aggregates.len(), "aggregated by month/region");

    // 3. Reconcile
    let engine = ReconciliationEngine::from_tolerances(&config.tolerance);
    let report = engine.reconcile(&aggregates, &dashboard);

    // 4. Emit
    let report_csv = config.report_dir.join(REPORT_CSV);
    let summary_csv = config.report_dir.join(SUMMARY_CSV);
    let summary_md = config.report_dir.join(SUMMARY_MD);

    write_report_csv(&report_csv, &report.rows)?;
    write_summary_csv(&summary_csv, &report.summary)?;
    write_markdown(&summary_md, &report)?;

    let chart_files = charts::render_all(&config.image_dir, &report)?;

    info!("{}", report.summary_line());

    Ok(RunOutcome {
        report_dir: config.report_dir.clone(),
        image_dir: config.image_dir.clone(),
        chart_files,
        summary: report.summary,
    })
}
