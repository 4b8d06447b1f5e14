// ⚖️ Reconciliation Engine - Source aggregates vs dashboard extract
//
// Left join on (month, region), then per row:
//   revenue_diff     = round2(dashboard_revenue - source_revenue)
//   revenue_diff_pct = round2(revenue_diff / source_revenue * 100)
//   orders_diff      = dashboard_orders - source_orders
//   overall_pass     = |revenue_diff_pct| <= revenue tol AND |orders_diff| <= orders tol
//
// The join is on the dashboard month exactly as parsed. Source months sit at
// midnight on the 1st, so a dashboard row dated anywhere else stays unmatched.
// A row with no dashboard match has no diffs and never passes. A blank
// dashboard revenue or orders cell fails that one check the same way.
// source_revenue == 0 makes revenue_diff_pct non-finite (inf or NaN); the
// value is kept as-is and the revenue check fails.

use crate::aggregate::{round2, SourceAggregate};
use crate::config::ToleranceConfig;
use crate::loader::DashboardRecord;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

// ============================================================================
// RECONCILIATION ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationRow {
    pub month: NaiveDate,
    pub region: String,
    pub source_revenue: f64,
    pub source_orders: i64,

    /// None = no dashboard row for this (month, region), or a blank cell
    pub dashboard_revenue: Option<f64>,
    pub dashboard_orders: Option<i64>,

    pub revenue_diff: Option<f64>,
    pub revenue_diff_pct: Option<f64>,
    pub orders_diff: Option<i64>,

    pub revenue_pass: bool,
    pub orders_pass: bool,
    pub overall_pass: bool,
}

impl ReconciliationRow {
    /// True when the dashboard supplied at least one value for this key
    pub fn has_dashboard_match(&self) -> bool {
        self.dashboard_revenue.is_some() || self.dashboard_orders.is_some()
    }

    fn key(&self) -> (NaiveDate, &str) {
        (self.month, self.region.as_str())
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Single-row run summary; field order is the CSV column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    pub checks_run: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub failed_pct: f64,
    pub revenue_tolerance_pct: f64,
    pub orders_tolerance_abs: i64,
}

impl ReconciliationSummary {
    fn from_rows(rows: &[ReconciliationRow], revenue_tol: f64, orders_tol: i64) -> Self {
        let checks_run = rows.len();
        let checks_passed = rows.iter().filter(|r| r.overall_pass).count();
        let checks_failed = checks_run - checks_passed;

        let failed_pct = if checks_run == 0 {
            0.0
        } else {
            round2(checks_failed as f64 / checks_run as f64 * 100.0)
        };

        ReconciliationSummary {
            checks_run,
            checks_passed,
            checks_failed,
            failed_pct,
            revenue_tolerance_pct: revenue_tol,
            orders_tolerance_abs: orders_tol,
        }
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    /// One row per source (month, region), ascending
    pub rows: Vec<ReconciliationRow>,
    pub summary: ReconciliationSummary,

    /// Dashboard keys with no source aggregate (dropped by the left join)
    pub unmatched_dashboard_keys: usize,

    /// Extra dashboard rows sharing a key with an earlier row (ignored)
    pub duplicate_dashboard_rows: usize,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.summary.checks_failed == 0
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Reconciliation: {} checks, {} passed, {} failed ({}%)",
            self.summary.checks_run,
            self.summary.checks_passed,
            self.summary.checks_failed,
            self.summary.failed_pct
        )
    }

    /// Failing rows, ascending by (month, region)
    pub fn failed_rows(&self) -> Vec<&ReconciliationRow> {
        let mut failed: Vec<&ReconciliationRow> =
            self.rows.iter().filter(|r| !r.overall_pass).collect();
        failed.sort_by(|a, b| a.key().cmp(&b.key()));
        failed
    }

    /// (month, failing checks) for every month with at least one row
    pub fn failures_by_month(&self) -> Vec<(NaiveDate, usize)> {
        let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for row in &self.rows {
            let count = counts.entry(row.month).or_insert(0);
            if !row.overall_pass {
                *count += 1;
            }
        }
        counts.into_iter().collect()
    }

    /// Region × month grid of mean revenue_diff_pct.
    ///
    /// Missing and NaN percentages are skipped; ±inf is kept and makes the
    /// mean infinite. Regions and months with no value at all are left out.
    pub fn revenue_diff_matrix(&self) -> RevenueDiffMatrix {
        let mut sums: HashMap<(&str, NaiveDate), (f64, usize)> = HashMap::new();
        for row in &self.rows {
            if let Some(pct) = row.revenue_diff_pct.filter(|p| !p.is_nan()) {
                let cell = sums.entry((row.region.as_str(), row.month)).or_insert((0.0, 0));
                cell.0 += pct;
                cell.1 += 1;
            }
        }
        // inf + -inf in one cell averages to NaN, which counts as empty
        sums.retain(|_, (sum, _)| !sum.is_nan());

        let regions: Vec<String> = sums
            .keys()
            .map(|(region, _)| region.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let months: Vec<NaiveDate> = sums
            .keys()
            .map(|(_, month)| *month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let cells = regions
            .iter()
            .map(|region| {
                months
                    .iter()
                    .map(|month| {
                        sums.get(&(region.as_str(), *month))
                            .map(|(sum, n)| sum / *n as f64)
                    })
                    .collect()
            })
            .collect();

        RevenueDiffMatrix {
            regions,
            months,
            cells,
        }
    }
}

/// cells[region_idx][month_idx]; None = no diff for that cell
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueDiffMatrix {
    pub regions: Vec<String>,
    pub months: Vec<NaiveDate>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl RevenueDiffMatrix {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() || self.months.is_empty()
    }

    /// (min, max) over all finite cells
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

type JoinKey<'a> = (NaiveDateTime, &'a str);

fn source_join_key(agg: &SourceAggregate) -> JoinKey<'_> {
    (agg.month.and_time(NaiveTime::MIN), agg.region.as_str())
}

pub struct ReconciliationEngine {
    /// Max allowed |revenue_diff_pct| (default: 0.5 %)
    pub revenue_tolerance_pct: f64,

    /// Max allowed |orders_diff| (default: 1 order)
    pub orders_tolerance_abs: i64,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::from_tolerances(&ToleranceConfig::default())
    }

    pub fn with_tolerances(revenue_tolerance_pct: f64, orders_tolerance_abs: i64) -> Self {
        ReconciliationEngine {
            revenue_tolerance_pct,
            orders_tolerance_abs,
        }
    }

    pub fn from_tolerances(tolerance: &ToleranceConfig) -> Self {
        Self::with_tolerances(tolerance.revenue_pct, tolerance.orders_abs)
    }

    /// Left-join `aggregates` with `dashboard` and score every row
    pub fn reconcile(
        &self,
        aggregates: &[SourceAggregate],
        dashboard: &[DashboardRecord],
    ) -> ReconciliationReport {
        let mut lookup: HashMap<JoinKey<'_>, &DashboardRecord> = HashMap::new();
        let mut duplicate_dashboard_rows = 0;

        for record in dashboard {
            let key = (record.month, record.region.as_str());
            if lookup.contains_key(&key) {
                duplicate_dashboard_rows += 1;
                warn!(
                    month = %record.month,
                    region = %record.region,
                    "duplicate dashboard row ignored, keeping the first"
                );
                continue;
            }
            lookup.insert(key, record);
        }

        let source_keys: HashSet<JoinKey<'_>> = aggregates.iter().map(source_join_key).collect();
        let unmatched_dashboard_keys = lookup.keys().filter(|k| !source_keys.contains(*k)).count();
        if unmatched_dashboard_keys > 0 {
            warn!(
                count = unmatched_dashboard_keys,
                "dashboard keys without source transactions (not reconciled)"
            );
        }

        let mut rows: Vec<ReconciliationRow> = aggregates
            .iter()
            .map(|agg| self.compare(agg, lookup.get(&source_join_key(agg)).copied()))
            .collect();
        rows.sort_by(|a, b| a.key().cmp(&b.key()));

        let summary = ReconciliationSummary::from_rows(
            &rows,
            self.revenue_tolerance_pct,
            self.orders_tolerance_abs,
        );

        info!(
            checks = summary.checks_run,
            failed = summary.checks_failed,
            "reconciliation complete"
        );

        ReconciliationReport {
            rows,
            summary,
            unmatched_dashboard_keys,
            duplicate_dashboard_rows,
        }
    }

    fn compare(&self, agg: &SourceAggregate, dash: Option<&DashboardRecord>) -> ReconciliationRow {
        let dashboard_revenue = dash.and_then(|d| d.revenue);
        let dashboard_orders = dash.and_then(|d| d.orders);

        let revenue_diff = dashboard_revenue.map(|rev| round2(rev - agg.source_revenue));
        let revenue_diff_pct = revenue_diff.map(|diff| round2(diff / agg.source_revenue * 100.0));
        let orders_diff = dashboard_orders.map(|orders| orders - agg.source_orders);

        let revenue_pass = revenue_diff_pct.is_some_and(|pct| self.revenue_within(pct));
        let orders_pass = orders_diff.is_some_and(|diff| self.orders_within(diff));

        ReconciliationRow {
            month: agg.month,
            region: agg.region.clone(),
            source_revenue: agg.source_revenue,
            source_orders: agg.source_orders,
            dashboard_revenue,
            dashboard_orders,
            revenue_diff,
            revenue_diff_pct,
            orders_diff,
            revenue_pass,
            orders_pass,
            overall_pass: revenue_pass && orders_pass,
        }
    }

    /// NaN and inf compare false, so a zero source revenue never passes
    pub fn revenue_within(&self, diff_pct: f64) -> bool {
        diff_pct.abs() <= self.revenue_tolerance_pct
    }

    pub fn orders_within(&self, diff: i64) -> bool {
        diff.abs() <= self.orders_tolerance_abs
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
