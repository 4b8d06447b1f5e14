// 📂 Loader - Source transactions + dashboard extract
//
// Both inputs are plain CSV with a header row. Columns are matched by name,
// extra columns are ignored. One bad row aborts the whole load.

use crate::error::ReconError;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::debug;

// ============================================================================
// RECORDS
// ============================================================================

/// One raw transaction from source_transactions.csv
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTransaction {
    pub transaction_id: String,
    pub transaction_date: NaiveDateTime,
    pub region: String,
    pub revenue: f64,
}

/// One pre-aggregated row from dashboard_extract.csv.
/// `month` keeps whatever date and time the extract carries; a blank
/// revenue or orders cell is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRecord {
    pub month: NaiveDateTime,
    pub region: String,
    pub revenue: Option<f64>,
    pub orders: Option<i64>,
}

// Wire shapes: dates stay as text until we can report the row on failure
#[derive(Debug, Deserialize)]
struct SourceRow {
    transaction_id: String,
    transaction_date: String,
    region: String,
    revenue: f64,
}

#[derive(Debug, Deserialize)]
struct DashboardRow {
    month: String,
    region: String,
    revenue: Option<f64>,
    orders: Option<i64>,
}

// ============================================================================
// DATE PARSING
// ============================================================================

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse the date/timestamp shapes upstream exports produce.
/// Timezone offsets are dropped (wall-clock time is kept).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    // Bare month: "2024-01"
    NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

// ============================================================================
// LOADING
// ============================================================================

/// Fail with a MissingFile error unless `path` exists
pub fn ensure_exists(path: &Path, label: &'static str) -> Result<()> {
    if !path.exists() {
        return Err(ReconError::MissingFile {
            label,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

pub fn load_source_transactions(path: &Path) -> Result<Vec<SourceTransaction>> {
    let rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open source file: {:?}", path))?;
    let transactions = read_source_transactions(rdr, path)?;

    debug!(path = %path.display(), rows = transactions.len(), "loaded source transactions");
    Ok(transactions)
}

pub fn load_dashboard_extract(path: &Path) -> Result<Vec<DashboardRecord>> {
    let rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open dashboard extract: {:?}", path))?;
    let records = read_dashboard_extract(rdr, path)?;

    debug!(path = %path.display(), rows = records.len(), "loaded dashboard extract");
    Ok(records)
}

/// `origin` is only used in error messages
pub fn read_source_transactions<R: io::Read>(
    mut rdr: csv::Reader<R>,
    origin: &Path,
) -> Result<Vec<SourceTransaction>> {
    let mut transactions = Vec::new();

    for (idx, result) in rdr.deserialize::<SourceRow>().enumerate() {
        let row_no = idx + 1;
        let row = result.with_context(|| {
            format!("Failed to deserialize row {} of {:?}", row_no, origin)
        })?;

        let transaction_date =
            parse_timestamp(&row.transaction_date).ok_or_else(|| ReconError::DateParse {
                file: origin.to_path_buf(),
                row: row_no,
                value: row.transaction_date.clone(),
            })?;

        transactions.push(SourceTransaction {
            transaction_id: row.transaction_id,
            transaction_date,
            region: row.region,
            revenue: row.revenue,
        });
    }

    Ok(transactions)
}

pub fn read_dashboard_extract<R: io::Read>(
    mut rdr: csv::Reader<R>,
    origin: &Path,
) -> Result<Vec<DashboardRecord>> {
    let mut records = Vec::new();

    for (idx, result) in rdr.deserialize::<DashboardRow>().enumerate() {
        let row_no = idx + 1;
        let row = result.with_context(|| {
            format!("Failed to deserialize row {} of {:?}", row_no, origin)
        })?;

        let month = parse_timestamp(&row.month).ok_or_else(|| ReconError::DateParse {
            file: origin.to_path_buf(),
            row: row_no,
            value: row.month.clone(),
        })?;

        records.push(DashboardRecord {
            month,
            region: row.region,
            revenue: row.revenue,
            orders: row.orders,
        });
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
