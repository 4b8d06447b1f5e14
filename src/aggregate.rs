// 📊 Aggregator - Monthly/regional totals from raw transactions
//
// month = first day of the transaction's calendar month
// source_revenue = round2(sum(revenue)), source_orders = count(rows)

use crate::loader::SourceTransaction;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Round to 2 decimals the way NumPy does: scale, round half to even, unscale.
/// Non-finite input is returned unchanged.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Truncate a timestamp to the first day of its month
pub fn month_start(ts: NaiveDateTime) -> NaiveDate {
    month_of(ts.date())
}

pub fn month_of(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month; with_day(1) cannot fail
    date.with_day(1).unwrap_or(date)
}

/// Group key for the month/region aggregation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthRegion {
    pub month: NaiveDate,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceAggregate {
    pub month: NaiveDate,
    pub region: String,
    pub source_revenue: f64,
    pub source_orders: i64,
}

/// One aggregate per distinct (month, region), ascending by key
pub fn aggregate_by_month_region(transactions: &[SourceTransaction]) -> Vec<SourceAggregate> {
    let mut groups: BTreeMap<MonthRegion, (f64, i64)> = BTreeMap::new();

    for tx in transactions {
        let key = MonthRegion {
            month: month_start(tx.transaction_date),
            region: tx.region.clone(),
        };
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += tx.revenue;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(key, (revenue, orders))| SourceAggregate {
            month: key.month,
            region: key.region,
            source_revenue: round2(revenue),
            source_orders: orders,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
