// Dashboard Reconciliation - Core Library
// Exposes the pipeline stages for the CLI and for tests

pub mod config;
pub mod error;
pub mod loader;     // Loader: source transactions + dashboard extract
pub mod aggregate;  // Aggregator: month/region totals
pub mod reconcile;  // Reconciler: left join + tolerance checks
pub mod report;     // Reporter: CSV + markdown
pub mod charts;     // Reporter: PNG charts
pub mod pipeline;

// Re-export commonly used types
pub use config::{ReconConfig, ToleranceConfig};
pub use error::ReconError;
pub use loader::{
    DashboardRecord, SourceTransaction,
    load_dashboard_extract, load_source_transactions, parse_timestamp,
};
pub use aggregate::{aggregate_by_month_region, round2, SourceAggregate};
pub use reconcile::{
    ReconciliationEngine, ReconciliationReport, ReconciliationRow,
    ReconciliationSummary, RevenueDiffMatrix,
};
pub use pipeline::{run, RunOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
