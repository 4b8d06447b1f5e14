// ⚙️ Configuration - Tolerances and directory layout
//
// Defaults reproduce the fixed layout (data/raw → outputs + images) and the
// fixed tolerances (revenue ±0.5 %, orders ±1). An optional recon.toml in
// the project root overrides any of them without a rebuild.

use crate::error::ReconError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "recon.toml";

pub const SOURCE_FILE: &str = "source_transactions.csv";
pub const DASHBOARD_FILE: &str = "dashboard_extract.csv";

pub const REPORT_CSV: &str = "reconciliation_report.csv";
pub const SUMMARY_CSV: &str = "reconciliation_summary.csv";
pub const SUMMARY_MD: &str = "reconciliation_summary.md";

pub const FAILURES_CHART: &str = "failed_checks_by_month.png";
pub const HEATMAP_CHART: &str = "revenue_diff_heatmap.png";
pub const WORKFLOW_CHART: &str = "workflow.png";

// ============================================================================
// TOLERANCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToleranceConfig {
    /// Max |revenue_diff_pct| that still passes
    #[serde(default = "default_revenue_pct")]
    pub revenue_pct: f64,

    /// Max |orders_diff| that still passes
    #[serde(default = "default_orders_abs")]
    pub orders_abs: i64,
}

fn default_revenue_pct() -> f64 {
    0.5
}

fn default_orders_abs() -> i64 {
    1
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        ToleranceConfig {
            revenue_pct: default_revenue_pct(),
            orders_abs: default_orders_abs(),
        }
    }
}

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data").join("raw")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

impl Default for ReconConfig {
    fn default() -> Self {
        ReconConfig {
            data_dir: default_data_dir(),
            report_dir: default_report_dir(),
            image_dir: default_image_dir(),
            tolerance: ToleranceConfig::default(),
        }
    }
}

impl ReconConfig {
    /// Parse and validate a recon.toml document
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: ReconConfig = toml::from_str(input)
            .map_err(|e| ReconError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<root>/recon.toml` if present, otherwise defaults.
    /// Relative directories are resolved against `root` either way.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);

        let config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to load config file: {:?}", path))?
        } else {
            Self::default()
        };

        Ok(config.rooted_at(root))
    }

    /// Resolve relative directories against `root` (absolute ones are kept)
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.data_dir = root.join(&self.data_dir);
        self.report_dir = root.join(&self.report_dir);
        self.image_dir = root.join(&self.image_dir);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let revenue = self.tolerance.revenue_pct;
        if !revenue.is_finite() || revenue < 0.0 {
            return Err(ReconError::InvalidConfig(format!(
                "tolerance.revenue_pct must be a non-negative number, got {}",
                revenue
            ))
            .into());
        }

        if self.tolerance.orders_abs < 0 {
            return Err(ReconError::InvalidConfig(format!(
                "tolerance.orders_abs must be non-negative, got {}",
                self.tolerance.orders_abs
            ))
            .into());
        }

        Ok(())
    }

    pub fn source_path(&self) -> PathBuf {
        self.data_dir.join(SOURCE_FILE)
    }

    pub fn dashboard_path(&self) -> PathBuf {
        self.data_dir.join(DASHBOARD_FILE)
    }
}

// ============================================================================
// TESTS
// ============================================================================
