use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recon_dashboard::{run, ReconConfig};

fn main() -> Result<()> {
    init_tracing();

    println!("⚖️  Dashboard Reconciliation v{}", recon_dashboard::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Paths are relative to the working directory (recon.toml is optional)
    let config = ReconConfig::load(Path::new("."))?;
    println!(
        "📂 Reading inputs from {} (revenue ±{}%, orders ±{})",
        config.data_dir.display(),
        config.tolerance.revenue_pct,
        config.tolerance.orders_abs
    );

    let outcome = run(&config)?;

    println!(
        "🔍 {} checks run, {} failed ({}%)",
        outcome.summary.checks_run, outcome.summary.checks_failed, outcome.summary.failed_pct
    );
    println!("✅ Done. Outputs written to: {}", outcome.report_dir.display());
    println!("✅ Charts written to: {}", outcome.image_dir.display());

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recon_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
