//! HoldFlow Binary - daily holder state and supply analytics
//!
//! Reads the balance observation log and role tables from SQLite, rebuilds
//! daily holder state for the analysis window and writes the report tables.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin holdflow -- --backend sqlite
//! ```
//!
//! ## Environment Variables
//!
//! - HOLDFLOW_DB_PATH - Source SQLite database (default: data/holdflow.db)
//! - HOLDFLOW_OUTPUT_PATH - JSONL directory, or parent of `reports.db` with --backend sqlite (default: data/reports)
//! - ANALYSIS_START / ANALYSIS_END - Window bounds, YYYY-MM-DD (required)
//! - SIGNIFICANCE_FLOOR - Minimum significant balance (default: 1.0)
//! - KNOWN_TOTAL_QUANTITY - Total supply used for normalization (default: 1000000000)
//! - COHORT_THRESHOLDS - e.g. `0.0001:shrimp,0.001:crab,1:whale`
//! - AGE_BUCKETS - e.g. `0:fresh,7:week,30:month`
//! - BASELINE_WINDOW_DAYS - Velocity baseline window (default: 30)
//! - RECONSTRUCT_SHARDS - Parallel reconstruction tasks (default: 4)
//! - RUST_LOG - Logging level (optional, default: info)

use holdflow::config::{AnalysisConfig, BackendType};
use holdflow::engine::AnalysisEngine;
use holdflow::sink::ReportWriter;
use holdflow::source::SqliteSourceReader;
use std::path::{Path, PathBuf};

fn report_path(backend: BackendType, output_path: &str) -> PathBuf {
    let path = Path::new(output_path);
    match backend {
        BackendType::Jsonl => path.to_path_buf(),
        BackendType::Sqlite if path.extension().is_some_and(|ext| ext == "db") => path.to_path_buf(),
        BackendType::Sqlite => path.join("reports.db"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let backend = BackendType::parse_backend_from_args();
    let config = AnalysisConfig::from_env()?;
    let output_path = report_path(backend, &config.output_path);

    log::info!("🚀 Starting HoldFlow analysis");
    log::info!("   Source: {}", config.db_path);
    log::info!("   Window: {} → {}", config.start_period, config.end_period);
    log::info!("   Significance floor: {}", config.significance_floor);
    log::info!("   Known total: {}", config.known_total_quantity);
    log::info!("   Baseline window: {} days", config.rolling_baseline_window_days);
    log::info!("   Shards: {}", config.shard_count);
    log::info!("   Output: {} ({})", output_path.display(), backend.as_str());

    let engine = AnalysisEngine::new(config)?;
    let window = engine.window();

    let reader = SqliteSourceReader::new(&engine.config().db_path)?;
    let observations = reader.read_observations(window.end)?;
    let roles = reader.read_role_sets()?;

    let output = engine.run(&observations, &roles).await?;

    for diag in &output.report.diagnostics {
        log::warn!("⚠️  {} excluded at {}: {}", diag.entity, diag.period, diag.message);
    }

    let mut writer = ReportWriter::new(backend, output_path, window)?;
    let written = writer.write_output(&output).await?;

    log::info!(
        "📝 {} wrote {} state, {} distribution and {} flow rows",
        writer.backend_type(),
        written.state_rows,
        written.distribution_rows,
        written.flow_rows
    );
    log::info!(
        "📊 Episodes: {} ({} invalid dropped), entities below floor: {}, low-confidence rows: {}",
        output.report.reconstruction.episodes,
        output.report.reconstruction.invalid_episodes,
        output.report.reconstruction.entities_below_floor,
        output.report.low_confidence_rows
    );

    Ok(())
}
