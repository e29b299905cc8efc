//! Dashboard Load Probe
//!
//! Drives the load controller against a running gateway and prints the
//! resulting state snapshot as JSON. Used as a deployment smoke check:
//! a healthy gateway answers `ready`, an empty dataset answers `empty`,
//! and an unreachable gateway answers `failed` (or `ready` with
//! `from_fallback` when a fallback dataset is supplied).
//!
//! Usage:
//!   atlas-probe --gateway-url http://127.0.0.1:18610
//!   atlas-probe --featured --fallback-countries data/countries.json \
//!               --fallback-scores data/readiness_scores.json

use anyhow::Result;
use clap::Parser;
use dashboard_loader::{
    ControllerConfig, CountryDataService, FetchScope, FixedDataService, HttpDataService,
    LoadController,
};
use readiness_index::{aggregate::aggregate, loader, CountryRecord};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "atlas-probe",
    about = "Exercise the dashboard load controller against an atlas gateway"
)]
struct Args {
    /// Gateway base URL
    #[arg(long, default_value = "http://127.0.0.1:18610")]
    gateway_url: String,

    /// Request the featured carousel instead of the full country list
    #[arg(long)]
    featured: bool,

    /// Fetch timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Country reference file for the offline fallback dataset
    #[arg(long, requires = "fallback_scores")]
    fallback_countries: Option<PathBuf>,

    /// Score record file for the offline fallback dataset
    #[arg(long, requires = "fallback_countries")]
    fallback_scores: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let fallback: Option<Arc<dyn CountryDataService>> =
        match (&args.fallback_countries, &args.fallback_scores) {
            (Some(countries_path), Some(scores_path)) => {
                let (registry, latest) = loader::load_dataset(countries_path, scores_path)?;
                let aggregated = aggregate(registry.countries(), &latest)?;
                let records: Vec<CountryRecord> =
                    aggregated.iter().map(CountryRecord::from_aggregated).collect();
                info!("Fallback dataset loaded: {} countries", records.len());
                Some(Arc::new(FixedDataService::new(records)))
            }
            _ => None,
        };

    let controller = LoadController::with_config(
        Arc::new(HttpDataService::new(&args.gateway_url)),
        ControllerConfig {
            timeout: Duration::from_secs(args.timeout_secs),
            fallback,
        },
    );

    let scope = if args.featured {
        FetchScope::Featured
    } else {
        FetchScope::All
    };
    info!("Probing {} ({:?})", args.gateway_url, scope);

    let state = controller.load(scope).await;
    info!("Controller settled in state '{}'", state.name());

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
