//! Readiness Ranking CLI
//!
//! Regenerates the published country ranking for the HealthAI Atlas
//! dashboard from the reference dataset.
//!
//! Usage:
//!   rank-countries --countries data/countries.json \
//!                  --scores data/readiness_scores.json \
//!                  --output data/aggregated_countries.json

use anyhow::Result;
use clap::Parser;
use readiness_index::{
    aggregate::{aggregate, assign_rankings, ranking_view, CountryWithScore},
    loader,
    score::{latest_scores, PillarWeights},
};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "rank-countries",
    about = "Aggregate and rank countries for the HealthAI Atlas readiness dashboard"
)]
struct Args {
    /// Path to the country reference JSON file
    #[arg(short, long, default_value = "data/countries.json")]
    countries: PathBuf,

    /// Path to the score record JSON file
    #[arg(short, long, default_value = "data/readiness_scores.json")]
    scores: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "data/aggregated_countries.json")]
    output: PathBuf,

    /// Optional JSON file with pillar weight overrides; composite scores
    /// are recomputed with these weights
    #[arg(long)]
    weights_file: Option<PathBuf>,

    /// Recompute global and regional rankings from composite scores
    #[arg(long)]
    recompute_rankings: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(serde::Serialize)]
struct ReportMetadata {
    total_countries: usize,
    scored_countries: usize,
    weights: PillarWeights,
    generated_at: String,
}

#[derive(serde::Serialize)]
struct Report {
    metadata: ReportMetadata,
    /// Countries in ranking order (composite descending)
    countries: Vec<CountryWithScore>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("HealthAI Atlas Country Ranker");
    info!("{}", "=".repeat(60));

    let countries = loader::load_countries(&args.countries)?;
    if countries.is_empty() {
        anyhow::bail!("no usable countries in {:?}", args.countries);
    }
    let registry = readiness_index::CountryRegistry::new(countries)?;
    let mut records = loader::load_score_records(&args.scores)?;

    // Weights are deployment configuration. When overridden, composites
    // are recomputed so every record carries the same formula.
    let weights = match &args.weights_file {
        Some(path) => {
            let mut weights: PillarWeights = serde_json::from_reader(File::open(path)?)?;
            if !weights.is_normalized() {
                warn!("Weights in {:?} sum to {:.6}, normalizing", path, weights.sum());
                weights.normalize();
            }
            info!("Recomputing composites with weights from {:?}", path);
            for record in &mut records {
                record.total_score = weights.composite(
                    record.physical_infrastructure,
                    record.human_capital,
                    record.regulatory_infrastructure,
                    record.economic_market,
                );
            }
            weights
        }
        None => PillarWeights::default(),
    };

    if args.recompute_rankings {
        info!("Recomputing global and regional rankings");
        assign_rankings(&registry, &mut records)?;
    }

    let latest = latest_scores(records);
    let aggregated = aggregate(registry.countries(), &latest)?;
    let ranked = ranking_view(&aggregated);

    info!("Aggregated {} countries ({} scored)", aggregated.len(), latest.len());
    info!("\nTop 10 by composite score:");
    for entry in ranked.iter().take(10) {
        match &entry.score {
            Some(score) => info!(
                "  {:6.2} | {:30} | tier {} | {}",
                score.total_score,
                entry.country.name,
                score.readiness_tier,
                entry.country.region.display_name()
            ),
            None => info!("   (n/a) | {:30} | unscored", entry.country.name),
        }
    }

    let report = Report {
        metadata: ReportMetadata {
            total_countries: aggregated.len(),
            scored_countries: latest.len(),
            weights,
            generated_at: chrono::Utc::now().to_rfc3339(),
        },
        countries: ranked,
    };

    info!("\nWriting output to {:?}", args.output);
    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &report)?;

    Ok(())
}
