use anyhow::{Context, Result};
use axum::{routing::get, Router};
use readiness_index::{
    aggregate::{aggregate, ranking_view},
    loader, CountryRegistry, CountryWithScore,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;

/// Countries served on the featured carousel when no explicit subset is
/// configured
const DEFAULT_FEATURED_COUNT: usize = 6;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CountryRegistry>,
    pub aggregated: Arc<Vec<CountryWithScore>>,
    pub featured: Arc<Vec<CountryWithScore>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "atlas_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let countries_path = std::env::var("ATLAS_COUNTRIES_PATH")
        .unwrap_or_else(|_| "data/countries.json".to_string());
    let scores_path = std::env::var("ATLAS_SCORES_PATH")
        .unwrap_or_else(|_| "data/readiness_scores.json".to_string());

    // Fail fast on a malformed dataset; the service never starts half-fed
    let (registry, latest) = loader::load_dataset(&countries_path, &scores_path)
        .with_context(|| format!("loading dataset from {countries_path} + {scores_path}"))?;
    let aggregated = aggregate(registry.countries(), &latest)?;
    tracing::info!(
        "   Aggregated {} countries ({} with published scores)",
        aggregated.len(),
        latest.len()
    );

    let featured = featured_subset(&aggregated);
    tracing::info!("   Featured carousel: {} countries", featured.len());

    let state = AppState {
        registry: Arc::new(registry),
        aggregated: Arc::new(aggregated),
        featured: Arc::new(featured),
    };

    let country_routes = Router::new()
        .route("/countries", get(routes::list_countries))
        .route("/countries/featured", get(routes::featured_countries))
        .route("/countries/ranked", get(routes::ranked_countries))
        .route("/countries/:key", get(routes::get_country))
        .with_state(state);

    let app = Router::new()
        .route("/health", get(routes::health))
        .nest("/api/v1", country_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port = std::env::var("ATLAS_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "18610".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("HealthAI Atlas gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolve the featured carousel subset.
///
/// `ATLAS_FEATURED_IDS` (comma-separated country ids) selects explicitly,
/// preserving aggregation order; otherwise the top of the ranking view is
/// served.
fn featured_subset(aggregated: &[CountryWithScore]) -> Vec<CountryWithScore> {
    match std::env::var("ATLAS_FEATURED_IDS") {
        Ok(ids) => {
            let wanted: Vec<&str> = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .collect();
            let featured: Vec<CountryWithScore> = aggregated
                .iter()
                .filter(|entry| wanted.contains(&entry.country.id.as_str()))
                .cloned()
                .collect();
            if featured.len() < wanted.len() {
                tracing::warn!(
                    "ATLAS_FEATURED_IDS names {} countries, {} matched the dataset",
                    wanted.len(),
                    featured.len()
                );
            }
            featured
        }
        Err(_) => ranking_view(aggregated)
            .into_iter()
            .take(DEFAULT_FEATURED_COUNT)
            .collect(),
    }
}
