use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use readiness_index::{aggregate::ranking_view, CountryRecord};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// All countries in aggregation order, unscored ones included with a
/// null score
pub async fn list_countries(State(state): State<AppState>) -> Json<Vec<CountryRecord>> {
    Json(to_records(&state.aggregated))
}

/// Curated carousel subset
pub async fn featured_countries(State(state): State<AppState>) -> Json<Vec<CountryRecord>> {
    Json(to_records(&state.featured))
}

/// Ranking view: composite descending, ties by country id, unscored last
pub async fn ranked_countries(State(state): State<AppState>) -> Json<Vec<CountryRecord>> {
    Json(
        ranking_view(&state.aggregated)
            .iter()
            .map(CountryRecord::from_aggregated)
            .collect(),
    )
}

/// Single country by id, ISO alpha-2, or ISO alpha-3
pub async fn get_country(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CountryRecord>, (StatusCode, Json<ErrorBody>)> {
    let entry = state.registry.lookup(&key).and_then(|country| {
        state
            .aggregated
            .iter()
            .find(|entry| entry.country.id == country.id)
    });

    match entry {
        Some(entry) => Ok(Json(CountryRecord::from_aggregated(entry))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: ErrorDetail {
                    kind: "not_found",
                    message: format!("no country matching '{key}'"),
                },
            }),
        )),
    }
}

fn to_records(entries: &[readiness_index::CountryWithScore]) -> Vec<CountryRecord> {
    entries.iter().map(CountryRecord::from_aggregated).collect()
}
