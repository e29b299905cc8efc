//! Country Readiness Index Core
//!
//! Data model and aggregation layer for the HealthAI Atlas country
//! readiness dashboard. Joins static country reference data with
//! per-year readiness score records and derives the display attributes
//! (tier styling, trajectory icon, confidence band) the dashboard renders.
//!
//! # Composite Model (4-Pillar, Externally Weighted)
//!
//! ```text
//! Total(c) = w₁·PI + w₂·HC + w₃·RI + w₄·EM
//! ```
//!
//! | Pillar | Default Weight | Description |
//! |--------|--------|-------------|
//! | PI     | 0.30   | Physical infrastructure (power, connectivity, compute) |
//! | HC     | 0.25   | Human capital (clinical AI workforce, training pipeline) |
//! | RI     | 0.25   | Regulatory infrastructure (approval pathways, health data law) |
//! | EM     | 0.20   | Economic and market (financing, procurement, demand) |
//!
//! The weight vector is deployment configuration, not a constant of the
//! model. The published dataset is produced with a single weight set
//! applied to every country so cross-country ranking stays valid.
//!
//! # Tier Bands
//!
//! Tiers are a monotone step function of the composite score with
//! configured boundaries (defaults: tier 1 at 70+, tier 2 at 40+,
//! tier 3 below). See [`score::TierThresholds`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod aggregate;
pub mod loader;
pub mod score;
pub mod wire;

pub use aggregate::{aggregate, ranking_view, ConfidenceBand, CountryWithScore, Presentation};
pub use score::{
    latest_scores, DataQuality, PeerReviewStatus, PillarWeights, ReadinessScoreRecord,
    TierThresholds, Trajectory,
};
pub use wire::CountryRecord;

/// Valid domain for pillar and composite scores.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Valid domain for data-quality confidence.
pub const CONFIDENCE_MIN: f64 = 0.0;
pub const CONFIDENCE_MAX: f64 = 1.0;

/// Readiness tiers run 1 (highest) through 3.
pub const TIER_MIN: u8 = 1;
pub const TIER_MAX: u8 = 3;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation failed for {entity} '{id}': {reason}")]
    Validation {
        entity: &'static str,
        id: String,
        reason: String,
    },
    #[error("{field} = {value} for '{country_id}' outside [{min}, {max}]")]
    Range {
        country_id: String,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("country not found: {0}")]
    NotFound(String),
    #[error("no countries in dataset")]
    NoCountries,
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// African sub-regions (UN M49 grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    NorthernAfrica,
    WesternAfrica,
    EasternAfrica,
    CentralAfrica,
    SouthernAfrica,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::NorthernAfrica,
        Region::WesternAfrica,
        Region::EasternAfrica,
        Region::CentralAfrica,
        Region::SouthernAfrica,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Region::NorthernAfrica => "Northern Africa",
            Region::WesternAfrica => "Western Africa",
            Region::EasternAfrica => "Eastern Africa",
            Region::CentralAfrica => "Central Africa",
            Region::SouthernAfrica => "Southern Africa",
        }
    }
}

/// Static reference data for one country. Immutable after load.
///
/// The demographic and economic facts are informational only and never
/// participate in score computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    /// Stable lowercase identifier, unique across the country set
    pub id: String,
    pub name: String,
    /// ISO 3166-1 alpha-2 code (e.g. "KE"), unique
    pub iso_alpha2: String,
    /// ISO 3166-1 alpha-3 code (e.g. "KEN"), unique
    pub iso_alpha3: String,
    pub region: Region,
    pub population: u64,
    pub gdp_usd: f64,
    pub healthcare_spending_percent_gdp: f64,
}

/// Indexed view over a loaded country set.
///
/// Supports O(1) lookup by id, ISO alpha-2, or ISO alpha-3. Construction
/// fails if any of the three keys is duplicated.
#[derive(Debug, Clone, Default)]
pub struct CountryRegistry {
    countries: Vec<Country>,
    by_id: HashMap<String, usize>,
    by_iso2: HashMap<String, usize>,
    by_iso3: HashMap<String, usize>,
}

impl CountryRegistry {
    pub fn new(countries: Vec<Country>) -> Result<Self> {
        let mut registry = CountryRegistry {
            by_id: HashMap::with_capacity(countries.len()),
            by_iso2: HashMap::with_capacity(countries.len()),
            by_iso3: HashMap::with_capacity(countries.len()),
            countries,
        };

        for (idx, country) in registry.countries.iter().enumerate() {
            if registry.by_id.insert(country.id.clone(), idx).is_some() {
                return Err(duplicate_key("id", &country.id));
            }
            if registry.by_iso2.insert(country.iso_alpha2.clone(), idx).is_some() {
                return Err(duplicate_key("iso_alpha2", &country.iso_alpha2));
            }
            if registry.by_iso3.insert(country.iso_alpha3.clone(), idx).is_some() {
                return Err(duplicate_key("iso_alpha3", &country.iso_alpha3));
            }
        }

        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Country> {
        self.by_id.get(id).map(|&idx| &self.countries[idx])
    }

    /// Resolve a country by id, ISO alpha-2, or ISO alpha-3.
    pub fn lookup(&self, key: &str) -> Option<&Country> {
        self.by_id
            .get(key)
            .or_else(|| self.by_iso2.get(key))
            .or_else(|| self.by_iso3.get(key))
            .map(|&idx| &self.countries[idx])
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

fn duplicate_key(field: &'static str, value: &str) -> IndexError {
    IndexError::Validation {
        entity: "country",
        id: value.to_string(),
        reason: format!("duplicate {field}"),
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use crate::score::{DataQuality, PeerReviewStatus, Trajectory};
    use chrono::NaiveDate;

    pub fn country(id: &str, iso2: &str, iso3: &str, region: Region) -> Country {
        Country {
            id: id.to_string(),
            name: id.to_uppercase(),
            iso_alpha2: iso2.to_string(),
            iso_alpha3: iso3.to_string(),
            region,
            population: 50_000_000,
            gdp_usd: 100_000_000_000.0,
            healthcare_spending_percent_gdp: 4.5,
        }
    }

    pub fn score_record(country_id: &str, year: i32, total: f64) -> ReadinessScoreRecord {
        ReadinessScoreRecord {
            country_id: country_id.to_string(),
            assessment_year: year,
            physical_infrastructure: total,
            human_capital: total,
            regulatory_infrastructure: total,
            economic_market: total,
            total_score: total,
            global_ranking: 1,
            regional_ranking: 1,
            readiness_tier: TierThresholds::default().tier_for(total),
            development_trajectory: Trajectory::Stable,
            data_quality: DataQuality {
                overall_confidence: 0.8,
                primary_source_count: 4,
                expert_validated: true,
                last_verified_at: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            },
            key_strengths: vec![],
            priority_improvement_areas: vec![],
            peer_review_status: PeerReviewStatus::ExpertValidated,
        }
    }
}
