//! Dataset loading from JSON files
//!
//! Per-record validation with recovery by exclusion: a malformed record
//! is skipped with a warning and the rest of the batch survives. Only a
//! dataset with no usable countries at all is an error.

use crate::score::{latest_scores, DataQuality, PeerReviewStatus, ReadinessScoreRecord, Trajectory};
use crate::{Country, CountryRegistry, IndexError, Region, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Sanitize an id to a stable lowercase slug (alphanumeric, dash,
/// underscore only)
fn sanitize_id(id: String) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .flat_map(|c| c.to_lowercase())
        .take(64)
        .collect()
}

/// Sanitize a display name (allow more chars but still limit)
fn sanitize_name(name: String) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || " -_.,()&'".contains(*c))
        .take(128)
        .collect()
}

/// Raw country from JSON
#[derive(Debug, Deserialize)]
struct RawCountry {
    id: Option<String>,
    name: Option<String>,
    iso_alpha2: Option<String>,
    iso_alpha3: Option<String>,
    region: Option<Region>,
    population: Option<u64>,
    gdp_usd: Option<f64>,
    healthcare_spending_percent_gdp: Option<f64>,
}

/// Raw score record from JSON
#[derive(Debug, Deserialize)]
struct RawScoreRecord {
    country_id: Option<String>,
    assessment_year: Option<i32>,
    physical_infrastructure: Option<f64>,
    human_capital: Option<f64>,
    regulatory_infrastructure: Option<f64>,
    economic_market: Option<f64>,
    total_score: Option<f64>,
    global_ranking: Option<u32>,
    regional_ranking: Option<u32>,
    readiness_tier: Option<u8>,
    development_trajectory: Option<Trajectory>,
    data_quality: Option<DataQuality>,
    key_strengths: Option<Vec<String>>,
    priority_improvement_areas: Option<Vec<String>>,
    peer_review_status: Option<PeerReviewStatus>,
}

impl RawCountry {
    fn into_country(self) -> Option<Country> {
        let id = sanitize_id(self.id?);
        if id.is_empty() {
            return None;
        }

        let iso_alpha2 = self.iso_alpha2?.to_uppercase();
        let iso_alpha3 = self.iso_alpha3?.to_uppercase();
        if iso_alpha2.len() != 2 || iso_alpha3.len() != 3 {
            return None;
        }

        let gdp_usd = self.gdp_usd?;
        let spending = self.healthcare_spending_percent_gdp?;
        if !gdp_usd.is_finite() || gdp_usd < 0.0 || !spending.is_finite() || spending < 0.0 {
            return None;
        }

        Some(Country {
            name: sanitize_name(self.name.unwrap_or_else(|| id.clone())),
            id,
            iso_alpha2,
            iso_alpha3,
            region: self.region?,
            population: self.population?,
            gdp_usd,
            healthcare_spending_percent_gdp: spending,
        })
    }
}

impl RawScoreRecord {
    fn into_record(self) -> Option<ReadinessScoreRecord> {
        let record = ReadinessScoreRecord {
            country_id: sanitize_id(self.country_id?),
            assessment_year: self.assessment_year?,
            physical_infrastructure: self.physical_infrastructure?,
            human_capital: self.human_capital?,
            regulatory_infrastructure: self.regulatory_infrastructure?,
            economic_market: self.economic_market?,
            total_score: self.total_score?,
            global_ranking: self.global_ranking?,
            regional_ranking: self.regional_ranking?,
            readiness_tier: self.readiness_tier?,
            development_trajectory: self.development_trajectory?,
            data_quality: self.data_quality?,
            key_strengths: self.key_strengths.unwrap_or_default(),
            priority_improvement_areas: self.priority_improvement_areas.unwrap_or_default(),
            peer_review_status: self.peer_review_status.unwrap_or(PeerReviewStatus::Pending),
        };
        record.validate().ok()?;
        Some(record)
    }
}

/// Load the country reference set from a JSON file
pub fn load_countries(path: impl AsRef<Path>) -> Result<Vec<Country>> {
    let path = path.as_ref();
    info!("Loading countries from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: Vec<RawCountry> = serde_json::from_reader(reader)?;

    let mut countries = Vec::new();
    let mut skipped = 0;

    for (i, entry) in raw.into_iter().enumerate() {
        match entry.into_country() {
            Some(country) => countries.push(country),
            None => {
                warn!("Skipping country record {i}: missing or invalid required field");
                skipped += 1;
            }
        }
    }

    info!("Loaded {} countries ({} skipped)", countries.len(), skipped);
    Ok(countries)
}

/// Load the full score record history from a JSON file.
///
/// Accepts either a bare array or an object with a `records` field.
pub fn load_score_records(path: impl AsRef<Path>) -> Result<Vec<ReadinessScoreRecord>> {
    let path = path.as_ref();
    info!("Loading score records from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: serde_json::Value = serde_json::from_reader(reader)?;

    let entries: Vec<serde_json::Value> = if let Some(records) = raw.get("records") {
        serde_json::from_value(records.clone())?
    } else if raw.is_array() {
        serde_json::from_value(raw)?
    } else {
        return Err(IndexError::Validation {
            entity: "score_file",
            id: path.display().to_string(),
            reason: "expected an array or an object with a 'records' field".to_string(),
        });
    };

    let mut records = Vec::new();
    let mut skipped = 0;

    for (i, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawScoreRecord>(entry)
            .ok()
            .and_then(RawScoreRecord::into_record);
        match parsed {
            Some(record) => records.push(record),
            None => {
                warn!("Skipping score record {i}: malformed or out of range");
                skipped += 1;
            }
        }
    }

    info!("Loaded {} score records ({} skipped)", records.len(), skipped);
    Ok(records)
}

/// Load a complete dataset: country registry plus the latest score per
/// country, ready for [`crate::aggregate`].
pub fn load_dataset(
    countries_path: impl AsRef<Path>,
    scores_path: impl AsRef<Path>,
) -> Result<(CountryRegistry, HashMap<String, ReadinessScoreRecord>)> {
    let countries = load_countries(countries_path)?;
    if countries.is_empty() {
        return Err(IndexError::NoCountries);
    }
    let registry = CountryRegistry::new(countries)?;

    let records = load_score_records(scores_path)?;
    let latest = latest_scores(records);

    info!(
        "Dataset ready: {} countries, {} with published scores",
        registry.len(),
        latest.len()
    );

    Ok((registry, latest))
}
