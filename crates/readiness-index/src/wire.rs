//! Wire shape exchanged with the country-data service
//!
//! One flat record per country: identity and reference fields inline,
//! the latest score record nested under `score` (null for countries that
//! are assessed-pending). Served by the gateway and consumed by the
//! dashboard loader; both sides share this type so the contract cannot
//! drift.

use crate::aggregate::CountryWithScore;
use crate::score::ReadinessScoreRecord;
use crate::{Country, IndexError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    #[serde(flatten)]
    pub country: Country,
    #[serde(default)]
    pub score: Option<ReadinessScoreRecord>,
}

impl CountryRecord {
    pub fn from_aggregated(entry: &CountryWithScore) -> Self {
        Self {
            country: entry.country.clone(),
            score: entry.score.clone(),
        }
    }

    /// Split into model parts, enforcing the record-level invariants.
    ///
    /// Callers performing per-record batch validation treat an `Err` here
    /// as "reject this record", not "fail the batch".
    pub fn into_parts(self) -> Result<(Country, Option<ReadinessScoreRecord>)> {
        if self.country.id.is_empty() {
            return Err(IndexError::Validation {
                entity: "country",
                id: self.country.iso_alpha3.clone(),
                reason: "empty id".to_string(),
            });
        }

        for (field, value) in [
            ("gdp_usd", self.country.gdp_usd),
            (
                "healthcare_spending_percent_gdp",
                self.country.healthcare_spending_percent_gdp,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(IndexError::Validation {
                    entity: "country",
                    id: self.country.id.clone(),
                    reason: format!("{field} must be a non-negative number, got {value}"),
                });
            }
        }

        if let Some(record) = &self.score {
            if record.country_id != self.country.id {
                return Err(IndexError::Validation {
                    entity: "score_record",
                    id: self.country.id.clone(),
                    reason: format!("score references '{}'", record.country_id),
                });
            }
            record.validate()?;
        }

        Ok((self.country, self.score))
    }
}
