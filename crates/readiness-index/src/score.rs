//! Readiness score records, pillar weighting, and tier configuration
//!
//! Records arrive pre-scored from the upstream assessment process and are
//! immutable once published. A new assessment year supersedes the prior
//! record for display without deleting history; [`latest_scores`] performs
//! that selection.

use crate::{
    IndexError, Result, CONFIDENCE_MAX, CONFIDENCE_MIN, SCORE_MAX, SCORE_MIN, TIER_MAX, TIER_MIN,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Default deployment weights (sum = 1.0)
pub const W_PHYSICAL_INFRASTRUCTURE: f64 = 0.30;
pub const W_HUMAN_CAPITAL: f64 = 0.25;
pub const W_REGULATORY_INFRASTRUCTURE: f64 = 0.25;
pub const W_ECONOMIC_MARKET: f64 = 0.20;

/// Default tier boundaries on the composite score
pub const TIER1_MIN_SCORE: f64 = 70.0;
pub const TIER2_MIN_SCORE: f64 = 40.0;

/// Year-over-year direction of a country's readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trajectory {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerReviewStatus {
    Pending,
    ExpertValidated,
    PeerReviewed,
}

/// Provenance and confidence metadata for one score record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Overall confidence in [0, 1]
    pub overall_confidence: f64,
    pub primary_source_count: u32,
    pub expert_validated: bool,
    pub last_verified_at: NaiveDate,
}

/// One assessment snapshot per country per year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScoreRecord {
    pub country_id: String,
    pub assessment_year: i32,

    // Pillar scores, each in [0, 100]
    pub physical_infrastructure: f64,
    pub human_capital: f64,
    pub regulatory_infrastructure: f64,
    pub economic_market: f64,

    /// Composite in [0, 100], derived upstream from the pillar scores by
    /// the published weighting
    pub total_score: f64,

    /// Rank 1 = highest composite in scope, ties by country id ascending
    pub global_ranking: u32,
    pub regional_ranking: u32,

    /// Tier 1 (highest) through 3, step function of the composite
    pub readiness_tier: u8,
    pub development_trajectory: Trajectory,
    pub data_quality: DataQuality,

    /// Display-only narrative fields
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub priority_improvement_areas: Vec<String>,

    pub peer_review_status: PeerReviewStatus,
}

impl ReadinessScoreRecord {
    /// Pillar scores in canonical order, labeled for display
    pub fn pillar_scores(&self) -> [(&'static str, f64); 4] {
        [
            ("physical_infrastructure", self.physical_infrastructure),
            ("human_capital", self.human_capital),
            ("regulatory_infrastructure", self.regulatory_infrastructure),
            ("economic_market", self.economic_market),
        ]
    }

    /// Enforce the domain invariants on scores, confidence, tier, and
    /// rankings.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in self.pillar_scores() {
            check_score_range(&self.country_id, field, value)?;
        }
        check_score_range(&self.country_id, "total_score", self.total_score)?;

        let confidence = self.data_quality.overall_confidence;
        if !confidence.is_finite() || !(CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&confidence) {
            return Err(IndexError::Range {
                country_id: self.country_id.clone(),
                field: "overall_confidence",
                value: confidence,
                min: CONFIDENCE_MIN,
                max: CONFIDENCE_MAX,
            });
        }

        if !(TIER_MIN..=TIER_MAX).contains(&self.readiness_tier) {
            return Err(IndexError::Validation {
                entity: "score_record",
                id: self.country_id.clone(),
                reason: format!("readiness_tier {} outside 1..=3", self.readiness_tier),
            });
        }

        if self.global_ranking == 0 || self.regional_ranking == 0 {
            return Err(IndexError::Validation {
                entity: "score_record",
                id: self.country_id.clone(),
                reason: "rankings are 1-based".to_string(),
            });
        }

        Ok(())
    }
}

fn check_score_range(country_id: &str, field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(IndexError::Range {
            country_id: country_id.to_string(),
            field,
            value,
            min: SCORE_MIN,
            max: SCORE_MAX,
        });
    }
    Ok(())
}

/// Reduce an append-only record history to the latest record per country.
///
/// Higher assessment year wins; for an equal year the later record in the
/// input wins, with a warning, since published records are expected to be
/// unique per (country, year).
pub fn latest_scores(
    records: impl IntoIterator<Item = ReadinessScoreRecord>,
) -> HashMap<String, ReadinessScoreRecord> {
    let mut latest: HashMap<String, ReadinessScoreRecord> = HashMap::new();

    for record in records {
        let supersedes = match latest.get(&record.country_id) {
            None => true,
            Some(existing) if record.assessment_year > existing.assessment_year => true,
            Some(existing) if record.assessment_year == existing.assessment_year => {
                warn!(
                    country_id = %record.country_id,
                    year = record.assessment_year,
                    "duplicate assessment year, keeping later record"
                );
                true
            }
            Some(_) => false,
        };
        if supersedes {
            latest.insert(record.country_id.clone(), record);
        }
    }

    latest
}

/// Pillar weight vector for the composite score.
///
/// The weighting formula is externally supplied configuration. The same
/// instance must be applied to every country in a run; cross-country
/// ranking is meaningless otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarWeights {
    pub physical_infrastructure: f64,
    pub human_capital: f64,
    pub regulatory_infrastructure: f64,
    pub economic_market: f64,
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self {
            physical_infrastructure: W_PHYSICAL_INFRASTRUCTURE,
            human_capital: W_HUMAN_CAPITAL,
            regulatory_infrastructure: W_REGULATORY_INFRASTRUCTURE,
            economic_market: W_ECONOMIC_MARKET,
        }
    }
}

impl PillarWeights {
    pub fn sum(&self) -> f64 {
        self.physical_infrastructure
            + self.human_capital
            + self.regulatory_infrastructure
            + self.economic_market
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() < 1e-6
    }

    /// Rescale weights so they sum to 1.0
    pub fn normalize(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            self.physical_infrastructure /= sum;
            self.human_capital /= sum;
            self.regulatory_infrastructure /= sum;
            self.economic_market /= sum;
        }
    }

    /// Composite score from the four pillar scores
    pub fn composite(
        &self,
        physical_infrastructure: f64,
        human_capital: f64,
        regulatory_infrastructure: f64,
        economic_market: f64,
    ) -> f64 {
        self.physical_infrastructure * physical_infrastructure
            + self.human_capital * human_capital
            + self.regulatory_infrastructure * regulatory_infrastructure
            + self.economic_market * economic_market
    }
}

/// Tier boundaries on the composite score.
///
/// Tiers are configuration, not per-country data: tier 1 at
/// `tier1_min` and above, tier 2 at `tier2_min` and above, tier 3 below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub tier1_min: f64,
    pub tier2_min: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            tier1_min: TIER1_MIN_SCORE,
            tier2_min: TIER2_MIN_SCORE,
        }
    }
}

impl TierThresholds {
    pub fn new(tier1_min: f64, tier2_min: f64) -> Result<Self> {
        if !(tier1_min.is_finite() && tier2_min.is_finite() && tier1_min > tier2_min) {
            return Err(IndexError::Validation {
                entity: "tier_thresholds",
                id: format!("{tier1_min}/{tier2_min}"),
                reason: "tier1_min must be greater than tier2_min".to_string(),
            });
        }
        Ok(Self { tier1_min, tier2_min })
    }

    /// Monotone non-increasing step function of the composite score
    pub fn tier_for(&self, total_score: f64) -> u8 {
        if total_score >= self.tier1_min {
            1
        } else if total_score >= self.tier2_min {
            2
        } else {
            3
        }
    }
}
