//! Aggregation of countries with their latest score records
//!
//! Pure, synchronous, deterministic: the same inputs always produce the
//! same output, so results can be cached and unit tested without any
//! network dependency. Derived presentation attributes are total lookup
//! functions over the finite enumerations with explicit default arms.

use crate::score::{ReadinessScoreRecord, Trajectory};
use crate::{Country, CountryRegistry, IndexError, Region, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Confidence band for display, derived from `overall_confidence`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Band for a confidence value. Total: non-finite or out-of-range
    /// input falls into the lowest band rather than failing.
    pub fn from_confidence(confidence: f64) -> Self {
        if !confidence.is_finite() {
            return ConfidenceBand::Low;
        }
        if confidence >= 0.75 {
            ConfidenceBand::High
        } else if confidence >= 0.5 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "High confidence",
            ConfidenceBand::Medium => "Medium confidence",
            ConfidenceBand::Low => "Low confidence",
        }
    }
}

/// Display styling for a readiness tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStyle {
    pub label: &'static str,
    pub color: &'static str,
}

/// Tier presentation lookup. Total over `u8` with an explicit default for
/// values outside the modeled 1..=3 range.
pub fn tier_style(tier: u8) -> TierStyle {
    match tier {
        1 => TierStyle { label: "Advanced readiness", color: "#1b7f4d" },
        2 => TierStyle { label: "Emerging readiness", color: "#c8860a" },
        3 => TierStyle { label: "Nascent readiness", color: "#b3422e" },
        _ => TierStyle { label: "Unranked", color: "#6b7280" },
    }
}

/// Icon name for a trajectory. Total over the enumeration.
pub fn trajectory_icon(trajectory: Trajectory) -> &'static str {
    match trajectory {
        Trajectory::Improving => "trending-up",
        Trajectory::Stable => "minus",
        Trajectory::Declining => "trending-down",
    }
}

/// Derived presentation attributes for one scored country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub tier_label: &'static str,
    pub tier_color: &'static str,
    pub trajectory_icon: &'static str,
    pub confidence_band: ConfidenceBand,
}

impl Presentation {
    pub fn derive(record: &ReadinessScoreRecord) -> Self {
        let style = tier_style(record.readiness_tier);
        Self {
            tier_label: style.label,
            tier_color: style.color,
            trajectory_icon: trajectory_icon(record.development_trajectory),
            confidence_band: ConfidenceBand::from_confidence(record.data_quality.overall_confidence),
        }
    }
}

/// Display-ready join of one country with its latest score record.
///
/// Absence of a score is a valid state (country assessed-pending) and is
/// surfaced as `None`, never as a zero score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryWithScore {
    pub country: Country,
    pub score: Option<ReadinessScoreRecord>,
    pub presentation: Option<Presentation>,
}

impl CountryWithScore {
    pub fn from_parts(country: Country, score: Option<ReadinessScoreRecord>) -> Self {
        let presentation = score.as_ref().map(Presentation::derive);
        Self { country, score, presentation }
    }

    pub fn total_score(&self) -> Option<f64> {
        self.score.as_ref().map(|s| s.total_score)
    }
}

/// Join countries with their latest score records.
///
/// Every input country appears exactly once in the output, in input
/// order; countries without a published record get `score: None`. Fails
/// on orphan records (a score whose country id matches no input country)
/// and on out-of-range scores.
pub fn aggregate(
    countries: &[Country],
    scores_by_country: &HashMap<String, ReadinessScoreRecord>,
) -> Result<Vec<CountryWithScore>> {
    let known_ids: HashSet<&str> = countries.iter().map(|c| c.id.as_str()).collect();

    // Deterministic orphan detection regardless of map iteration order
    let mut score_ids: Vec<&String> = scores_by_country.keys().collect();
    score_ids.sort();
    for id in score_ids {
        if !known_ids.contains(id.as_str()) {
            return Err(IndexError::Validation {
                entity: "score_record",
                id: id.clone(),
                reason: "references unknown country".to_string(),
            });
        }
        let record = &scores_by_country[id];
        if record.country_id != *id {
            return Err(IndexError::Validation {
                entity: "score_record",
                id: id.clone(),
                reason: format!("keyed under '{id}' but references '{}'", record.country_id),
            });
        }
    }

    let mut aggregated = Vec::with_capacity(countries.len());
    for country in countries {
        let score = scores_by_country.get(&country.id).cloned();
        if let Some(record) = &score {
            record.validate()?;
            debug!(
                country_id = %country.id,
                total = record.total_score,
                tier = record.readiness_tier,
                "aggregated scored country"
            );
        }
        aggregated.push(CountryWithScore::from_parts(country.clone(), score));
    }

    Ok(aggregated)
}

/// Ordering rule shared by the ranking view and ranking assignment:
/// composite descending, ties by country id ascending.
fn rank_cmp(a: &ReadinessScoreRecord, b: &ReadinessScoreRecord) -> Ordering {
    b.total_score
        .partial_cmp(&a.total_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.country_id.cmp(&b.country_id))
}

/// Ranking view over an aggregated sequence.
///
/// A separate pure function, not a mutation: scored countries sorted by
/// composite descending with ties broken by country id ascending,
/// followed by unscored countries in country id order.
pub fn ranking_view(aggregated: &[CountryWithScore]) -> Vec<CountryWithScore> {
    let mut ranked = aggregated.to_vec();
    ranked.sort_by(|a, b| match (&a.score, &b.score) {
        (Some(sa), Some(sb)) => rank_cmp(sa, sb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.country.id.cmp(&b.country.id),
    });
    ranked
}

/// Recompute global and regional rankings over a set of score records.
///
/// Used when regenerating the published dataset. Every record must
/// reference a registered country; regional scope comes from the
/// registry.
pub fn assign_rankings(
    registry: &CountryRegistry,
    records: &mut [ReadinessScoreRecord],
) -> Result<()> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| rank_cmp(&records[a], &records[b]));
    for (rank, &idx) in order.iter().enumerate() {
        records[idx].global_ranking = rank as u32 + 1;
    }

    let mut by_region: HashMap<Region, Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        let country = registry
            .get(&record.country_id)
            .ok_or_else(|| IndexError::NotFound(record.country_id.clone()))?;
        by_region.entry(country.region).or_default().push(idx);
    }

    for indices in by_region.values_mut() {
        indices.sort_by(|&a, &b| rank_cmp(&records[a], &records[b]));
        for (rank, &idx) in indices.iter().enumerate() {
            records[idx].regional_ranking = rank as u32 + 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{country, score_record};
    use crate::Region;

    fn scores_map(records: Vec<ReadinessScoreRecord>) -> HashMap<String, ReadinessScoreRecord> {
        records
            .into_iter()
            .map(|r| (r.country_id.clone(), r))
            .collect()
    }

    #[test]
    fn test_aggregate_preserves_every_country() {
        let countries = vec![
            country("kenya", "KE", "KEN", Region::EasternAfrica),
            country("benin", "BJ", "BEN", Region::WesternAfrica),
        ];
        let scores = scores_map(vec![score_record("kenya", 2025, 80.0)]);

        let aggregated = aggregate(&countries, &scores).unwrap();
        assert_eq!(aggregated.len(), countries.len());

        // Input order preserved, score populated only where a record exists
        assert_eq!(aggregated[0].country.id, "kenya");
        assert_eq!(aggregated[0].total_score(), Some(80.0));
        assert_eq!(aggregated[0].score.as_ref().unwrap().readiness_tier, 1);
        assert_eq!(aggregated[1].country.id, "benin");
        assert!(aggregated[1].score.is_none(), "missing score must stay absent, not zero");
        assert!(aggregated[1].presentation.is_none());
    }

    #[test]
    fn test_aggregate_rejects_orphan_record() {
        let countries = vec![country("kenya", "KE", "KEN", Region::EasternAfrica)];
        let scores = scores_map(vec![score_record("wakanda", 2025, 90.0)]);

        let result = aggregate(&countries, &scores);
        assert!(matches!(result, Err(IndexError::Validation { .. })));
    }

    #[test]
    fn test_aggregate_rejects_out_of_range_score() {
        let countries = vec![country("kenya", "KE", "KEN", Region::EasternAfrica)];
        let mut record = score_record("kenya", 2025, 80.0);
        record.economic_market = 130.0;
        let scores = scores_map(vec![record]);

        assert!(matches!(aggregate(&countries, &scores), Err(IndexError::Range { .. })));
    }

    #[test]
    fn test_aggregate_rejects_mismatched_key() {
        let countries = vec![
            country("kenya", "KE", "KEN", Region::EasternAfrica),
            country("ghana", "GH", "GHA", Region::WesternAfrica),
        ];
        let mut scores = HashMap::new();
        scores.insert("ghana".to_string(), score_record("kenya", 2025, 80.0));

        assert!(matches!(aggregate(&countries, &scores), Err(IndexError::Validation { .. })));
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let countries = vec![
            country("kenya", "KE", "KEN", Region::EasternAfrica),
            country("ghana", "GH", "GHA", Region::WesternAfrica),
        ];
        let scores = scores_map(vec![
            score_record("kenya", 2025, 80.0),
            score_record("ghana", 2025, 55.0),
        ]);

        let first = aggregate(&countries, &scores).unwrap();
        let second = aggregate(&countries, &scores).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ranking_view_orders_by_score_then_id() {
        let countries = vec![
            country("angola", "AO", "AGO", Region::CentralAfrica),
            country("benin", "BJ", "BEN", Region::WesternAfrica),
            country("chad", "TD", "TCD", Region::CentralAfrica),
            country("kenya", "KE", "KEN", Region::EasternAfrica),
        ];
        let scores = scores_map(vec![
            score_record("angola", 2025, 55.0),
            score_record("chad", 2025, 55.0),
            score_record("kenya", 2025, 80.0),
        ]);

        let aggregated = aggregate(&countries, &scores).unwrap();
        let ranked = ranking_view(&aggregated);

        let ids: Vec<&str> = ranked.iter().map(|c| c.country.id.as_str()).collect();
        // kenya highest, then the 55.0 tie broken by id, unscored benin last
        assert_eq!(ids, vec!["kenya", "angola", "chad", "benin"]);

        // Pure view: the input ordering is untouched
        assert_eq!(aggregated[0].country.id, "angola");

        // Deterministic across repeated calls
        assert_eq!(ranking_view(&aggregated), ranked);
    }

    #[test]
    fn test_assign_rankings_global_and_regional() {
        let registry = CountryRegistry::new(vec![
            country("angola", "AO", "AGO", Region::CentralAfrica),
            country("chad", "TD", "TCD", Region::CentralAfrica),
            country("kenya", "KE", "KEN", Region::EasternAfrica),
        ])
        .unwrap();

        let mut records = vec![
            score_record("angola", 2025, 55.0),
            score_record("chad", 2025, 70.0),
            score_record("kenya", 2025, 80.0),
        ];
        assign_rankings(&registry, &mut records).unwrap();

        let by_id: HashMap<&str, &ReadinessScoreRecord> =
            records.iter().map(|r| (r.country_id.as_str(), r)).collect();
        assert_eq!(by_id["kenya"].global_ranking, 1);
        assert_eq!(by_id["chad"].global_ranking, 2);
        assert_eq!(by_id["angola"].global_ranking, 3);

        // Regional scope: chad and angola compete, kenya ranks alone
        assert_eq!(by_id["chad"].regional_ranking, 1);
        assert_eq!(by_id["angola"].regional_ranking, 2);
        assert_eq!(by_id["kenya"].regional_ranking, 1);
    }

    #[test]
    fn test_assign_rankings_rejects_unknown_country() {
        let registry =
            CountryRegistry::new(vec![country("kenya", "KE", "KEN", Region::EasternAfrica)])
                .unwrap();
        let mut records = vec![score_record("wakanda", 2025, 90.0)];

        assert!(matches!(
            assign_rankings(&registry, &mut records),
            Err(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn test_confidence_band_thresholds() {
        assert_eq!(ConfidenceBand::from_confidence(0.9), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_confidence(0.75), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_confidence(0.6), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_confidence(0.5), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_confidence(0.2), ConfidenceBand::Low);
        // Total over bad input
        assert_eq!(ConfidenceBand::from_confidence(f64::NAN), ConfidenceBand::Low);
    }

    #[test]
    fn test_tier_style_has_default_arm() {
        assert_eq!(tier_style(1).label, "Advanced readiness");
        assert_eq!(tier_style(3).label, "Nascent readiness");
        assert_eq!(tier_style(0).label, "Unranked");
        assert_eq!(tier_style(9).label, "Unranked");
    }

    #[test]
    fn test_trajectory_icons() {
        assert_eq!(trajectory_icon(Trajectory::Improving), "trending-up");
        assert_eq!(trajectory_icon(Trajectory::Stable), "minus");
        assert_eq!(trajectory_icon(Trajectory::Declining), "trending-down");
    }

    #[test]
    fn test_presentation_derivation_is_stable() {
        let record = score_record("kenya", 2025, 80.0);
        assert_eq!(Presentation::derive(&record), Presentation::derive(&record));
        assert_eq!(Presentation::derive(&record).tier_label, "Advanced readiness");
        assert_eq!(Presentation::derive(&record).confidence_band, ConfidenceBand::High);
    }
}
