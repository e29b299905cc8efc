//! Country-data service implementations
//!
//! The controller talks to any [`CountryDataService`]. Production uses
//! [`HttpDataService`] against the gateway; [`FixedDataService`] holds an
//! in-memory dataset and serves as the configured offline fallback and as
//! the test double. Static data is always passed in through the
//! constructor, never read from ambient shared state.

use crate::LoadError;
use async_trait::async_trait;
use readiness_index::CountryRecord;
use serde::{Deserialize, Serialize};

/// Which collection to request from the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchScope {
    /// Curated subset for the carousel
    Featured,
    /// Full country list
    All,
}

impl FetchScope {
    pub fn request_path(&self) -> &'static str {
        match self {
            FetchScope::Featured => "/api/v1/countries/featured",
            FetchScope::All => "/api/v1/countries",
        }
    }
}

/// Asynchronous source of raw country record batches.
///
/// Returns loosely typed JSON values so a single malformed record can be
/// rejected individually by the controller instead of failing the batch.
#[async_trait]
pub trait CountryDataService: Send + Sync {
    async fn fetch(&self, scope: FetchScope) -> Result<Vec<serde_json::Value>, LoadError>;
}

/// HTTP client against the atlas gateway
pub struct HttpDataService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDataService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl CountryDataService for HttpDataService {
    async fn fetch(&self, scope: FetchScope) -> Result<Vec<serde_json::Value>, LoadError> {
        let url = format!("{}{}", self.base_url, scope.request_path());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LoadError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| LoadError::Transport(e.to_string()))?;

        response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| LoadError::Transport(format!("decoding response body: {e}")))
    }
}

/// In-memory dataset service.
///
/// Used as the bundled fallback when the gateway is unreachable, and as
/// the data source in tests. Without a configured featured subset, the
/// featured scope serves the full set.
pub struct FixedDataService {
    records: Vec<CountryRecord>,
    featured_ids: Option<Vec<String>>,
}

impl FixedDataService {
    pub fn new(records: Vec<CountryRecord>) -> Self {
        Self {
            records,
            featured_ids: None,
        }
    }

    pub fn with_featured(mut self, featured_ids: Vec<String>) -> Self {
        self.featured_ids = Some(featured_ids);
        self
    }
}

#[async_trait]
impl CountryDataService for FixedDataService {
    async fn fetch(&self, scope: FetchScope) -> Result<Vec<serde_json::Value>, LoadError> {
        let selected: Vec<&CountryRecord> = match (scope, &self.featured_ids) {
            (FetchScope::Featured, Some(ids)) => self
                .records
                .iter()
                .filter(|r| ids.iter().any(|id| *id == r.country.id))
                .collect(),
            _ => self.records.iter().collect(),
        };

        selected
            .into_iter()
            .map(|record| {
                serde_json::to_value(record).map_err(|e| LoadError::Transport(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readiness_index::{Country, Region};

    fn record(id: &str, iso2: &str, iso3: &str) -> CountryRecord {
        CountryRecord {
            country: Country {
                id: id.to_string(),
                name: id.to_uppercase(),
                iso_alpha2: iso2.to_string(),
                iso_alpha3: iso3.to_string(),
                region: Region::WesternAfrica,
                population: 1_000_000,
                gdp_usd: 1_000_000_000.0,
                healthcare_spending_percent_gdp: 3.0,
            },
            score: None,
        }
    }

    #[tokio::test]
    async fn test_fixed_service_serves_all() {
        let service = FixedDataService::new(vec![
            record("ghana", "GH", "GHA"),
            record("senegal", "SN", "SEN"),
        ]);

        let batch = service.fetch(FetchScope::All).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_fixed_service_filters_featured() {
        let service = FixedDataService::new(vec![
            record("ghana", "GH", "GHA"),
            record("senegal", "SN", "SEN"),
        ])
        .with_featured(vec!["senegal".to_string()]);

        let batch = service.fetch(FetchScope::Featured).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0]["id"], "senegal");

        // Full scope is unaffected by the featured subset
        let all = service.fetch(FetchScope::All).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_scope_request_paths() {
        assert_eq!(FetchScope::All.request_path(), "/api/v1/countries");
        assert_eq!(FetchScope::Featured.request_path(), "/api/v1/countries/featured");
    }
}
