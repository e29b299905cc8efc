//! Dashboard Data Loading
//!
//! Asynchronous boundary between the country-data service and the
//! dashboard UI. A [`controller::LoadController`] wraps each requested
//! collection in an explicit request lifecycle:
//!
//! ```text
//! Idle → Loading → { Ready | Empty | Failed }
//! ```
//!
//! `Ready`, `Empty`, and `Failed` re-enter `Loading` only through an
//! explicit reload. Overlapping requests resolve last-request-wins by
//! sequence number comparison, never by wall-clock arrival order, so a
//! stale response can never overwrite a newer one. Consumers observe
//! exactly one state snapshot at a time through a watch channel.

use readiness_index::IndexError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub mod controller;
pub mod service;

pub use controller::{ControllerConfig, LoadController, LoadState};
pub use service::{CountryDataService, FetchScope, FixedDataService, HttpDataService};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Aggregation(#[from] IndexError),
    #[error("country not in current view: {0}")]
    NotFound(String),
    #[error("response batch contained no valid records")]
    NoValidRecords,
}

impl LoadError {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Transport(_) => "transport",
            LoadError::Timeout(_) => "timeout",
            LoadError::Aggregation(IndexError::Range { .. }) => "range",
            LoadError::Aggregation(_) => "validation",
            LoadError::NotFound(_) => "not_found",
            LoadError::NoValidRecords => "no_valid_records",
        }
    }

    /// Failures meaning the backend itself was unreachable. Only these
    /// make the controller consult its fallback dataset; a reachable
    /// service returning bad data is not an availability problem.
    pub fn is_unavailability(&self) -> bool {
        matches!(self, LoadError::Transport(_) | LoadError::Timeout(_))
    }
}

/// Serializable error surface for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
}

impl From<&LoadError> for ErrorInfo {
    fn from(err: &LoadError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(LoadError::Transport("boom".into()).kind(), "transport");
        assert_eq!(LoadError::Timeout(Duration::from_secs(5)).kind(), "timeout");
        assert_eq!(LoadError::NotFound("mali".into()).kind(), "not_found");
        assert_eq!(LoadError::NoValidRecords.kind(), "no_valid_records");
    }

    #[test]
    fn test_only_unavailability_is_fallback_eligible() {
        assert!(LoadError::Transport("boom".into()).is_unavailability());
        assert!(LoadError::Timeout(Duration::from_secs(5)).is_unavailability());
        assert!(!LoadError::NoValidRecords.is_unavailability());
        assert!(!LoadError::NotFound("mali".into()).is_unavailability());
    }

    #[test]
    fn test_error_info_carries_kind_and_message() {
        let info = ErrorInfo::from(&LoadError::Transport("connection refused".into()));
        assert_eq!(info.kind, "transport");
        assert!(info.message.contains("connection refused"));
    }
}
