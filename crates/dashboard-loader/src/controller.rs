//! Four-state load controller with last-request-wins semantics
//!
//! One controller instance per page view. The controller is the only
//! writer of its state; every transition is a whole-value swap published
//! through a `tokio::sync::watch` channel, so consumers always observe a
//! single consistent snapshot and re-render per transition.
//!
//! Overlap rule: each request takes a monotonically increasing sequence
//! number at issue time. A result, success or failure, commits only while
//! its sequence number is still the latest issued. Cancellation of a
//! superseded request is best-effort; correctness comes from the sequence
//! comparison at resolution time, not from the cancellation.

use crate::service::{CountryDataService, FetchScope};
use crate::{ErrorInfo, LoadError};
use readiness_index::{aggregate, CountryRecord, CountryWithScore, ReadinessScoreRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot exposed to consumers. Exactly one of the data-bearing and
/// error-bearing variants holds a payload, matching the state tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// No request issued yet
    Idle,
    /// Request in flight; render an indeterminate-progress affordance,
    /// never stale data
    Loading,
    /// Non-empty aggregated data held until the next reload
    Ready {
        data: Vec<CountryWithScore>,
        /// True when the bundled fallback dataset answered because the
        /// backend was unreachable
        from_fallback: bool,
    },
    /// The service answered correctly with zero entries. Not an error:
    /// render "no data yet", offer no retry
    Empty,
    /// Transport, timeout, or aggregation failure. Previously held data
    /// is discarded, never shown as current
    Failed { error: ErrorInfo },
}

impl LoadState {
    pub fn name(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Ready { .. } => "ready",
            LoadState::Empty => "empty",
            LoadState::Failed { .. } => "failed",
        }
    }
}

/// Controller tuning; the fallback service is optional
#[derive(Clone)]
pub struct ControllerConfig {
    pub timeout: Duration,
    pub fallback: Option<Arc<dyn CountryDataService>>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            fallback: None,
        }
    }
}

struct Batch {
    data: Vec<CountryWithScore>,
    from_fallback: bool,
}

pub struct LoadController {
    service: Arc<dyn CountryDataService>,
    config: ControllerConfig,
    /// Latest issued request sequence number; guards every commit
    latest_seq: Mutex<u64>,
    tx: watch::Sender<LoadState>,
}

impl LoadController {
    pub fn new(service: Arc<dyn CountryDataService>) -> Self {
        Self::with_config(service, ControllerConfig::default())
    }

    pub fn with_config(service: Arc<dyn CountryDataService>, config: ControllerConfig) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Idle);
        Self {
            service,
            config,
            latest_seq: Mutex::new(0),
            tx,
        }
    }

    /// Watch the snapshot stream. Receivers see whole-state swaps only.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> LoadState {
        self.tx.borrow().clone()
    }

    /// Data held by the current `Ready` snapshot, without re-fetching
    pub fn current_data(&self) -> Option<Vec<CountryWithScore>> {
        match &*self.tx.borrow() {
            LoadState::Ready { data, .. } => Some(data.clone()),
            _ => None,
        }
    }

    /// Issue a load request and drive it to completion.
    ///
    /// A request issued while another is in flight supersedes it; the
    /// superseded result is discarded at resolution time regardless of
    /// which response arrives first. Reload and retry are the same
    /// explicit action: calling this again.
    pub async fn load(&self, scope: FetchScope) -> LoadState {
        let seq = self.begin(scope);

        let mut outcome = self.fetch_and_aggregate(self.service.as_ref(), scope).await;

        let unavailable = match &outcome {
            Err(err) if err.is_unavailability() => Some((err.kind(), err.to_string())),
            _ => None,
        };
        if let (Some((kind, message)), Some(fallback)) = (unavailable, self.config.fallback.clone())
        {
            if !self.is_current(seq) {
                debug!(seq, "superseded before fallback, discarding");
                return self.state();
            }
            warn!(kind, %message, "backend unavailable, trying fallback dataset");
            match self.fetch_and_aggregate(fallback.as_ref(), scope).await {
                Ok(batch) => {
                    outcome = Ok(Batch {
                        from_fallback: true,
                        ..batch
                    })
                }
                // Surface the original failure, not the fallback's
                Err(fallback_err) => {
                    debug!(error = %fallback_err, "fallback dataset failed too")
                }
            }
        }

        let next = match outcome {
            Ok(batch) if batch.data.is_empty() => LoadState::Empty,
            Ok(batch) => LoadState::Ready {
                data: batch.data,
                from_fallback: batch.from_fallback,
            },
            Err(err) => LoadState::Failed {
                error: ErrorInfo::from(&err),
            },
        };

        self.commit(seq, next)
    }

    /// Validate a user selection against the current `Ready` data and
    /// invoke the consumer callback at most once. A dangling id, or a
    /// selection while not `Ready`, is `NotFound` and the callback is
    /// never invoked.
    pub fn select_with<F>(&self, country_id: &str, callback: F) -> Result<(), LoadError>
    where
        F: FnOnce(&CountryWithScore),
    {
        let selected = match &*self.tx.borrow() {
            LoadState::Ready { data, .. } => data
                .iter()
                .find(|entry| entry.country.id == country_id)
                .cloned(),
            _ => None,
        };

        match selected {
            Some(entry) => {
                callback(&entry);
                Ok(())
            }
            None => Err(LoadError::NotFound(country_id.to_string())),
        }
    }

    fn begin(&self, scope: FetchScope) -> u64 {
        let mut latest = self.latest_seq.lock().expect("sequence lock poisoned");
        *latest += 1;
        info!(seq = *latest, ?scope, "load request issued");
        self.tx.send_replace(LoadState::Loading);
        *latest
    }

    fn is_current(&self, seq: u64) -> bool {
        *self.latest_seq.lock().expect("sequence lock poisoned") == seq
    }

    /// Atomic guarded swap: the sequence check and the state publish
    /// happen under the same lock, so a stale result can never land
    /// between a newer request's check and its publish.
    fn commit(&self, seq: u64, next: LoadState) -> LoadState {
        let latest = self.latest_seq.lock().expect("sequence lock poisoned");
        if *latest != seq {
            debug!(seq, latest = *latest, "discarding superseded result");
            return self.tx.borrow().clone();
        }
        debug!(seq, state = next.name(), "committing state");
        self.tx.send_replace(next.clone());
        next
    }

    async fn fetch_and_aggregate(
        &self,
        service: &dyn CountryDataService,
        scope: FetchScope,
    ) -> Result<Batch, LoadError> {
        let raw = match tokio::time::timeout(self.config.timeout, service.fetch(scope)).await {
            Ok(result) => result?,
            Err(_) => return Err(LoadError::Timeout(self.config.timeout)),
        };

        let data = aggregate_batch(raw)?;
        Ok(Batch {
            data,
            from_fallback: false,
        })
    }
}

/// Decode and validate a raw batch record-by-record, then aggregate.
///
/// Malformed records are rejected individually; the valid subset still
/// loads. A non-empty batch with nothing valid is a failure, an empty
/// batch is simply empty.
fn aggregate_batch(raw: Vec<serde_json::Value>) -> Result<Vec<CountryWithScore>, LoadError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let total = raw.len();
    let mut countries = Vec::new();
    let mut scores: HashMap<String, ReadinessScoreRecord> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut rejected = 0;

    for (index, value) in raw.into_iter().enumerate() {
        let record = match serde_json::from_value::<CountryRecord>(value) {
            Ok(record) => record,
            Err(err) => {
                warn!(index, error = %err, "rejecting malformed record");
                rejected += 1;
                continue;
            }
        };

        match record.into_parts() {
            Ok((country, score)) => {
                if !seen.insert(country.id.clone()) {
                    warn!(country_id = %country.id, "rejecting duplicate record");
                    rejected += 1;
                    continue;
                }
                if let Some(score) = score {
                    scores.insert(country.id.clone(), score);
                }
                countries.push(country);
            }
            Err(err) => {
                warn!(index, error = %err, "rejecting invalid record");
                rejected += 1;
            }
        }
    }

    if countries.is_empty() {
        return Err(LoadError::NoValidRecords);
    }
    if rejected > 0 {
        warn!(rejected, total, "kept valid subset of batch");
    }

    Ok(aggregate(&countries, &scores)?)
}
