use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertLog;
use crate::config::StoreConfig;
use crate::domain::{Alert, Reading, ReadingCandidate};
use crate::error::{StoreError, SyncError};
use crate::events::{self, StoreEvent};
use crate::sync::RemoteSync;
use crate::thresholds;
use crate::time::{Clock, SystemClock};
use crate::validators::{validate_built_reading, validate_reading};

/// Lifecycle of one sync operation (persist or fetch)
///
/// `Pending -> Retrying(n) -> Succeeded | Failed`, where `n` counts the
/// transient failures so far and never exceeds the configured retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Retrying(u32),
    Succeeded,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Succeeded | AttemptState::Failed)
    }

    pub fn on_success(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            AttemptState::Succeeded
        }
    }

    /// Permanent errors fail immediately; transient ones retry while budget remains
    pub fn on_failure(self, error: &SyncError, max_retries: u32) -> Self {
        let retries_used = match self {
            AttemptState::Pending => 0,
            AttemptState::Retrying(n) => n,
            terminal => return terminal,
        };

        if error.is_transient() && retries_used < max_retries {
            AttemptState::Retrying(retries_used + 1)
        } else {
            AttemptState::Failed
        }
    }
}

/// How a retried sync operation ended when it did not succeed
enum RetryFailure {
    Permanent { attempts: u32, source: SyncError },
    Exhausted { attempts: u32, source: SyncError },
}

/// In-memory, plot-indexed collection of readings synced with a remote API
///
/// Every reading that reaches the index has been confirmed by the remote
/// collaborator. Confirmed readings are evaluated against the threshold
/// table and out-of-range ones land in the store's [`AlertLog`].
///
/// Failed operations leave the index exactly as it was. Locks are never held
/// across an `.await`, so each mutation is atomic with respect to other tasks.
pub struct ReadingStore<S> {
    sync: S,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    readings: Mutex<HashMap<i64, Vec<Reading>>>,
    alerts: AlertLog,
    events: broadcast::Sender<StoreEvent>,
}

impl<S: RemoteSync> ReadingStore<S> {
    pub fn new(sync: S) -> Self {
        Self::with_config(sync, StoreConfig::default())
    }

    pub fn with_config(sync: S, config: StoreConfig) -> Self {
        let events = events::channel();
        Self {
            sync,
            config,
            clock: Arc::new(SystemClock::new()),
            readings: Mutex::new(HashMap::new()),
            alerts: AlertLog::with_events(events.clone()),
            events,
        }
    }

    /// Replace the clock used to stamp candidates without a measurement time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sync(&self) -> &S {
        &self.sync
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    /// Receive a [`StoreEvent`] after every completed mutation
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Validate a raw candidate and append it
    ///
    /// Validation failures return before the remote collaborator is called.
    pub async fn submit(&self, candidate: &ReadingCandidate) -> Result<Reading, StoreError> {
        let reading = validate_reading(candidate, self.clock.as_ref())?;
        self.append(reading).await
    }

    /// Persist a reading remotely, then record it and evaluate its thresholds
    ///
    /// A reading with a non-finite value, a non-positive plot id or a blank
    /// unit is refused before the remote collaborator is called. Transient
    /// sync failures are retried up to `max_retries` times. On success the
    /// server-confirmed reading (with its id) goes to the end of its plot's
    /// list and is returned.
    pub async fn append(&self, reading: Reading) -> Result<Reading, StoreError> {
        validate_built_reading(&reading)?;
        let plot_id = reading.plot_id();

        let persisted = self
            .run_with_retry("persist_reading", plot_id, || {
                self.sync.persist_reading(&reading)
            })
            .await
            .map_err(|failure| match failure {
                RetryFailure::Permanent { source, .. } => StoreError::Rejected(source),
                RetryFailure::Exhausted { attempts, source } => {
                    StoreError::PersistenceFailed { attempts, source }
                }
            })?;

        self.lock_readings()
            .entry(persisted.plot_id())
            .or_default()
            .push(persisted.clone());

        info!(
            plot_id = persisted.plot_id(),
            reading_id = persisted.id(),
            reading_type = %persisted.reading_type(),
            value = persisted.value(),
            "Reading persisted"
        );
        events::notify(
            &self.events,
            StoreEvent::ReadingAppended {
                plot_id: persisted.plot_id(),
                reading_id: persisted.id(),
            },
        );

        if let Some(alert) = thresholds::evaluate(&persisted) {
            self.alerts.record(alert);
        }

        Ok(persisted)
    }

    /// Swap out every reading held for `plot_id`; other plots are untouched
    pub fn replace_plot_readings(&self, plot_id: i64, readings: Vec<Reading>) {
        let count = readings.len();
        self.lock_readings().insert(plot_id, readings);

        info!(plot_id, count, "Plot readings replaced");
        events::notify(&self.events, StoreEvent::PlotReplaced { plot_id, count });
    }

    /// Fetch a plot's readings from the remote side and replace the local copy
    ///
    /// Uses the same retry policy as [`ReadingStore::append`]. On failure the
    /// local readings for the plot are kept.
    pub async fn reload_plot(&self, plot_id: i64) -> Result<Vec<Reading>, StoreError> {
        let fetched = self
            .run_with_retry("fetch_readings_for_plot", plot_id, || {
                self.sync.fetch_readings_for_plot(plot_id)
            })
            .await
            .map_err(|failure| {
                let (attempts, source) = match failure {
                    RetryFailure::Permanent { attempts, source }
                    | RetryFailure::Exhausted { attempts, source } => (attempts, source),
                };
                StoreError::FetchFailed {
                    plot_id,
                    attempts,
                    source,
                }
            })?;

        self.replace_plot_readings(plot_id, fetched.clone());
        Ok(fetched)
    }

    /// Snapshot of a plot's readings; empty for unknown plots
    pub fn readings_for_plot(&self, plot_id: i64) -> Vec<Reading> {
        self.lock_readings()
            .get(&plot_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Most recently inserted reading for a plot
    pub fn latest_for_plot(&self, plot_id: i64) -> Option<Reading> {
        self.lock_readings()
            .get(&plot_id)
            .and_then(|readings| readings.last().cloned())
    }

    /// Re-run the threshold policy over a plot without recording alerts
    pub fn evaluate_plot(&self, plot_id: i64) -> Vec<Alert> {
        thresholds::evaluate_all(&self.readings_for_plot(plot_id))
    }

    /// Plots with a local entry, ascending
    pub fn plot_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.lock_readings().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn reading_count(&self) -> usize {
        self.lock_readings().values().map(Vec::len).sum()
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        plot_id: i64,
        mut call: F,
    ) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut state = AttemptState::Pending;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            debug!(
                operation,
                plot_id,
                attempt = attempts,
                max_attempts,
                ?state,
                "Sync attempt"
            );

            let error = match call().await {
                Ok(value) => {
                    state = state.on_success();
                    debug!(operation, plot_id, attempts, ?state, "Sync operation finished");
                    return Ok(value);
                }
                Err(error) => error,
            };

            state = state.on_failure(&error, self.config.max_retries);
            match state {
                AttemptState::Retrying(retry) => {
                    warn!(
                        operation,
                        plot_id,
                        attempt = attempts,
                        max_attempts,
                        retry,
                        error = %error,
                        "Transient sync failure, retrying"
                    );
                    if !self.config.retry_backoff.is_zero() {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
                _ if error.is_transient() => {
                    error!(
                        operation,
                        plot_id,
                        attempts,
                        ?state,
                        error = %error,
                        "Sync retries exhausted"
                    );
                    return Err(RetryFailure::Exhausted {
                        attempts,
                        source: error,
                    });
                }
                _ => {
                    error!(
                        operation,
                        plot_id,
                        attempts,
                        ?state,
                        error = %error,
                        "Sync rejected permanently"
                    );
                    return Err(RetryFailure::Permanent {
                        attempts,
                        source: error,
                    });
                }
            }
        }
    }

    // A poisoned lock only means another task panicked; the map is still valid
    fn lock_readings(&self) -> MutexGuard<'_, HashMap<i64, Vec<Reading>>> {
        self.readings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
