//! sensor.rs
//!
//! One configured sensor instance. Owns its config, the last published
//! snapshot and refresh diagnostics. A refresh fetches, summarizes off to the
//! side and swaps the finished snapshot in; a failed fetch leaves the previous
//! snapshot untouched.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::SensorConfig;
use crate::error::FetchError;
use crate::models::{Diagnostics, SensorState, Snapshot};
use crate::polisen_client::EventSource;
use crate::services::summarize::summarize;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// New snapshot published.
    Updated(Arc<Snapshot>),
    /// Fetch failed; the previous snapshot is still exposed.
    Failed(FetchError),
    /// Another refresh of this sensor was already running.
    Skipped,
    /// The sensor was shut down before the fetch completed.
    Cancelled,
}

impl RefreshOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            RefreshOutcome::Updated(_) => "updated",
            RefreshOutcome::Failed(_) => "failed",
            RefreshOutcome::Skipped => "skipped",
            RefreshOutcome::Cancelled => "cancelled",
        }
    }
}

/// Clears the in-flight flag when the refresh finishes, whichever way.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// True once a refresh has succeeded and the latest one did not fail.
fn available(diagnostics: &Diagnostics) -> bool {
    diagnostics.last_success.is_some() && diagnostics.consecutive_failures == 0
}

pub struct Sensor<S: EventSource> {
    config: SensorConfig,
    source: Arc<S>,
    snapshot: ArcSwapOption<Snapshot>,
    diagnostics: RwLock<Diagnostics>,
    refreshing: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl<S: EventSource> Sensor<S> {
    pub fn new(config: SensorConfig, source: Arc<S>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            source,
            snapshot: ArcSwapOption::empty(),
            diagnostics: RwLock::new(Diagnostics::default()),
            refreshing: AtomicBool::new(false),
            shutdown,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_available(&self) -> bool {
        available(&self.diagnostics())
    }

    pub fn state(&self) -> SensorState {
        let snapshot = self.snapshot();
        let diagnostics = self.diagnostics();
        let is_available = available(&diagnostics);
        SensorState::build(&self.config, snapshot.as_deref(), diagnostics, is_available)
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Teardown hook: abandons an in-flight fetch and turns later refreshes
    /// into no-ops.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        info!(sensor = %self.config.name, "Sensor shut down");
    }

    /// Resolves once `shutdown` has been called.
    pub async fn stopped(&self) {
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_at(Utc::now).await
    }

    /// Same as `refresh`, with the clock supplied by the caller. `now` is
    /// read after the fetch completes.
    pub async fn refresh_at<F>(&self, now: F) -> RefreshOutcome
    where
        F: FnOnce() -> DateTime<Utc>,
    {
        if self.is_shut_down() {
            return RefreshOutcome::Cancelled;
        }

        let Some(_in_flight) = InFlight::acquire(&self.refreshing) else {
            info!(sensor = %self.config.name, "Refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        };

        let fetched = tokio::select! {
            result = self.source.fetch() => result,
            _ = self.stopped() => {
                info!(sensor = %self.config.name, "Refresh cancelled by shutdown");
                return RefreshOutcome::Cancelled;
            }
        };

        let now = now();
        match fetched {
            Ok(raw_events) => {
                let snapshot = Arc::new(summarize(&raw_events, &self.config, now));
                self.snapshot.store(Some(snapshot.clone()));
                self.record_success(now);

                info!(
                    sensor = %self.config.name,
                    received = raw_events.len(),
                    count = snapshot.count,
                    published = snapshot.events.len(),
                    "Sensor refreshed"
                );
                RefreshOutcome::Updated(snapshot)
            }
            Err(e) => {
                let failures = self.record_failure(now, &e);
                warn!(
                    sensor = %self.config.name,
                    error = %e,
                    consecutive_failures = failures,
                    "Failed to fetch police events, keeping previous snapshot"
                );
                RefreshOutcome::Failed(e)
            }
        }
    }

    fn record_success(&self, now: DateTime<Utc>) {
        let mut diagnostics = self.diagnostics.write().unwrap_or_else(PoisonError::into_inner);
        diagnostics.last_success = Some(now);
        diagnostics.consecutive_failures = 0;
    }

    fn record_failure(&self, now: DateTime<Utc>, error: &FetchError) -> u32 {
        let mut diagnostics = self.diagnostics.write().unwrap_or_else(PoisonError::into_inner);
        diagnostics.last_failure = Some(now);
        diagnostics.last_error = Some(error.to_string());
        diagnostics.consecutive_failures += 1;
        diagnostics.consecutive_failures
    }
}
