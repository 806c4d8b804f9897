//! Periodic monitoring of watched series.
//!
//! A [`Monitor`] re-enriches its tracked watch items on a fixed interval,
//! diffs each pass against the previous one, and publishes
//! `upcomingEpisode`, `nextEpisodeAvailable`, and `monitoringError` events on
//! an [`EventBus`].
//!
//! The monitor is either stopped or running. Starting runs a pass
//! immediately and then one per interval. Stopping cancels the schedule,
//! discards any pass still in flight, and forgets all per-series state.

pub mod state;

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use episonext_common::{MediaKind, SeriesId};

use crate::events::{EventBus, EventPayload};
use crate::metadata::enrichment::EnrichmentPipeline;
use crate::watchlist::WatchItem;

pub use state::MonitorState;

/// Default spacing between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default window for `upcomingEpisode`, in days.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 30;

/// Default deadline for a whole pass.
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunables for [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub lookahead_days: u32,
    pub pass_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }
}

/// Whether the schedule is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Stopped,
    Running,
}

struct RunHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Tracked {
    items: Vec<WatchItem>,
    series: BTreeSet<SeriesId>,
}

struct Inner {
    pipeline: Arc<EnrichmentPipeline>,
    events: Arc<EventBus>,
    settings: MonitorSettings,
    tracked: RwLock<Tracked>,
    state: Mutex<MonitorState>,
    run: Mutex<Option<RunHandle>>,
}

/// Background watcher for a set of series.
///
/// Cheap to clone; clones share the same schedule and state.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

impl Monitor {
    pub fn new(pipeline: Arc<EnrichmentPipeline>, events: Arc<EventBus>) -> Self {
        Self::with_settings(pipeline, events, MonitorSettings::default())
    }

    pub fn with_settings(
        pipeline: Arc<EnrichmentPipeline>,
        events: Arc<EventBus>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                events,
                settings,
                tracked: RwLock::new(Tracked::default()),
                state: Mutex::new(MonitorState::new()),
                run: Mutex::new(None),
            }),
        }
    }

    /// The bus events are published on.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    /// Start monitoring `items`, running a pass now and then every
    /// `interval`.
    ///
    /// No-op on a running monitor; use
    /// [`update_watched_series`](Self::update_watched_series) to change what
    /// it tracks. Must be called from within a Tokio runtime.
    pub fn start(&self, items: Vec<WatchItem>, interval: Duration) {
        let mut run = self.inner.run.lock();
        if run.is_some() {
            debug!("Monitor already running; ignoring start");
            return;
        }
        self.inner.set_tracked(items);

        let interval = if interval.is_zero() {
            warn!("Zero monitor interval requested; using default");
            DEFAULT_INTERVAL
        } else {
            interval
        };

        let token = CancellationToken::new();
        let task = tokio::spawn(run_schedule(
            Arc::downgrade(&self.inner),
            interval,
            token.clone(),
        ));
        *run = Some(RunHandle { token, task });

        info!(
            interval_secs = interval.as_secs_f64(),
            series = self.inner.tracked.read().series.len(),
            "Monitor started"
        );
    }

    /// Replace the tracked items. Takes effect from the next pass.
    pub fn update_watched_series(&self, items: Vec<WatchItem>) {
        self.inner.set_tracked(items);
    }

    /// Stop the schedule and discard all state, including state left by
    /// [`check_now`](Self::check_now) on a stopped monitor. Idempotent.
    pub fn stop(&self) {
        let handle = self.inner.run.lock().take();
        let Some(handle) = handle else {
            self.inner.state.lock().clear();
            return;
        };

        // Cancel before taking the state lock: a pass that is mid-emission
        // finishes first, later ones see the token and bail.
        handle.token.cancel();
        handle.task.abort();
        self.inner.state.lock().clear();
        info!("Monitor stopped");
    }

    pub fn status(&self) -> MonitorStatus {
        if self.inner.run.lock().is_some() {
            MonitorStatus::Running
        } else {
            MonitorStatus::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == MonitorStatus::Running
    }

    /// Series ids of the tracked series items.
    pub fn watched_series(&self) -> Vec<SeriesId> {
        self.inner.tracked.read().series.iter().cloned().collect()
    }

    /// The action recorded for a series by the latest pass.
    pub fn last_action(&self, series_id: &SeriesId) -> Option<episonext_common::SuggestedAction> {
        self.inner.state.lock().action_for(series_id)
    }

    /// Run one pass now, outside the schedule. Returns the number of events
    /// emitted.
    ///
    /// On a stopped monitor the pass still records its snapshots, so
    /// consecutive one-shot passes diff against each other. [`stop`](Self::stop)
    /// discards them.
    pub async fn check_now(&self) -> usize {
        let token = self
            .inner
            .run
            .lock()
            .as_ref()
            .map(|h| h.token.clone())
            .unwrap_or_else(CancellationToken::new);
        self.inner.run_pass(token).await
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.run.get_mut().take() {
            handle.token.cancel();
            handle.task.abort();
        }
    }
}

impl Inner {
    fn set_tracked(&self, items: Vec<WatchItem>) {
        let series = items
            .iter()
            .filter(|item| item.kind == MediaKind::Series)
            .filter_map(|item| item.series_id().ok())
            .collect();
        let mut tracked = self.tracked.write();
        tracked.items = items;
        tracked.series = series;
    }

    /// One monitoring pass. Returns the number of events emitted.
    async fn run_pass(&self, token: CancellationToken) -> usize {
        let items = self.tracked.read().items.clone();
        if items.is_empty() {
            debug!("No watched items; skipping pass");
            return 0;
        }

        if !self.pipeline.provider_available() {
            return self.emit_error(
                &token,
                format!(
                    "metadata provider '{}' is not configured",
                    self.pipeline.provider_name()
                ),
            );
        }

        let pass = AssertUnwindSafe(self.pipeline.enrich_with_report(&items)).catch_unwind();
        let report = match tokio::time::timeout(self.settings.pass_timeout, pass).await {
            Ok(Ok(report)) => report,
            Ok(Err(_)) => {
                error!("Monitoring pass panicked");
                return self.emit_error(&token, "monitoring pass panicked".to_string());
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.settings.pass_timeout.as_secs(),
                    "Monitoring pass timed out"
                );
                return self.emit_error(
                    &token,
                    format!(
                        "monitoring pass exceeded {}s deadline",
                        self.settings.pass_timeout.as_secs()
                    ),
                );
            }
        };

        let mut emitted = 0;
        if report.catalog_unreachable() {
            emitted += self.emit_error(
                &token,
                format!(
                    "catalog unreachable: all {} series lookups failed",
                    report.lookups
                ),
            );
        }

        let today = Utc::now().date_naive();
        let mut state = self.state.lock();
        if token.is_cancelled() {
            debug!("Monitor stopped during pass; discarding results");
            return emitted;
        }
        let payloads = state.observe(&report.items, today, self.settings.lookahead_days);
        for payload in payloads {
            info!(kind = %payload.kind(), "Emitting monitor event");
            self.events.emit(payload);
            emitted += 1;
        }
        drop(state);

        debug!(
            items = report.items.len(),
            enriched = report.enriched,
            emitted,
            "Monitoring pass complete"
        );
        emitted
    }

    fn emit_error(&self, token: &CancellationToken, message: String) -> usize {
        let _state = self.state.lock();
        if token.is_cancelled() {
            return 0;
        }
        warn!(message = %message, "Monitoring error");
        self.events.emit(EventPayload::MonitoringError { message });
        1
    }
}

/// Drives passes until cancelled or until every [`Monitor`] handle is gone.
async fn run_schedule(inner: Weak<Inner>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(monitor) = inner.upgrade() else {
            break;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = monitor.run_pass(token.clone()) => {}
        }
    }

    debug!("Monitor schedule exited");
}
