//! Watch session state
//!
//! One [`WatchSession`] exists per user session. It owns the cached
//! snapshot, the refresh scheduler and the list sink, and exposes the
//! operations a host wires to its list view.

use crate::config::WatchConfig;
use crate::db::RecordStore;
use crate::error::Result;
use crate::lifecycle::{LifecycleInterceptor, SessionEvents};
use crate::models::{DisplayRow, RefreshSnapshot};
use crate::scheduler::{CycleRunner, RefreshScheduler};
use crate::services::search_service::{self, SearchIntent};
use crate::services::{ListProjector, ListSink, RefreshService, SelectionOutcome, SelectionService};
use crate::valuation::ValuationSource;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

const PARSE_FAILURE_NOTICE: &str = "Failed to read fund valuation";

/// Per-session engine context
pub struct WatchSession {
    core: Arc<SessionCore>,
    scheduler: RefreshScheduler,
}

/// State shared with the scheduler loop
struct SessionCore {
    config: WatchConfig,
    refresh: RefreshService,
    projector: ListProjector,
    sink: Arc<dyn ListSink>,
    snapshot: RwLock<Option<Arc<RefreshSnapshot>>>,
    /// Held for the whole of every cycle, scheduled or on demand
    cycle_lock: tokio::sync::Mutex<()>,
    /// Bumped each time the snapshot is discarded
    epoch: AtomicU64,
}

impl WatchSession {
    pub fn new(
        config: WatchConfig,
        store: Arc<dyn RecordStore>,
        source: Arc<dyn ValuationSource>,
        sink: Arc<dyn ListSink>,
    ) -> Self {
        let core = Arc::new(SessionCore {
            refresh: RefreshService::new(store, source, config.staleness_threshold),
            projector: ListProjector::new(config.currency_symbol.clone()),
            config,
            sink,
            snapshot: RwLock::new(None),
            cycle_lock: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
        });
        let scheduler = RefreshScheduler::new(core.clone());

        Self { core, scheduler }
    }

    /// Open the list: show the loading row and (re)start the refresh loop
    pub fn enter(&self) {
        info!("WatchSession::enter");
        self.core.sink.set_list(vec![ListProjector::loading_row()]);
        self.scheduler.start(self.core.config.refresh_interval);
    }

    /// Install the session-end guard on the host's registry.
    ///
    /// The guard stops the refresh loop and drops the cached snapshot.
    pub fn attach_lifecycle<R>(&self, events: &SessionEvents<R>) -> bool {
        let core = self.core.clone();
        LifecycleInterceptor::install_with(events, &self.scheduler, move || core.discard())
    }

    /// Stop the refresh loop and drop the cached snapshot
    pub fn stop(&self) {
        self.scheduler.stop();
        self.core.discard();
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Snapshot from the most recent completed cycle
    pub fn snapshot(&self) -> Option<Arc<RefreshSnapshot>> {
        self.core.current()
    }

    /// Run a cycle immediately, outside the schedule
    pub async fn refresh_now(&self) -> Result<Arc<RefreshSnapshot>> {
        self.core.refresh().await
    }

    /// Project the (optionally filtered) snapshot and push it to the sink
    pub async fn search(&self, token: &str) -> Result<Vec<DisplayRow>> {
        let snapshot = self.core.snapshot_or_refresh().await?;
        let intent = SearchIntent::parse(token, &self.core.config.filter_prefix);
        let records = search_service::filter_records(&snapshot.records, &intent);

        let rows = self.core.projector.project(&records, intent.row_token());
        self.core.sink.set_list(rows.clone());
        Ok(rows)
    }

    /// Handle a row selection with the current search text
    pub async fn select(&self, key: Option<&str>, token: Option<&str>) -> Result<SelectionOutcome> {
        let snapshot = self.core.snapshot_or_refresh().await?;
        let outcome = SelectionService::select(
            self.core.refresh.store().as_ref(),
            snapshot.is_empty(),
            key,
            token,
        )?;

        if matches!(outcome, SelectionOutcome::HoldingUpdated { .. }) {
            self.scheduler.start(self.core.config.refresh_interval);
        }
        Ok(outcome)
    }

    /// Remove an instrument and refresh immediately.
    ///
    /// Ids absent from the current snapshot are ignored and return `false`.
    pub fn delete_instrument(&self, id: &str) -> Result<bool> {
        let known = self
            .snapshot()
            .map(|snapshot| snapshot.contains(id))
            .unwrap_or(false);
        if !known {
            info!("WatchSession::delete_instrument - {} not in snapshot, ignoring", id);
            return Ok(false);
        }

        self.core.refresh.store().delete(id)?;
        info!("WatchSession::delete_instrument - removed {}", id);

        self.enter();
        Ok(true)
    }
}

impl SessionCore {
    async fn refresh(&self) -> Result<Arc<RefreshSnapshot>> {
        let _cycle = self.cycle_lock.lock().await;
        self.refresh_locked().await
    }

    /// Run a cycle; the caller holds `cycle_lock`
    async fn refresh_locked(&self) -> Result<Arc<RefreshSnapshot>> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let report = self.refresh.run_cycle().await?;
        if report.parse_failures > 0 {
            self.sink.notify(PARSE_FAILURE_NOTICE);
        }

        let mut slot = self.snapshot.write();
        if self.epoch.load(Ordering::SeqCst) == epoch {
            *slot = Some(report.snapshot.clone());
        } else {
            debug!("Session ended during refresh, snapshot not kept");
        }
        Ok(report.snapshot)
    }

    async fn snapshot_or_refresh(&self) -> Result<Arc<RefreshSnapshot>> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let _cycle = self.cycle_lock.lock().await;
        // The cycle we waited on may already have published one
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        self.refresh_locked().await
    }

    fn current(&self) -> Option<Arc<RefreshSnapshot>> {
        self.snapshot.read().clone()
    }

    fn discard(&self) {
        let mut slot = self.snapshot.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if slot.take().is_some() {
            debug!("Snapshot discarded");
        }
    }
}

#[async_trait]
impl CycleRunner for SessionCore {
    async fn run_cycle(&self) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        match self.refresh().await {
            Ok(snapshot) if self.epoch.load(Ordering::SeqCst) == epoch => {
                self.sink.set_list(self.projector.project(&snapshot.records, None))
            }
            Ok(_) => debug!("Session ended during refresh, list left as is"),
            Err(e) => error!("Refresh cycle failed: {}", e),
        }
    }
}
