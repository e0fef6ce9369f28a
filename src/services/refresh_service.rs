//! Refresh Service
//!
//! One refresh cycle: fetch every watched instrument concurrently, write
//! fresh valuations back through the record store, then re-read the store
//! as the new snapshot. A failed fetch only leaves that instrument's data
//! stale; a failing store aborts the whole cycle.

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use crate::models::RefreshSnapshot;
use crate::services::staleness;
use crate::valuation::ValuationSource;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happened to one instrument during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    Updated,
    /// The record disappeared from the store mid-cycle
    Removed,
    Failed { reason: String, parse_failure: bool },
}

/// Result of a completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: Arc<RefreshSnapshot>,
    /// Instrument ids whose fetch failed this round
    pub failed: Vec<String>,
    /// Number of failures caused by an unreadable response body
    pub parse_failures: usize,
}

/// Refresh cycle driver
pub struct RefreshService {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn ValuationSource>,
    staleness_threshold: Duration,
}

impl RefreshService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn ValuationSource>,
        staleness_threshold: Duration,
    ) -> Self {
        Self {
            store,
            source,
            staleness_threshold,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Run one cycle against the wall clock
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle, classifying staleness against `now`
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let records = self.store.get_all().map_err(|e| {
            error!("Refresh cycle aborted, store unreadable: {}", e);
            e
        })?;

        info!(
            "RefreshService::run_cycle - {} instruments via {}",
            records.len(),
            self.source.id()
        );

        let outcomes = join_all(records.iter().map(|r| self.refresh_one(&r.id, now))).await;

        let mut failed = Vec::new();
        let mut parse_failures = 0;
        for (record, outcome) in records.iter().zip(outcomes) {
            match outcome? {
                InstrumentOutcome::Failed { parse_failure, .. } => {
                    if parse_failure {
                        parse_failures += 1;
                    }
                    failed.push(record.id.clone());
                }
                InstrumentOutcome::Updated | InstrumentOutcome::Removed => {}
            }
        }

        let refreshed = self.store.get_all()?;
        info!(
            "Refresh cycle complete: {} instruments, {} failed",
            refreshed.len(),
            failed.len()
        );

        Ok(CycleReport {
            snapshot: RefreshSnapshot::new(refreshed, now),
            failed,
            parse_failures,
        })
    }

    /// Fetch and write back one instrument.
    ///
    /// Only store errors are returned as `Err`.
    async fn refresh_one(&self, id: &str, now: DateTime<Utc>) -> Result<InstrumentOutcome> {
        let valuation = match self.source.fetch_valuation(id).await {
            Ok(valuation) => valuation,
            Err(e) => {
                warn!("Valuation fetch failed for {}: {}", id, e);
                return Ok(InstrumentOutcome::Failed {
                    parse_failure: matches!(e, AppError::Parse { .. }),
                    reason: e.to_string(),
                });
            }
        };

        let is_live = staleness::classify(valuation.source_timestamp, now, self.staleness_threshold);

        // Only valuation fields are written so concurrent holding edits survive
        if !self.store.record_valuation(id, &valuation, is_live)? {
            debug!("Instrument {} removed during refresh", id);
            return Ok(InstrumentOutcome::Removed);
        }

        debug!(
            "Updated {}: prior={} current={} live={}",
            id, valuation.prior_valuation, valuation.current_valuation, is_live
        );
        Ok(InstrumentOutcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{InstrumentRecord, Valuation, WatchedInstrument};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;

    /// Source answering from a fixed table; unknown ids fail to parse
    struct TableSource {
        table: HashMap<String, Valuation>,
        /// Store edited from inside the fetch, as a concurrent user would
        meddle: Option<Arc<MemoryStore>>,
    }

    #[async_trait]
    impl ValuationSource for TableSource {
        fn id(&self) -> &'static str {
            "table"
        }

        async fn fetch_valuation(&self, instrument_id: &str) -> Result<Valuation> {
            if instrument_id.contains(' ') {
                return Err(AppError::fetch(instrument_id, "invalid instrument id"));
            }
            if let Some(store) = &self.meddle {
                if let Some(mut record) = store.get("001")? {
                    record.data.holding_shares = 500.0;
                    store.update(&record)?;
                }
                store.delete("002")?;
            }
            self.table
                .get(instrument_id)
                .cloned()
                .ok_or_else(|| AppError::parse(instrument_id, "no envelope"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 7, 30, 0).unwrap()
    }

    fn valuation(prior: f64, current: f64, minutes_old: i64) -> Valuation {
        Valuation {
            prior_valuation: prior,
            current_valuation: current,
            source_timestamp: now() - chrono::Duration::minutes(minutes_old),
            name: None,
        }
    }

    fn held(id: &str, name: &str, shares: f64) -> InstrumentRecord {
        let mut data = WatchedInstrument::new(id, name);
        data.holding_shares = shares;
        data.prior_valuation = 0.5;
        data.current_valuation = 0.5;
        data.into()
    }

    fn service(store: Arc<MemoryStore>, table: Vec<(&str, Valuation)>) -> RefreshService {
        let source = TableSource {
            table: table.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            meddle: None,
        };
        RefreshService::new(store, Arc::new(source), staleness::DEFAULT_THRESHOLD)
    }

    #[tokio::test]
    async fn test_cycle_updates_valuations_and_keeps_other_fields() {
        let store = Arc::new(MemoryStore::with_records(vec![
            held("001", "Alpha", 100.0),
            held("002", "Beta", 0.0),
        ]));
        let service = service(
            store.clone(),
            vec![("001", valuation(1.0, 1.1, 2)), ("002", valuation(2.0, 1.8, 45))],
        );

        let report = service.run_cycle_at(now()).await.unwrap();
        assert!(report.failed.is_empty());

        let alpha = &report.snapshot.records[0].data;
        assert_eq!(alpha.name, "Alpha");
        assert_eq!(alpha.holding_shares, 100.0);
        assert_eq!(alpha.current_valuation, 1.1);
        assert!(alpha.is_live_estimate);

        let beta = &report.snapshot.records[1].data;
        assert_eq!(beta.prior_valuation, 2.0);
        assert!(!beta.is_live_estimate);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_stale_record() {
        let store = Arc::new(MemoryStore::with_records(vec![
            held("001", "Alpha", 100.0),
            held("002", "Beta", 10.0),
        ]));
        let service = service(store.clone(), vec![("002", valuation(1.0, 1.2, 0))]);

        let report = service.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.failed, vec!["001".to_string()]);
        assert_eq!(report.parse_failures, 1);
        assert_eq!(report.snapshot.records.len(), 2);
        assert_eq!(report.snapshot.records[0], held("001", "Alpha", 100.0));
        assert_eq!(report.snapshot.records[1].data.current_valuation, 1.2);
    }

    #[tokio::test]
    async fn test_only_unreadable_bodies_count_as_parse_failures() {
        let store = Arc::new(MemoryStore::with_records(vec![
            held("bad id", "Odd", 1.0),
            held("001", "Alpha", 1.0),
        ]));
        let service = service(store, vec![]);

        let report = service.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.parse_failures, 1);
    }

    #[tokio::test]
    async fn test_edits_during_fetch_survive_write_back() {
        let store = Arc::new(MemoryStore::with_records(vec![
            held("001", "Alpha", 100.0),
            held("002", "Beta", 10.0),
        ]));
        let source = TableSource {
            table: [
                ("001".to_string(), valuation(1.0, 1.1, 2)),
                ("002".to_string(), valuation(2.0, 2.2, 2)),
            ]
            .into_iter()
            .collect(),
            meddle: Some(store.clone()),
        };
        let service = RefreshService::new(store, Arc::new(source), staleness::DEFAULT_THRESHOLD);

        let report = service.run_cycle_at(now()).await.unwrap();
        assert_eq!(report.snapshot.records.len(), 1);
        let alpha = &report.snapshot.records[0].data;
        assert_eq!(alpha.holding_shares, 500.0);
        assert_eq!(alpha.current_valuation, 1.1);
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let store = Arc::new(MemoryStore::with_records(vec![held("001", "Alpha", 1.0)]));
        store.set_offline(true);
        let service = service(store, vec![("001", valuation(1.0, 1.1, 0))]);

        let err = service.run_cycle_at(now()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, vec![]);
        let report = service.run_cycle_at(now()).await.unwrap();
        assert!(report.snapshot.is_empty());
        assert_eq!(report.snapshot.refreshed_at, now());
    }
}
