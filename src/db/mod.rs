//! Record store module
//!
//! The engine never owns persistence; it reads and rewrites watchlist
//! records through [`RecordStore`]. Two implementations ship with the
//! crate: an in-memory store and a SQLite-backed one.

pub mod sqlite;

use crate::error::{AppError, Result};
use crate::models::{InstrumentRecord, Valuation};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

pub use sqlite::SqliteStore;

/// Keyed record store holding the watchlist
pub trait RecordStore: Send + Sync {
    /// All records in store-native order
    fn get_all(&self) -> Result<Vec<InstrumentRecord>>;

    /// One record by id
    fn get(&self, id: &str) -> Result<Option<InstrumentRecord>>;

    /// Replace a record in full
    fn update(&self, record: &InstrumentRecord) -> Result<()>;

    /// Write a fetched valuation onto a record, leaving every other field
    /// as stored. Returns `false` when the record no longer exists.
    fn record_valuation(
        &self,
        id: &str,
        valuation: &Valuation,
        is_live_estimate: bool,
    ) -> Result<bool>;

    /// Remove a record; removing an unknown id is not an error
    fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory record store, insertion ordered
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<InstrumentRecord>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with records
    pub fn with_records(records: Vec<InstrumentRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            offline: AtomicBool::new(false),
        }
    }

    /// Add a new record
    pub fn insert(&self, record: InstrumentRecord) -> Result<()> {
        self.ensure_online()?;
        let mut records = self.records.write();
        if records.iter().any(|r| r.id == record.id) {
            return Err(AppError::Validation(format!(
                "Instrument already watched: {}",
                record.id
            )));
        }
        records.push(record);
        Ok(())
    }

    /// Make every operation fail as if the backing store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Store("Record store unreachable".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<InstrumentRecord>> {
        self.ensure_online()?;
        Ok(self.records.read().clone())
    }

    fn get(&self, id: &str) -> Result<Option<InstrumentRecord>> {
        self.ensure_online()?;
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    fn update(&self, record: &InstrumentRecord) -> Result<()> {
        self.ensure_online()?;
        let mut records = self.records.write();
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| AppError::NotFound(format!("Instrument not found: {}", record.id)))?;
        *slot = record.clone();
        Ok(())
    }

    fn record_valuation(
        &self,
        id: &str,
        valuation: &Valuation,
        is_live_estimate: bool,
    ) -> Result<bool> {
        self.ensure_online()?;
        let mut records = self.records.write();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };

        let data = &mut record.data;
        data.prior_valuation = valuation.prior_valuation;
        data.current_valuation = valuation.current_valuation;
        data.last_update_timestamp = Some(valuation.source_timestamp);
        data.is_live_estimate = is_live_estimate;
        Ok(true)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.ensure_online()?;
        self.records.write().retain(|r| r.id != id);
        Ok(())
    }
}
