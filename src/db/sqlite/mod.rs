//! SQLite record store

mod migrations;
mod watchlist;

use crate::db::RecordStore;
use crate::error::Result;
use crate::models::{InstrumentRecord, Valuation};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite-backed watchlist store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    /// Add a new instrument to the watchlist
    pub fn insert(&self, record: &InstrumentRecord) -> Result<()> {
        let conn = self.conn.lock();
        watchlist::insert(&conn, record)
    }
}

impl RecordStore for SqliteStore {
    fn get_all(&self) -> Result<Vec<InstrumentRecord>> {
        let conn = self.conn.lock();
        watchlist::get_all(&conn)
    }

    fn get(&self, id: &str) -> Result<Option<InstrumentRecord>> {
        let conn = self.conn.lock();
        watchlist::get(&conn, id)
    }

    fn update(&self, record: &InstrumentRecord) -> Result<()> {
        let conn = self.conn.lock();
        watchlist::update(&conn, record)
    }

    fn record_valuation(
        &self,
        id: &str,
        valuation: &Valuation,
        is_live_estimate: bool,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        watchlist::record_valuation(&conn, id, valuation, is_live_estimate)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        watchlist::delete(&conn, id)
    }
}
