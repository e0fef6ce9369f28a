//! Watchlist table access

use crate::error::{AppError, Result};
use crate::models::{InstrumentRecord, Valuation, WatchedInstrument};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "SELECT id, name, holding_shares, prior_valuation, current_valuation,
        last_update_timestamp, is_live_estimate
     FROM watchlist";

struct WatchlistRow {
    id: String,
    name: String,
    holding_shares: f64,
    prior_valuation: f64,
    current_valuation: f64,
    last_update_timestamp: Option<String>,
    is_live_estimate: bool,
}

impl WatchlistRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            holding_shares: row.get(2)?,
            prior_valuation: row.get(3)?,
            current_valuation: row.get(4)?,
            last_update_timestamp: row.get(5)?,
            is_live_estimate: row.get::<_, i32>(6)? == 1,
        })
    }

    fn into_record(self) -> Result<InstrumentRecord> {
        let last_update_timestamp = self
            .last_update_timestamp
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|e| {
                        AppError::Store(format!("Corrupt timestamp for {}: {}", self.id, e))
                    })
            })
            .transpose()?;

        Ok(WatchedInstrument {
            id: self.id,
            name: self.name,
            holding_shares: self.holding_shares,
            prior_valuation: self.prior_valuation,
            current_valuation: self.current_valuation,
            last_update_timestamp,
            is_live_estimate: self.is_live_estimate,
        }
        .into())
    }
}

/// Get all watchlist records in insertion order
pub fn get_all(conn: &Connection) -> Result<Vec<InstrumentRecord>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY rowid", SELECT_COLUMNS))?;

    let rows = stmt
        .query_map([], WatchlistRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(WatchlistRow::into_record).collect()
}

/// Get one record by id
pub fn get(conn: &Connection, id: &str) -> Result<Option<InstrumentRecord>> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            [id],
            WatchlistRow::from_row,
        )
        .optional()?;

    row.map(WatchlistRow::into_record).transpose()
}

/// Insert a new record
pub fn insert(conn: &Connection, record: &InstrumentRecord) -> Result<()> {
    let data = &record.data;
    conn.execute(
        "INSERT INTO watchlist (id, name, holding_shares, prior_valuation, current_valuation,
            last_update_timestamp, is_live_estimate)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            record.id,
            data.name,
            data.holding_shares,
            data.prior_valuation,
            data.current_valuation,
            data.last_update_timestamp.map(|ts| ts.to_rfc3339()),
            data.is_live_estimate as i32,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Validation(format!("Instrument already watched: {}", record.id))
        }
        _ => e.into(),
    })?;

    Ok(())
}

/// Replace every field of an existing record
pub fn update(conn: &Connection, record: &InstrumentRecord) -> Result<()> {
    let data = &record.data;
    let rows = conn.execute(
        "UPDATE watchlist SET name = ?, holding_shares = ?, prior_valuation = ?,
            current_valuation = ?, last_update_timestamp = ?, is_live_estimate = ?,
            updated_at = datetime('now')
         WHERE id = ?",
        rusqlite::params![
            data.name,
            data.holding_shares,
            data.prior_valuation,
            data.current_valuation,
            data.last_update_timestamp.map(|ts| ts.to_rfc3339()),
            data.is_live_estimate as i32,
            record.id,
        ],
    )?;

    if rows == 0 {
        return Err(AppError::NotFound(format!("Instrument not found: {}", record.id)));
    }

    Ok(())
}

/// Overwrite only the valuation columns of a record
pub fn record_valuation(
    conn: &Connection,
    id: &str,
    valuation: &Valuation,
    is_live_estimate: bool,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE watchlist SET prior_valuation = ?, current_valuation = ?,
            last_update_timestamp = ?, is_live_estimate = ?, updated_at = datetime('now')
         WHERE id = ?",
        rusqlite::params![
            valuation.prior_valuation,
            valuation.current_valuation,
            valuation.source_timestamp.to_rfc3339(),
            is_live_estimate as i32,
            id,
        ],
    )?;

    Ok(rows > 0)
}

/// Delete a record
pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    let rows = conn.execute("DELETE FROM watchlist WHERE id = ?", [id])?;
    if rows == 0 {
        tracing::debug!("Delete of unknown instrument {} ignored", id);
    }
    Ok(())
}
