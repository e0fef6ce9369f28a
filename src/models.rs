//! Watchlist data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A watch-listed fund as persisted by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedInstrument {
    pub id: String,
    pub name: String,
    /// Units held; 0 means watched but not held
    pub holding_shares: f64,
    /// Last finalized per-unit value
    pub prior_valuation: f64,
    /// Latest live or final per-unit value
    pub current_valuation: f64,
    /// Source's last update, `None` until the first successful fetch
    pub last_update_timestamp: Option<DateTime<Utc>>,
    pub is_live_estimate: bool,
}

impl WatchedInstrument {
    /// A freshly added instrument with no valuation yet
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            holding_shares: 0.0,
            prior_valuation: 0.0,
            current_valuation: 0.0,
            last_update_timestamp: None,
            is_live_estimate: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.holding_shares > 0.0
    }
}

/// Keyed record as exchanged with the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub id: String,
    pub data: WatchedInstrument,
}

impl From<WatchedInstrument> for InstrumentRecord {
    fn from(data: WatchedInstrument) -> Self {
        Self {
            id: data.id.clone(),
            data,
        }
    }
}

/// Parsed valuation returned by a valuation source
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub prior_valuation: f64,
    pub current_valuation: f64,
    pub source_timestamp: DateTime<Utc>,
    /// Display name reported by the source, if any
    pub name: Option<String>,
}

/// Full record set produced by the most recent completed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSnapshot {
    pub records: Vec<InstrumentRecord>,
    pub refreshed_at: DateTime<Utc>,
}

impl RefreshSnapshot {
    pub fn new(records: Vec<InstrumentRecord>, refreshed_at: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            records,
            refreshed_at,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }
}

/// Icon shown next to a list row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconTone {
    Up,
    Down,
    Add,
    Loading,
}

impl IconTone {
    /// Tone for a signed figure; zero counts as up
    pub fn for_change(value: f64) -> Self {
        if value >= 0.0 {
            IconTone::Up
        } else {
            IconTone::Down
        }
    }

    /// Asset path used by list hosts
    pub fn asset(&self) -> &'static str {
        match self {
            IconTone::Up => "assets/img/up.png",
            IconTone::Down => "assets/img/down.png",
            IconTone::Add => "assets/img/add.png",
            IconTone::Loading => "assets/img/loading.png",
        }
    }
}

/// One projected list row; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    /// Instrument id, `None` for summary/placeholder rows
    pub key: Option<String>,
    pub title: String,
    pub description: String,
    pub icon_tone: IconTone,
    pub search_token: Option<String>,
}
