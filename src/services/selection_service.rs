//! Selection Service
//!
//! Handles a user picking a row: typed numeric text becomes the holding
//! size of the picked instrument, no text asks the host for a detail view.

use crate::db::RecordStore;
use crate::error::{AppError, Result};
use tracing::info;

/// What the host should do after a selection
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// Nothing is watched yet; open the add flow
    AddInstrument,
    HoldingUpdated { id: String, shares: f64 },
    ShowDetail { id: String },
    /// Summary row or non-numeric text
    Ignored,
}

pub struct SelectionService;

impl SelectionService {
    pub fn select(
        store: &dyn RecordStore,
        watchlist_empty: bool,
        key: Option<&str>,
        token: Option<&str>,
    ) -> Result<SelectionOutcome> {
        if watchlist_empty {
            return Ok(SelectionOutcome::AddInstrument);
        }

        let Some(id) = key else {
            return Ok(SelectionOutcome::Ignored);
        };

        match token.map(str::trim).filter(|t| !t.is_empty()) {
            None => Ok(SelectionOutcome::ShowDetail { id: id.to_string() }),
            Some(text) => match text.parse::<f64>() {
                Ok(shares) if shares.is_finite() => Self::set_holding(store, id, shares),
                _ => Ok(SelectionOutcome::Ignored),
            },
        }
    }

    /// Rewrite the holding size of one record
    pub fn set_holding(store: &dyn RecordStore, id: &str, shares: f64) -> Result<SelectionOutcome> {
        if shares < 0.0 {
            return Err(AppError::Validation(format!(
                "Holding size must not be negative: {}",
                shares
            )));
        }

        let mut record = store
            .get(id)?
            .ok_or_else(|| AppError::NotFound(format!("Instrument not found: {}", id)))?;
        record.data.holding_shares = shares;
        store.update(&record)?;

        info!("SelectionService::set_holding - {} now holds {}", id, shares);
        Ok(SelectionOutcome::HoldingUpdated {
            id: id.to_string(),
            shares,
        })
    }
}
