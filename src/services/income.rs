//! Income calculation
//!
//! Per-instrument figures are rounded to the cent before they are summed,
//! so the aggregate always equals the sum of the rows a user can see.

use crate::models::{InstrumentRecord, WatchedInstrument};

/// Today's change for one instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentIncome {
    /// Fractional change, `0.1` is +10%
    pub rate: f64,
    /// Absolute income, rounded to the cent
    pub income: f64,
}

/// Aggregate over a record set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeSummary {
    pub total_income: f64,
    /// Every held instrument has a settled valuation
    pub settled: bool,
    pub held_count: usize,
}

/// Round half-up at the cent
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Rate of change; a zero prior valuation yields zero
pub fn change_rate(prior_valuation: f64, current_valuation: f64) -> f64 {
    if prior_valuation == 0.0 {
        0.0
    } else {
        current_valuation / prior_valuation - 1.0
    }
}

/// Rate and income for one instrument
pub fn instrument_income(instrument: &WatchedInstrument) -> InstrumentIncome {
    let rate = change_rate(instrument.prior_valuation, instrument.current_valuation);
    let income = if instrument.is_held() {
        round_cents(rate * instrument.holding_shares * instrument.prior_valuation)
    } else {
        0.0
    };

    InstrumentIncome { rate, income }
}

/// Sum of rounded per-instrument incomes over held instruments
pub fn summarize(records: &[InstrumentRecord]) -> IncomeSummary {
    let held: Vec<&WatchedInstrument> = records
        .iter()
        .map(|r| &r.data)
        .filter(|i| i.is_held())
        .collect();

    IncomeSummary {
        total_income: held.iter().map(|i| instrument_income(i).income).sum(),
        settled: held.iter().all(|i| !i.is_live_estimate),
        held_count: held.len(),
    }
}
