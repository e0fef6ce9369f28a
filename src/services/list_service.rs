//! List Service
//!
//! Projects a record set into the rows a list host displays: one summary
//! row with today's total income, then one row per instrument in store
//! order.

use crate::models::{DisplayRow, IconTone, InstrumentRecord};
use crate::services::income;

const SETTLED_MARK: &str = "✅";

/// Receiver of projected rows, implemented by the list host
pub trait ListSink: Send + Sync {
    /// Replace the displayed list
    fn set_list(&self, rows: Vec<DisplayRow>);

    /// One-shot user-visible notice
    fn notify(&self, _message: &str) {}
}

impl<F> ListSink for F
where
    F: Fn(Vec<DisplayRow>) + Send + Sync,
{
    fn set_list(&self, rows: Vec<DisplayRow>) {
        self(rows)
    }
}

/// Row projector
#[derive(Debug, Clone)]
pub struct ListProjector {
    currency_symbol: String,
}

impl Default for ListProjector {
    fn default() -> Self {
        Self::new("¥")
    }
}

impl ListProjector {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Summary row followed by one row per record.
    ///
    /// An empty record set yields a single "add instrument" placeholder.
    pub fn project(&self, records: &[InstrumentRecord], search_token: Option<&str>) -> Vec<DisplayRow> {
        let search_token = search_token.map(str::to_string);

        if records.is_empty() {
            return vec![DisplayRow {
                key: None,
                title: String::new(),
                description: String::new(),
                icon_tone: IconTone::Add,
                search_token,
            }];
        }

        let summary = income::summarize(records);
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(DisplayRow {
            key: None,
            title: with_mark("Today's total income".to_string(), summary.settled),
            description: self.money(summary.total_income),
            icon_tone: IconTone::for_change(summary.total_income),
            search_token: search_token.clone(),
        });

        rows.extend(records.iter().map(|record| {
            let fund = &record.data;
            let figures = income::instrument_income(fund);

            let mut description = format!("{:.2}% {}", figures.rate * 100.0, self.money(figures.income));
            if fund.is_held() {
                description.push_str(&format!(" holding: {:.2}", fund.holding_shares));
            }

            DisplayRow {
                key: Some(record.id.clone()),
                title: with_mark(format!("{} {}", fund.id, fund.name), !fund.is_live_estimate),
                description,
                icon_tone: IconTone::for_change(figures.rate),
                search_token: search_token.clone(),
            }
        }));

        rows
    }

    /// Row shown while the first cycle of a session is running
    pub fn loading_row() -> DisplayRow {
        DisplayRow {
            key: None,
            title: "Loading, please wait...".to_string(),
            description: "~~~~~~~~~~~~~~~".to_string(),
            icon_tone: IconTone::Loading,
            search_token: None,
        }
    }

    fn money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency_symbol, amount)
    }
}

fn with_mark(title: String, settled: bool) -> String {
    if settled {
        format!("{} {}", title, SETTLED_MARK)
    } else {
        title
    }
}
