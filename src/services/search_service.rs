//! Search Service
//!
//! The search box does double duty: with the filter prefix it narrows the
//! list, otherwise its text is a pending holding size for the next
//! selection.

use crate::models::InstrumentRecord;

/// Interpretation of the raw search text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchIntent {
    /// Empty text, show everything
    All,
    /// Prefix stripped; substring to look for in id and name
    Filter(String),
    /// Text kept as a holding-size edit for selection handling
    HoldingEdit(String),
}

impl SearchIntent {
    pub fn parse(token: &str, filter_prefix: &str) -> Self {
        if token.is_empty() {
            return SearchIntent::All;
        }
        match token.strip_prefix(filter_prefix) {
            Some(needle) => SearchIntent::Filter(needle.to_string()),
            None => SearchIntent::HoldingEdit(token.to_string()),
        }
    }

    /// Token echoed back on every projected row
    pub fn row_token(&self) -> Option<&str> {
        match self {
            SearchIntent::All => None,
            SearchIntent::Filter(needle) => Some(needle),
            SearchIntent::HoldingEdit(text) => Some(text),
        }
    }
}

/// Records matching the intent.
///
/// A filter with no match falls back to the full list, so the result is
/// never emptier than the input.
pub fn filter_records(records: &[InstrumentRecord], intent: &SearchIntent) -> Vec<InstrumentRecord> {
    let SearchIntent::Filter(needle) = intent else {
        return records.to_vec();
    };

    let matched: Vec<InstrumentRecord> = records
        .iter()
        .filter(|r| r.data.id.contains(needle.as_str()) || r.data.name.contains(needle.as_str()))
        .cloned()
        .collect();

    if matched.is_empty() {
        tracing::debug!("No instrument matches {:?}, showing full list", needle);
        records.to_vec()
    } else {
        matched
    }
}
