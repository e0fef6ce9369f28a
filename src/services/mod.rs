//! Services Layer
//!
//! Engine logic shared by the session context and its hosts.
//!
//! # Architecture
//!
//! ```text
//! Scheduler --> RefreshService --> ValuationSource (per instrument)
//!                    |                 |
//!                    v                 v
//!               RecordStore <-- staleness::classify
//!                    |
//!                    v
//!   search_service --> ListProjector --> ListSink
//! ```
//!
//! # Services
//!
//! - `staleness` - live estimate vs. settled close
//! - `income` - rate, income and aggregate figures
//! - `RefreshService` - one error-contained refresh cycle
//! - `ListProjector` - snapshot to display rows
//! - `search_service` - search text interpretation and filtering
//! - `SelectionService` - holding-size edits from row selection

pub mod staleness;
pub mod income;
pub mod refresh_service;
pub mod list_service;
pub mod search_service;
pub mod selection_service;

// Re-export commonly used types and services
pub use income::{IncomeSummary, InstrumentIncome};
pub use refresh_service::{CycleReport, InstrumentOutcome, RefreshService};
pub use list_service::{ListProjector, ListSink};
pub use search_service::SearchIntent;
pub use selection_service::{SelectionOutcome, SelectionService};
