//! Scheduler module
//!
//! Drives the periodic valuation refresh. The loop is self-rescheduling:
//! one cycle, then one continuation timer, never a fixed-rate ticker.

mod refresh;

pub use refresh::{CycleRunner, RefreshScheduler};
