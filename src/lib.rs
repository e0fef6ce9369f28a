//! Fund Watch - watch-listed fund valuation engine
//!
//! Keeps a user's watch-listed funds refreshed from a remote valuation
//! feed, derives today's income from holding sizes, and projects the
//! result into searchable list rows for a host UI.

pub mod config;
pub mod db;
pub mod valuation;
pub mod services;
pub mod scheduler;
pub mod lifecycle;
pub mod models;
pub mod error;
pub mod state;

pub use config::WatchConfig;
pub use error::{AppError, Result};
pub use lifecycle::{LifecycleInterceptor, SessionEvents};
pub use state::WatchSession;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
///
/// `RUST_LOG` selects the filter (default `fund_watch=debug`), and
/// `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fund_watch=debug,fund_watch_lib=debug".into());

    let json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
