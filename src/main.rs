//! Fund Watch terminal host
//!
//! Usage: `fund-watch [FUND_CODE ...]`
//!
//! Adds any given fund codes to the watchlist, then prints the refreshed
//! list on every tick until Ctrl-C.

use anyhow::{Context, Result};
use fund_watch_lib::db::{RecordStore, SqliteStore};
use fund_watch_lib::error::ErrorResponse;
use fund_watch_lib::models::{DisplayRow, WatchedInstrument};
use fund_watch_lib::services::ListSink;
use fund_watch_lib::valuation::{FundGzClient, ValuationSource};
use fund_watch_lib::{SessionEvents, WatchConfig, WatchSession};
use std::sync::Arc;
use tracing::{info, warn};

/// Prints each list refresh to stdout
struct StdoutSink;

impl ListSink for StdoutSink {
    fn set_list(&self, rows: Vec<DisplayRow>) {
        println!("----");
        for row in rows {
            println!("[{:?}] {}\n        {}", row.icon_tone, row.title, row.description);
        }
    }

    fn notify(&self, message: &str) {
        eprintln!("! {}", message);
    }
}

/// Add a fund code to the watchlist, labelled with the feed's name
async fn add_instrument(store: &SqliteStore, source: &dyn ValuationSource, id: &str) -> Result<()> {
    if store.get(id)?.is_some() {
        info!("{} already watched", id);
        return Ok(());
    }

    let name = match source.fetch_valuation(id).await {
        Ok(valuation) => valuation.name.unwrap_or_else(|| id.to_string()),
        Err(e) => {
            let response = ErrorResponse::from(&e);
            warn!("Could not look up {}: {}", id, serde_json::to_string(&response)?);
            id.to_string()
        }
    };

    store.insert(&WatchedInstrument::new(id, name).into())?;
    info!("Now watching {}", id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = WatchConfig::from_env().context("Failed to load configuration")?;
    fund_watch_lib::init_tracing();

    info!("Starting Fund Watch...");

    let store = Arc::new(
        SqliteStore::new(&config.database_path)
            .with_context(|| format!("Failed to open {:?}", config.database_path))?,
    );
    let source = Arc::new(FundGzClient::new(
        &config.valuation_base_url,
        config.request_timeout,
    )?);

    for id in std::env::args().skip(1) {
        add_instrument(&store, source.as_ref(), &id).await?;
    }

    let session = WatchSession::new(config, store, source, Arc::new(StdoutSink));

    let events: SessionEvents = SessionEvents::new();
    events.on_session_end(|| info!("Watch session closed"));
    session.attach_lifecycle(&events);
    session.enter();

    tokio::signal::ctrl_c().await?;
    events.end_session();
    Ok(())
}
