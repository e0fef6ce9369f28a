//! Valuation sources

pub mod fundgz;

use crate::error::Result;
use crate::models::Valuation;
use async_trait::async_trait;

pub use fundgz::FundGzClient;

/// Remote source of per-instrument valuations
#[async_trait]
pub trait ValuationSource: Send + Sync {
    /// Source ID used in logs
    fn id(&self) -> &'static str;

    /// Fetch the current valuation of one instrument.
    ///
    /// Failures are scoped to the instrument and reported as
    /// [`AppError::Fetch`](crate::error::AppError::Fetch) or a transport error.
    async fn fetch_valuation(&self, instrument_id: &str) -> Result<Valuation>;
}
