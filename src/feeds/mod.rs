pub mod cache;
pub mod file;
pub mod retry;
pub mod snapshot;

use crate::errors::EngineResult;
use crate::feeds::snapshot::MarketSnapshot;
use std::future::Future;

/// Source of market snapshots keyed by ticker.
///
/// `NotFound` means the source has nothing for the ticker, `Unavailable` or
/// `Io` that the source itself failed. Anything else means the data exists
/// but is malformed.
pub trait SnapshotProvider: Send + Sync {
    fn fetch(&self, ticker: &str) -> impl Future<Output = EngineResult<MarketSnapshot>> + Send;
}
