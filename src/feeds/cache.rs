use crate::errors::{AnalyticsError, EngineResult};
use crate::feeds::snapshot::MarketSnapshot;
use crate::feeds::SnapshotProvider;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// TTL cache in front of any provider. Only successful fetches are stored.
/// The lock is never held across an await.
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, MarketSnapshot)>>,
}

impl<P: SnapshotProvider> CachedProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, ticker: &str) -> EngineResult<Option<MarketSnapshot>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| AnalyticsError::Unavailable(format!("cache lock poisoned: {e}")))?;
        Ok(entries
            .get(ticker)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, snap)| snap.clone()))
    }

    fn store(&self, ticker: &str, snapshot: &MarketSnapshot) -> EngineResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AnalyticsError::Unavailable(format!("cache lock poisoned: {e}")))?;
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        entries.insert(ticker.to_string(), (Instant::now(), snapshot.clone()));
        Ok(())
    }
}

impl<P: SnapshotProvider> SnapshotProvider for CachedProvider<P> {
    async fn fetch(&self, ticker: &str) -> EngineResult<MarketSnapshot> {
        if let Some(hit) = self.lookup(ticker)? {
            tracing::debug!(ticker = %ticker, "snapshot cache hit");
            return Ok(hit);
        }
        let snapshot = self.inner.fetch(ticker).await?;
        self.store(ticker, &snapshot)?;
        Ok(snapshot)
    }
}
