use crate::errors::EngineResult;
use crate::feeds::snapshot::MarketSnapshot;
use crate::feeds::SnapshotProvider;
use std::path::{Path, PathBuf};

/// Reads `<dir>/<TICKER>.json`. A missing file is `NotFound`.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    dir: PathBuf,
}

impl JsonFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.json"))
    }
}

impl SnapshotProvider for JsonFileProvider {
    async fn fetch(&self, ticker: &str) -> EngineResult<MarketSnapshot> {
        let path = self.path_for(ticker);
        let snapshot = read_snapshot(&path).await?;
        tracing::debug!(ticker = %ticker, path = %path.display(), "snapshot loaded");
        Ok(snapshot)
    }
}

/// Parse one snapshot file. Also used by the one-shot CLI mode.
pub async fn read_snapshot(path: &Path) -> EngineResult<MarketSnapshot> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
