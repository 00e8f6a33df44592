use crate::advisor::Advisor;
use crate::config::AppConfig;
use crate::feeds::cache::CachedProvider;
use crate::feeds::file::JsonFileProvider;
use crate::feeds::retry::{RetryPolicy, RetryingProvider};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Provider stack used by the server: file reads, retried, then cached.
pub type DefaultProvider = CachedProvider<RetryingProvider<JsonFileProvider>>;

// ── Performance Counters (lock-free) ──

#[derive(Debug, Default)]
pub struct PerfCounters {
    pub requests_received: AtomicU64,
    pub analyses_completed: AtomicU64,
    pub sentinel_reports: AtomicU64,
    pub unavailable_reports: AtomicU64,
    pub requests_rejected: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            sentinel_reports: self.sentinel_reports.load(Ordering::Relaxed),
            unavailable_reports: self.unavailable_reports.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CounterSnapshot {
    pub requests_received: u64,
    pub analyses_completed: u64,
    pub sentinel_reports: u64,
    pub unavailable_reports: u64,
    pub requests_rejected: u64,
}

// ── Application shared state (immutable config, atomics, no locks) ──

pub struct AppState {
    pub config: AppConfig,
    pub advisor: Arc<Advisor>,
    pub provider: DefaultProvider,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let provider = CachedProvider::new(
            RetryingProvider::new(
                JsonFileProvider::new(config.data_dir.clone()),
                RetryPolicy::new(&config.retry),
            ),
            config.cache_ttl,
        );
        Arc::new(Self {
            advisor: Arc::new(Advisor::new(&config.analytics)),
            provider,
            counters: PerfCounters::new(),
            config,
        })
    }
}
