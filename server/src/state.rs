use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::config::cors_allow_any;

#[derive(Clone)]
pub struct AppState {
    pub data_dir: Arc<PathBuf>,
    /// Validated payloads keyed by their path under `data_dir`. Entries are never evicted or replaced.
    pub payload_cache: Arc<DashMap<String, Bytes>>,
    pub started_at: DateTime<Utc>,
    pub cors_allow_any: bool,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    data_requests_total: AtomicU64,
    cache_hits_total: AtomicU64,
    cache_misses_total: AtomicU64,
    not_found_total: AtomicU64,
    bad_requests_total: AtomicU64,
    read_failures_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservabilitySnapshot {
    pub data_requests_total: u64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub not_found_total: u64,
    pub bad_requests_total: u64,
    pub read_failures_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            data_requests_total: self.data_requests_total.load(Ordering::Relaxed),
            cache_hits_total: self.cache_hits_total.load(Ordering::Relaxed),
            cache_misses_total: self.cache_misses_total.load(Ordering::Relaxed),
            not_found_total: self.not_found_total.load(Ordering::Relaxed),
            bad_requests_total: self.bad_requests_total.load(Ordering::Relaxed),
            read_failures_total: self.read_failures_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_data_request(&self) {
        self.data_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad_request(&self) {
        self.bad_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir: Arc::new(data_dir),
            payload_cache: Arc::new(DashMap::new()),
            started_at: Utc::now(),
            cors_allow_any: cors_allow_any(),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.data_dir.join("maps")
    }
}
