//! Session cache for indicator records and child geometry.
//!
//! Entries are only ever added. Concurrent lookups of one key share a single in-flight fetch, and a
//! failed fetch leaves no entry behind so the next lookup retries.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use tracing::{debug, warn};

use choropleth_shared::{DataRecord, GeometryPayload, RecordKey};

use crate::error::FetchError;
use crate::source::DataSource;

type SharedFetch<T> = Shared<LocalBoxFuture<'static, Result<Rc<T>, FetchError>>>;

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: Cell<u64>,
    misses: Cell<u64>,
    joined_in_flight: Cell<u64>,
    failures: Cell<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    /// Lookups that started a network fetch.
    pub misses: u64,
    /// Lookups that attached to a fetch already in flight.
    pub joined_in_flight: u64,
    pub failures: u64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.get(),
            misses: self.misses.get(),
            joined_in_flight: self.joined_in_flight.get(),
            failures: self.failures.get(),
        }
    }

    fn bump(counter: &Cell<u64>) {
        counter.set(counter.get().saturating_add(1));
    }
}

struct KeyedStore<K, T> {
    ready: RefCell<HashMap<K, Rc<T>>>,
    in_flight: RefCell<HashMap<K, SharedFetch<T>>>,
}

impl<K, T> Default for KeyedStore<K, T> {
    fn default() -> Self {
        Self {
            ready: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashMap::new()),
        }
    }
}

impl<K, T> KeyedStore<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Display,
{
    fn peek(&self, key: &K) -> Option<Rc<T>> {
        self.ready.borrow().get(key).cloned()
    }

    async fn get_or_fetch<F>(&self, key: &K, stats: &CacheStats, start: F) -> Result<Rc<T>, FetchError>
    where
        F: FnOnce() -> LocalBoxFuture<'static, Result<Rc<T>, FetchError>>,
    {
        if let Some(hit) = self.peek(key) {
            CacheStats::bump(&stats.hits);
            debug!(%key, "cache hit");
            return Ok(hit);
        }

        let fetch = {
            let mut in_flight = self.in_flight.borrow_mut();
            match in_flight.get(key) {
                Some(pending) => {
                    CacheStats::bump(&stats.joined_in_flight);
                    debug!(%key, "joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    CacheStats::bump(&stats.misses);
                    debug!(%key, "cache miss, fetching");
                    let pending = start().shared();
                    in_flight.insert(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = fetch.clone().await;
        self.complete(key, &fetch, &result, stats);
        result
    }

    /// Every waiter runs this; only the first to see the finished fetch retires it.
    fn complete(
        &self,
        key: &K,
        fetch: &SharedFetch<T>,
        result: &Result<Rc<T>, FetchError>,
        stats: &CacheStats,
    ) {
        let retired = {
            let mut in_flight = self.in_flight.borrow_mut();
            match in_flight.get(key) {
                Some(current) if current.ptr_eq(fetch) => {
                    in_flight.remove(key);
                    true
                }
                _ => false,
            }
        };
        if !retired {
            return;
        }

        match result {
            Ok(value) => {
                self.ready
                    .borrow_mut()
                    .entry(key.clone())
                    .or_insert_with(|| Rc::clone(value));
            }
            Err(error) => {
                CacheStats::bump(&stats.failures);
                warn!(%key, %error, "fetch failed, nothing cached");
            }
        }
    }
}

/// Records keyed by (period, region, indicator) and geometry keyed by region slug.
pub struct DataCache<S> {
    source: Rc<S>,
    records: KeyedStore<RecordKey, DataRecord>,
    geometry: KeyedStore<String, GeometryPayload>,
    stats: CacheStats,
}

impl<S> DataCache<S>
where
    S: DataSource + 'static,
{
    pub fn new(source: Rc<S>) -> Self {
        Self {
            source,
            records: KeyedStore::default(),
            geometry: KeyedStore::default(),
            stats: CacheStats::default(),
        }
    }

    pub fn source(&self) -> &Rc<S> {
        &self.source
    }

    pub async fn get_record(&self, key: &RecordKey) -> Result<Rc<DataRecord>, FetchError> {
        self.records
            .get_or_fetch(key, &self.stats, || {
                let source = Rc::clone(&self.source);
                let key = key.clone();
                async move { source.fetch_record(&key).await.map(Rc::new) }.boxed_local()
            })
            .await
    }

    /// Geometry of all children of `region`.
    pub async fn get_child_geometry(&self, region: &str) -> Result<Rc<GeometryPayload>, FetchError> {
        let key = region.to_string();
        self.geometry
            .get_or_fetch(&key, &self.stats, || {
                let source = Rc::clone(&self.source);
                let region = key.clone();
                async move { source.fetch_geometry(&region).await.map(Rc::new) }.boxed_local()
            })
            .await
    }

    pub fn cached_record(&self, key: &RecordKey) -> Option<Rc<DataRecord>> {
        self.records.peek(key)
    }

    pub fn cached_geometry(&self, region: &str) -> Option<Rc<GeometryPayload>> {
        self.geometry.peek(&region.to_string())
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
