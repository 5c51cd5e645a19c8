//! LRU-cached catalog lookups.

use super::types::{CatalogError, Plan, PlanPhase, PriceList};
use super::Catalog;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Configuration for [`CachedCatalog`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogCacheConfig {
    /// Max cached lookups.
    /// Default: 1024
    pub capacity: usize,
}

impl Default for CatalogCacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Plan {
        name: String,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    },
    Phase {
        name: String,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    },
    PriceList {
        name: String,
        as_of: DateTime<Utc>,
    },
}

#[derive(Clone)]
enum Cached {
    Plan(Arc<Plan>),
    Phase(Arc<PlanPhase>),
    PriceList(Arc<PriceList>),
}

/// Wraps a catalog and memoizes successful lookups.
///
/// Failures are not cached, so a catalog that gains a version later is
/// picked up on the next lookup.
pub struct CachedCatalog<C> {
    inner: C,
    cache: Mutex<LruCache<CacheKey, Cached>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<C: Catalog> CachedCatalog<C> {
    pub fn new(inner: C, config: CatalogCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn lookup<T>(
        &self,
        key: CacheKey,
        unwrap: impl Fn(Cached) -> Option<T>,
        wrap: impl Fn(T) -> Cached,
        resolve: impl FnOnce() -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError>
    where
        T: Clone,
    {
        if let Some(hit) = self.cache.lock().get(&key).cloned().and_then(&unwrap) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = resolve()?;
        self.cache.lock().put(key, wrap(value.clone()));
        Ok(value)
    }
}

impl<C: Catalog> Catalog for CachedCatalog<C> {
    fn find_plan(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<Plan>, CatalogError> {
        let key = CacheKey::Plan {
            name: name.to_string(),
            as_of,
            align_start,
        };
        self.lookup(
            key,
            |c| match c {
                Cached::Plan(p) => Some(p),
                _ => None,
            },
            Cached::Plan,
            || self.inner.find_plan(name, as_of, align_start),
        )
    }

    fn find_phase(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<PlanPhase>, CatalogError> {
        let key = CacheKey::Phase {
            name: name.to_string(),
            as_of,
            align_start,
        };
        self.lookup(
            key,
            |c| match c {
                Cached::Phase(p) => Some(p),
                _ => None,
            },
            Cached::Phase,
            || self.inner.find_phase(name, as_of, align_start),
        )
    }

    fn find_price_list(&self, name: &str, as_of: DateTime<Utc>) -> Result<Arc<PriceList>, CatalogError> {
        let key = CacheKey::PriceList {
            name: name.to_string(),
            as_of,
        };
        self.lookup(
            key,
            |c| match c {
                Cached::PriceList(p) => Some(p),
                _ => None,
            },
            Cached::PriceList,
            || self.inner.find_price_list(name, as_of),
        )
    }
}
