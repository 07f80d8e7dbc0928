// Copyright 2026 pagecache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, sync::Arc, time::Duration};

use pagecache_common::{code::DefaultHasher, mem_tracker::MemTracker, metrics::Metrics, properties::Hint};
use pagecache_memory::{HashTableIndexer, Lru, PruneResult, RawCache, RawCacheConfig, RawCacheEntry};

use crate::page::Page;

type PageEviction = Lru<Vec<u8>, Page>;

type PageRawCache = RawCache<PageEviction, DefaultHasher, HashTableIndexer<PageEviction>>;

/// A reference to a page cached by a [`PageCachePolicy`].
pub type PageCacheEntry = RawCacheEntry<PageEviction, DefaultHasher, HashTableIndexer<PageEviction>>;

/// Identity of a cache domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheType {
    /// Column data pages.
    DataPageCache,
    /// Secondary index pages.
    IndexPageCache,
    /// Primary key index pages.
    PkIndexPageCache,
}

impl CacheType {
    /// Name of the domain, used as the metrics and memory tracker label.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::DataPageCache => "DataPageCache",
            CacheType::IndexPageCache => "IndexPageCache",
            CacheType::PkIndexPageCache => "PKIndexPageCache",
        }
    }
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an entry is charged against the capacity of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LruCacheType {
    /// Charge the page size in bytes.
    #[default]
    Size,
    /// Charge one per page.
    Number,
}

/// Config of a [`PageCachePolicy`].
#[derive(Debug)]
pub struct PolicyConfig {
    /// Identity of the domain.
    pub cache_type: CacheType,
    /// Total budget of the domain.
    pub capacity: usize,
    /// Count of shards.
    pub shards: usize,
    /// Idle time after which an unreferenced entry is swept.
    pub stale_sweep_time: Duration,
    /// Charge mode.
    pub lru_cache_type: LruCacheType,
    /// Maximum entry count, `0` for unlimited.
    pub element_count_capacity: usize,
    /// LRU-K admission.
    pub lru_k: bool,
    /// Metrics of the domain.
    pub metrics: Arc<Metrics>,
}

struct PageCachePolicyInner {
    cache_type: CacheType,
    raw: PageRawCache,
    mem_tracker: Arc<MemTracker>,
    stale_sweep_time: Duration,
    lru_cache_type: LruCacheType,
}

/// One page cache domain: a sharded LRU cache with its own budget, memory tracker and sweep interval.
///
/// Cloning a policy is cheap and the clones share the same cache.
#[derive(Clone)]
pub struct PageCachePolicy {
    inner: Arc<PageCachePolicyInner>,
}

impl Debug for PageCachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCachePolicy")
            .field("cache_type", &self.inner.cache_type)
            .field("raw", &self.inner.raw)
            .field("mem_tracker", &self.inner.mem_tracker)
            .field("stale_sweep_time", &self.inner.stale_sweep_time)
            .finish()
    }
}

impl PageCachePolicy {
    /// Create a domain.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is zero.
    pub fn new(config: PolicyConfig) -> Self {
        let raw = RawCache::new(RawCacheConfig {
            capacity: config.capacity,
            shards: config.shards,
            element_count_capacity: config.element_count_capacity,
            lru_k: config.lru_k,
            hash_builder: DefaultHasher::default(),
            weighter: match config.lru_cache_type {
                LruCacheType::Size => Arc::new(|_: &Vec<u8>, page: &Page| page.size()),
                LruCacheType::Number => Arc::new(|_: &Vec<u8>, _: &Page| 1),
            },
            metrics: config.metrics,
        });

        tracing::info!(
            "[page cache]: create {} with capacity: {}, shards: {}, stale sweep time: {:?}, lru-k: {}",
            config.cache_type,
            config.capacity,
            config.shards,
            config.stale_sweep_time,
            config.lru_k,
        );

        let inner = PageCachePolicyInner {
            cache_type: config.cache_type,
            raw,
            mem_tracker: Arc::new(MemTracker::new(config.cache_type.as_str())),
            stale_sweep_time: config.stale_sweep_time,
            lru_cache_type: config.lru_cache_type,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Look up a page by its encoded key.
    pub fn lookup(&self, key: &[u8]) -> Option<PageCacheEntry> {
        self.inner.raw.get(key)
    }

    /// Insert a page by its encoded key.
    ///
    /// If the key is resident the given page is dropped and the entry refers to the resident page.
    pub fn insert(&self, key: Vec<u8>, page: Page, hint: Hint) -> PageCacheEntry {
        self.inner.raw.insert_with_hint(key, page, hint)
    }

    /// Release a reference. Equivalent to dropping it.
    pub fn release(&self, entry: PageCacheEntry) {
        drop(entry);
    }

    /// Remove the page of the key. Readers holding it keep it alive.
    ///
    /// Returns `true` if the key was resident.
    pub fn erase(&self, key: &[u8]) -> bool {
        self.inner.raw.remove(key).is_some()
    }

    /// Remove the unreferenced pages idle for longer than the sweep interval.
    pub fn prune_stale(&self) -> PruneResult {
        let res = self.inner.raw.prune_stale(self.inner.stale_sweep_time);
        tracing::debug!(
            "[page cache]: {} pruned {} stale pages, {} bytes",
            self.inner.cache_type,
            res.count,
            res.weight
        );
        res
    }

    /// Remove every unreferenced page.
    pub fn prune_all(&self) -> PruneResult {
        let res = self.inner.raw.evict_all();
        tracing::debug!(
            "[page cache]: {} pruned all {} pages, {} bytes",
            self.inner.cache_type,
            res.count,
            res.weight
        );
        res
    }

    /// Change the budget of the domain.
    pub fn resize(&self, capacity: usize) {
        tracing::info!("[page cache]: resize {} to {}", self.inner.cache_type, capacity);
        self.inner.raw.resize(capacity);
    }

    /// Charge of the resident pages.
    pub fn usage(&self) -> usize {
        self.inner.raw.usage()
    }

    /// Budget of the domain.
    pub fn capacity(&self) -> usize {
        self.inner.raw.capacity()
    }

    /// Count of the resident pages.
    pub fn element_count(&self) -> usize {
        self.inner.raw.count()
    }

    /// Memory tracker the pages of this domain are accounted to.
    pub fn mem_tracker(&self) -> &Arc<MemTracker> {
        &self.inner.mem_tracker
    }

    /// Identity of the domain.
    pub fn cache_type(&self) -> CacheType {
        self.inner.cache_type
    }

    /// Idle time after which an unreferenced page is swept.
    pub fn stale_sweep_time(&self) -> Duration {
        self.inner.stale_sweep_time
    }

    /// Charge mode.
    pub fn lru_cache_type(&self) -> LruCacheType {
        self.inner.lru_cache_type
    }

    /// Count of shards.
    pub fn shards(&self) -> usize {
        self.inner.raw.shards()
    }

    /// Returns `true` if both are handles of the same domain.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
