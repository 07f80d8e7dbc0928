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

use std::{any::Any, sync::Arc, time::Duration};

use pagecache_common::{
    error::{Error, Result},
    mem_tracker::MemTracker,
    metrics::{registry::noop::NoopMetricsRegistry, BoxedRegistry, Metrics, RegistryOps},
    properties::Hint,
    strict_assert_eq,
};
use pagecache_memory::PruneResult;

use crate::{
    config::StoragePageCacheConfig,
    handle::PageCacheHandle,
    key::CacheKey,
    page::{DataPage, Page, PageType, SharedPage},
    policy::{CacheType, LruCacheType, PageCachePolicy, PolicyConfig},
    sweeper::StaleSweeper,
};

/// Page cache of the storage engine.
///
/// Data pages, index pages and primary key index pages are cached in three independent domains, each with its own
/// budget, memory tracker and sweep interval. Pages are looked up by [`CacheKey`] and handed out as
/// [`PageCacheHandle`]s that keep them alive while in use.
#[derive(Debug)]
pub struct StoragePageCache {
    data_page_cache: PageCachePolicy,
    index_page_cache: PageCachePolicy,
    pk_index_page_cache: PageCachePolicy,
}

impl StoragePageCache {
    /// Look up a page.
    pub fn lookup(&self, key: &CacheKey, page_type: PageType) -> Option<PageCacheHandle> {
        let cache = self.page_cache(page_type);
        cache
            .lookup(&key.encode())
            .map(|entry| PageCacheHandle::new(cache.clone(), entry))
    }

    /// Insert an owned buffer page.
    ///
    /// If another page is already cached for the key, `page` is dropped and the handle refers to the cached page,
    /// see [`PageCacheHandle::inserted`]. Pages inserted with `in_memory` are evicted only after the other pages of
    /// their shard.
    pub fn insert(&self, key: &CacheKey, page: DataPage, page_type: PageType, in_memory: bool) -> PageCacheHandle {
        strict_assert_eq!(page.page_type(), page_type);
        self.insert_page(key, page.into(), page_type, in_memory)
    }

    /// Insert a shared object charged with the caller estimated `size`.
    ///
    /// The size is accounted to the memory tracker of the domain.
    pub fn insert_shared<T>(
        &self,
        key: &CacheKey,
        data: Arc<T>,
        size: usize,
        page_type: PageType,
        in_memory: bool,
    ) -> PageCacheHandle
    where
        T: Any + Send + Sync,
    {
        let page = SharedPage::new(data, size, page_type, Some(self.mem_tracker(page_type)));
        self.insert_page(key, page.into(), page_type, in_memory)
    }

    fn insert_page(&self, key: &CacheKey, page: Page, page_type: PageType, in_memory: bool) -> PageCacheHandle {
        let cache = self.page_cache(page_type);
        let entry = cache.insert(key.encode(), page, Hint::from(in_memory));
        PageCacheHandle::new(cache.clone(), entry)
    }

    /// Allocate a zeroed page of `byte_count` bytes.
    ///
    /// With `use_cache` the allocation is accounted to the memory tracker of the domain of `page_type`, otherwise it
    /// is left to the caller.
    pub fn new_data_page(&self, byte_count: usize, use_cache: bool, page_type: PageType) -> DataPage {
        let tracker = use_cache.then(|| self.mem_tracker(page_type));
        DataPage::new(byte_count, page_type, tracker)
    }

    /// Remove the page of the key. Handles already given out stay valid.
    ///
    /// Returns `true` if the key was cached.
    pub fn erase(&self, key: &CacheKey, page_type: PageType) -> bool {
        self.page_cache(page_type).erase(&key.encode())
    }

    /// Remove the unreferenced pages idle for longer than the sweep interval of their domain.
    pub fn prune_stale(&self) -> PruneResult {
        self.policies().fold(PruneResult::default(), |mut res, cache| {
            res += cache.prune_stale();
            res
        })
    }

    /// Remove every unreferenced page of every domain.
    pub fn prune_all(&self) -> PruneResult {
        self.policies().fold(PruneResult::default(), |mut res, cache| {
            res += cache.prune_all();
            res
        })
    }

    /// Charge of the cached pages of the domain of `page_type`.
    pub fn usage(&self, page_type: PageType) -> usize {
        self.page_cache(page_type).usage()
    }

    /// Budget of the domain of `page_type`.
    pub fn capacity(&self, page_type: PageType) -> usize {
        self.page_cache(page_type).capacity()
    }

    /// Count of the cached pages of the domain of `page_type`.
    pub fn element_count(&self, page_type: PageType) -> usize {
        self.page_cache(page_type).element_count()
    }

    /// Memory tracker of the domain of `page_type`.
    pub fn mem_tracker(&self, page_type: PageType) -> &Arc<MemTracker> {
        self.page_cache(page_type).mem_tracker()
    }

    /// The domain that caches pages of `page_type`.
    pub fn page_cache(&self, page_type: PageType) -> &PageCachePolicy {
        match page_type {
            PageType::DataPage => &self.data_page_cache,
            PageType::IndexPage => &self.index_page_cache,
            PageType::PrimaryKeyIndexPage => &self.pk_index_page_cache,
        }
    }

    fn policies(&self) -> impl Iterator<Item = &PageCachePolicy> {
        PageType::ALL.into_iter().map(|page_type| self.page_cache(page_type))
    }

    /// Start a background thread that sweeps stale pages every `interval`.
    ///
    /// The thread stops when the returned [`StaleSweeper`] is dropped or the cache is gone.
    pub fn start_stale_sweeper(self: &Arc<Self>, interval: Duration) -> Result<StaleSweeper> {
        StaleSweeper::spawn(Arc::downgrade(self), interval)
    }
}

/// Builder of [`StoragePageCache`].
#[derive(Debug)]
pub struct StoragePageCacheBuilder {
    config: StoragePageCacheConfig,
    registry: BoxedRegistry,
}

impl StoragePageCacheBuilder {
    /// Start building a cache with `capacity` bytes shared by the data page and the index page domains.
    pub fn new(capacity: usize) -> Self {
        Self::from_config(&StoragePageCacheConfig {
            capacity,
            ..Default::default()
        })
    }

    /// Start building a cache from a configuration document.
    pub fn from_config(config: &StoragePageCacheConfig) -> Self {
        Self {
            config: config.clone(),
            registry: Box::new(NoopMetricsRegistry),
        }
    }

    /// Set the share of the capacity given to the index page domain, in percent.
    pub fn with_index_cache_percentage(mut self, percentage: u32) -> Self {
        self.config.index_cache_percentage = percentage;
        self
    }

    /// Set the byte budget of the primary key index page domain.
    pub fn with_pk_index_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.pk_index_cache_capacity = capacity;
        self
    }

    /// Set the shard count of each domain.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Set the sweep interval of the data page domain.
    pub fn with_data_page_cache_stale_sweep_time(mut self, stale: Duration) -> Self {
        self.config.data_page_cache_stale_sweep_time_sec = stale.as_secs();
        self
    }

    /// Set the sweep interval of the index page domain.
    pub fn with_index_page_cache_stale_sweep_time(mut self, stale: Duration) -> Self {
        self.config.index_page_cache_stale_sweep_time_sec = stale.as_secs();
        self
    }

    /// Set the sweep interval of the primary key index page domain.
    pub fn with_pk_index_page_cache_stale_sweep_time(mut self, stale: Duration) -> Self {
        self.config.pk_index_page_cache_stale_sweep_time_sec = stale.as_secs();
        self
    }

    /// Set the maximum entry count of each domain, `0` for unlimited.
    pub fn with_element_count_capacity(mut self, element_count_capacity: usize) -> Self {
        self.config.element_count_capacity = element_count_capacity;
        self
    }

    /// Enable or disable LRU-K admission of the data page domain.
    pub fn with_data_page_lru_k(mut self, lru_k: bool) -> Self {
        self.config.data_page_lru_k = lru_k;
        self
    }

    /// Set the metrics registry the domains report to.
    ///
    /// Default: [`NoopMetricsRegistry`].
    pub fn with_metrics_registry(mut self, registry: impl RegistryOps) -> Self {
        self.registry = Box::new(registry);
        self
    }

    /// Build the cache.
    pub fn build(self) -> Result<StoragePageCache> {
        self.config.validate()?;

        let config = &self.config;
        let policy = |cache_type: CacheType, capacity: usize, stale_sweep_time: Duration, lru_k: bool| {
            PageCachePolicy::new(PolicyConfig {
                cache_type,
                capacity,
                shards: config.shards,
                stale_sweep_time,
                lru_cache_type: LruCacheType::Size,
                element_count_capacity: config.element_count_capacity,
                lru_k,
                metrics: Arc::new(Metrics::new(cache_type.as_str(), &*self.registry)),
            })
        };

        let data_page_cache = policy(
            CacheType::DataPageCache,
            config.data_page_cache_capacity(),
            config.data_page_cache_stale_sweep_time(),
            config.data_page_lru_k,
        );
        let index_page_cache = policy(
            CacheType::IndexPageCache,
            config.index_page_cache_capacity(),
            config.index_page_cache_stale_sweep_time(),
            false,
        );
        let pk_index_page_cache = policy(
            CacheType::PkIndexPageCache,
            config.pk_index_cache_capacity,
            config.pk_index_page_cache_stale_sweep_time(),
            false,
        );

        tracing::info!(
            "[page cache]: storage page cache created, capacity: {}, index percentage: {}, pk index capacity: {}",
            config.capacity,
            config.index_cache_percentage,
            config.pk_index_cache_capacity,
        );

        Ok(StoragePageCache {
            data_page_cache,
            index_page_cache,
            pk_index_page_cache,
        })
    }
}

impl TryFrom<&StoragePageCacheConfig> for StoragePageCache {
    type Error = Error;

    fn try_from(config: &StoragePageCacheConfig) -> Result<Self> {
        StoragePageCacheBuilder::from_config(config).build()
    }
}
