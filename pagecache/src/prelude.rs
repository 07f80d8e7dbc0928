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

pub use pagecache_common::{
    error::{Error, ErrorKind, Result},
    mem_tracker::{MemTracker, MemTrackerGuard},
    metrics::{registry::noop::NoopMetricsRegistry, RegistryOps},
    properties::{Hint, Source},
};
#[cfg(feature = "prometheus")]
pub use pagecache_common::metrics::registry::prometheus::PrometheusMetricsRegistry;
pub use pagecache_memory::PruneResult;

pub use crate::{
    cache::{StoragePageCache, StoragePageCacheBuilder},
    config::StoragePageCacheConfig,
    global::{create_global_cache, instance},
    handle::PageCacheHandle,
    key::CacheKey,
    page::{DataPage, Page, PageType, SharedPage},
    policy::{CacheType, LruCacheType, PageCacheEntry, PageCachePolicy, PolicyConfig},
    sweeper::StaleSweeper,
};
