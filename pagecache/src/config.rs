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

use std::time::Duration;

use pagecache_common::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration of [`crate::StoragePageCache`].
///
/// Every field has a default, so a partial document deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoragePageCacheConfig {
    /// Total byte budget shared by the data page and the index page domains.
    pub capacity: usize,
    /// Share of `capacity` given to the index page domain, in percent.
    pub index_cache_percentage: u32,
    /// Byte budget of the primary key index page domain.
    pub pk_index_cache_capacity: usize,
    /// Shard count of each domain.
    pub shards: usize,
    /// Idle time after which an unreferenced data page is swept, in seconds.
    pub data_page_cache_stale_sweep_time_sec: u64,
    /// Idle time after which an unreferenced index page is swept, in seconds.
    pub index_page_cache_stale_sweep_time_sec: u64,
    /// Idle time after which an unreferenced primary key index page is swept, in seconds.
    pub pk_index_page_cache_stale_sweep_time_sec: u64,
    /// Maximum entry count of each domain, `0` for unlimited.
    pub element_count_capacity: usize,
    /// Admit data pages on their second insert while the domain is full.
    pub data_page_lru_k: bool,
}

impl Default for StoragePageCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            index_cache_percentage: Self::DEFAULT_INDEX_CACHE_PERCENTAGE,
            pk_index_cache_capacity: 0,
            shards: Self::DEFAULT_SHARDS,
            data_page_cache_stale_sweep_time_sec: 300,
            index_page_cache_stale_sweep_time_sec: 600,
            pk_index_page_cache_stale_sweep_time_sec: 600,
            element_count_capacity: 0,
            data_page_lru_k: true,
        }
    }
}

impl StoragePageCacheConfig {
    /// Default shard count of each domain.
    pub const DEFAULT_SHARDS: usize = 16;
    /// Default share of the index page domain, in percent.
    pub const DEFAULT_INDEX_CACHE_PERCENTAGE: u32 = 10;

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.index_cache_percentage > 100 {
            return Err(Error::invalid_config(
                "index_cache_percentage",
                self.index_cache_percentage,
                "index cache percentage must be in 0..=100",
            ));
        }
        if self.shards == 0 {
            return Err(Error::invalid_config(
                "shards",
                self.shards,
                "shard count must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Byte budget of the index page domain.
    pub fn index_page_cache_capacity(&self) -> usize {
        (self.capacity as u128 * self.index_cache_percentage as u128 / 100) as usize
    }

    /// Byte budget of the data page domain, the part of `capacity` not given to index pages.
    pub fn data_page_cache_capacity(&self) -> usize {
        self.capacity - self.index_page_cache_capacity()
    }

    /// Sweep interval of the data page domain.
    pub fn data_page_cache_stale_sweep_time(&self) -> Duration {
        Duration::from_secs(self.data_page_cache_stale_sweep_time_sec)
    }

    /// Sweep interval of the index page domain.
    pub fn index_page_cache_stale_sweep_time(&self) -> Duration {
        Duration::from_secs(self.index_page_cache_stale_sweep_time_sec)
    }

    /// Sweep interval of the primary key index page domain.
    pub fn pk_index_page_cache_stale_sweep_time(&self) -> Duration {
        Duration::from_secs(self.pk_index_page_cache_stale_sweep_time_sec)
    }
}
