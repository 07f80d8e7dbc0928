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

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use pagecache_common::code::{Key, Value};

use crate::record::Record;

/// Eviction algorithm of a shard.
///
/// Every method is called with the write lock of the shard held. Records handed to [`Eviction::push`] are owned by
/// the eviction container until they are returned by [`Eviction::pop`], [`Eviction::pop_stale`] or
/// [`Eviction::clear`], or unlinked by [`Eviction::remove`].
pub trait Eviction: Send + Sync + 'static + Sized {
    /// Cache key. Generally, it is supposed to be a generic type of the implementation.
    type Key: Key;
    /// Cache value. Generally, it is supposed to be a generic type of the implementation.
    type Value: Value;
    /// Cache eviction algorithm state carried by each record.
    type State: Default + Send + Sync + 'static;

    /// Create a new empty cache eviction algorithm instance.
    fn new() -> Self;

    /// Push a record into the cache eviction algorithm instance.
    ///
    /// The caller guarantees that the record is NOT in the cache eviction algorithm instance.
    ///
    /// The cache eviction algorithm instance MUST hold the record and set its `IN_EVICTION` flag to true.
    fn push(&mut self, record: Arc<Record<Self>>);

    /// Pop the next evictable record.
    ///
    /// Referenced records are never popped. The popped record has its `IN_EVICTION` flag set to false.
    fn pop(&mut self) -> Option<Arc<Record<Self>>>;

    /// Pop an evictable record that has not been visited for at least `stale`.
    fn pop_stale(&mut self, now: Instant, stale: Duration) -> Option<Arc<Record<Self>>>;

    /// Unlink the given record, whether it is referenced or not.
    ///
    /// The caller guarantees that the record is in the cache eviction algorithm instance.
    fn remove(&mut self, record: &Arc<Record<Self>>);

    /// Unlink and return every record, referenced ones included.
    fn clear(&mut self) -> Vec<Arc<Record<Self>>>;

    /// Called whenever a reference to a record is taken. Referenced records must not be evictable.
    fn acquire(&mut self, record: &Arc<Record<Self>>);

    /// Called when the last reference to a record is released.
    fn release(&mut self, record: &Arc<Record<Self>>);

    /// Count of the records held, referenced ones included.
    fn len(&self) -> usize;

    /// Returns `true` if no record is held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// LRU eviction with a durable tier and a pinned list for referenced records.
pub mod lru;
