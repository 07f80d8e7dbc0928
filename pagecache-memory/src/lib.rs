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

//! The sharded in-memory container of pagecache.
//!
//! [`raw::RawCache`] splits its capacity over shards guarded by their own lock. Each shard indexes its records in a
//! hash table and orders the unreferenced ones with an eviction algorithm. Records are reference counted, a
//! referenced record is never evicted and its value is freed only after both the cache and every
//! [`raw::RawCacheEntry`] have let it go.

mod prelude;
pub use prelude::*;

/// Eviction algorithms.
pub mod eviction;
/// Key to record indexers.
pub mod indexer;
/// The sharded cache and its entries.
pub mod raw;
/// Cached records.
pub mod record;
/// Token addressed slab storage and lists.
pub mod slab;
/// LRU-K admission history.
pub mod visits;
