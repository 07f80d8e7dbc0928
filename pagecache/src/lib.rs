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

//! A multi-domain page cache for a columnar storage engine.
//!
//! [`StoragePageCache`] keeps decoded data pages, index pages and primary key index pages in three independent
//! sharded LRU caches bounded by size. Callers look pages up by [`CacheKey`], insert pages they have read and decoded,
//! and read them through [`PageCacheHandle`]s. A page stays valid for as long as a handle refers to it, even if it
//! has been evicted meanwhile.
//!
//! ```
//! use pagecache::{CacheKey, PageType, StoragePageCacheBuilder};
//!
//! let cache = StoragePageCacheBuilder::new(64 << 20).build().unwrap();
//! let key = CacheKey::new("segment_0.dat", 4096, 0);
//!
//! let mut page = cache.new_data_page(5, true, PageType::DataPage);
//! page.data_mut().copy_from_slice(b"hello");
//! let handle = cache.insert(&key, page, PageType::DataPage, false);
//! assert!(handle.inserted());
//!
//! let handle = cache.lookup(&key, PageType::DataPage).unwrap();
//! assert_eq!(handle.data(), b"hello");
//! ```

mod prelude;
pub use prelude::*;

/// The page cache and its builder.
pub mod cache;
/// Configuration document.
pub mod config;
pub mod global;
/// Scoped references to cached pages.
pub mod handle;
/// Cache keys.
pub mod key;
/// Cached page values.
pub mod page;
/// A single page cache domain.
pub mod policy;
/// Background stale page sweeping.
pub mod sweeper;
