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

//! Process wide page cache.
//!
//! Components should get the cache passed in as an `Arc<StoragePageCache>`. The global instance serves code paths
//! that cannot be wired that way.

use std::sync::{Arc, OnceLock};

use pagecache_common::error::{Error, ErrorKind, Result};

use crate::{cache::StoragePageCache, config::StoragePageCacheConfig};

static GLOBAL: OnceLock<Arc<StoragePageCache>> = OnceLock::new();

/// Create the global page cache. Succeeds at most once per process.
pub fn create_global_cache(config: &StoragePageCacheConfig) -> Result<Arc<StoragePageCache>> {
    if GLOBAL.get().is_some() {
        return Err(already_initialized());
    }
    let cache = Arc::new(StoragePageCache::try_from(config)?);
    GLOBAL.set(cache.clone()).map_err(|_| already_initialized())?;
    tracing::info!("[page cache]: global storage page cache initialized");
    Ok(cache)
}

/// The global page cache.
pub fn instance() -> Result<Arc<StoragePageCache>> {
    GLOBAL
        .get()
        .cloned()
        .ok_or_else(|| Error::new(ErrorKind::Uninitialized, "global storage page cache is not created"))
}

fn already_initialized() -> Error {
    Error::new(ErrorKind::AlreadyInitialized, "global storage page cache is already created")
}
