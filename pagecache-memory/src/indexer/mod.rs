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

use std::{hash::Hash, sync::Arc};

use equivalent::Equivalent;

use crate::{eviction::Eviction, record::Record};

/// Key to record index of a shard.
pub trait Indexer: Send + Sync + 'static + Default {
    /// The eviction algorithm the indexed records belong to.
    type Eviction: Eviction;

    /// Index the record if no record with the same key is indexed.
    ///
    /// Returns the resident record otherwise. The indexer is left untouched in that case.
    fn insert(&mut self, record: Arc<Record<Self::Eviction>>) -> Option<Arc<Record<Self::Eviction>>>;

    /// Get the indexed record of the key.
    fn get<Q>(&self, hash: u64, key: &Q) -> Option<&Arc<Record<Self::Eviction>>>
    where
        Q: Hash + Equivalent<<Self::Eviction as Eviction>::Key> + ?Sized;

    /// Remove the indexed record of the key.
    fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<Arc<Record<Self::Eviction>>>
    where
        Q: Hash + Equivalent<<Self::Eviction as Eviction>::Key> + ?Sized;

    /// Remove every indexed record.
    fn drain(&mut self) -> impl Iterator<Item = Arc<Record<Self::Eviction>>>;

    /// Count of indexed records.
    fn len(&self) -> usize;

    /// Returns `true` if no record is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`hashbrown::HashTable`] based indexer.
pub mod hash_table;
/// Flag maintaining wrapper of indexers.
pub mod sentry;
