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
use hashbrown::hash_table::{Entry as HashTableEntry, HashTable};

use super::Indexer;
use crate::{eviction::Eviction, record::Record};

/// Indexer backed by a [`HashTable`] keyed by the precomputed record hash.
pub struct HashTableIndexer<E>
where
    E: Eviction,
{
    table: HashTable<Arc<Record<E>>>,
}

impl<E> Default for HashTableIndexer<E>
where
    E: Eviction,
{
    fn default() -> Self {
        Self {
            table: Default::default(),
        }
    }
}

impl<E> Indexer for HashTableIndexer<E>
where
    E: Eviction,
{
    type Eviction = E;

    fn insert(&mut self, record: Arc<Record<Self::Eviction>>) -> Option<Arc<Record<Self::Eviction>>> {
        match self
            .table
            .entry(record.hash(), |r| r.key() == record.key(), |r| r.hash())
        {
            HashTableEntry::Occupied(o) => Some(o.get().clone()),
            HashTableEntry::Vacant(v) => {
                v.insert(record);
                None
            }
        }
    }

    fn get<Q>(&self, hash: u64, key: &Q) -> Option<&Arc<Record<Self::Eviction>>>
    where
        Q: Hash + Equivalent<<Self::Eviction as Eviction>::Key> + ?Sized,
    {
        self.table.find(hash, |r| key.equivalent(r.key()))
    }

    fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<Arc<Record<Self::Eviction>>>
    where
        Q: Hash + Equivalent<<Self::Eviction as Eviction>::Key> + ?Sized,
    {
        match self.table.find_entry(hash, |r| key.equivalent(r.key())) {
            Ok(o) => Some(o.remove().0),
            Err(_) => None,
        }
    }

    fn drain(&mut self) -> impl Iterator<Item = Arc<Record<Self::Eviction>>> {
        self.table.drain()
    }

    fn len(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use pagecache_common::properties::Hint;

    use super::*;
    use crate::{eviction::lru::Lru, record::Data};

    fn record(key: u64, value: u64) -> Arc<Record<Lru<u64, u64>>> {
        Arc::new(Record::new(Data {
            key,
            value,
            hint: Hint::Normal,
            hash: key,
            weight: 1,
        }))
    }

    #[test]
    fn test_insert_keeps_resident() {
        let mut indexer = HashTableIndexer::default();
        assert!(indexer.insert(record(1, 1)).is_none());
        assert!(indexer.insert(record(2, 2)).is_none());

        let resident = indexer.insert(record(1, 100)).unwrap();
        assert_eq!(*resident.value(), 1);
        assert_eq!(*indexer.get(1, &1).unwrap().value(), 1);
        assert_eq!(indexer.len(), 2);
    }

    #[test]
    fn test_remove_and_drain() {
        let mut indexer = HashTableIndexer::default();
        (0..4).for_each(|i| assert!(indexer.insert(record(i, i)).is_none()));

        assert_eq!(*indexer.remove(2, &2).unwrap().key(), 2);
        assert!(indexer.remove(2, &2).is_none());
        assert!(indexer.get(2, &2).is_none());

        let keys = indexer.drain().map(|r| *r.key()).sorted().collect_vec();
        assert_eq!(keys, vec![0, 1, 3]);
        assert!(indexer.is_empty());
    }
}
