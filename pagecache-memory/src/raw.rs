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
    fmt::Debug,
    hash::Hash,
    ops::Deref,
    sync::Arc,
    time::{Duration, Instant},
};

use equivalent::Equivalent;
use itertools::Itertools;
use pagecache_common::{
    code::HashBuilder,
    metrics::Metrics,
    properties::{Hint, Source},
    scope::Scope,
    strict_assert,
};
use parking_lot::RwLock;

use crate::{
    eviction::Eviction,
    indexer::{sentry::Sentry, Indexer},
    record::{Data, Record},
    visits::Visits,
};

/// The weighter for the in-memory cache.
///
/// The weighter is used to calculate the charge of the cache entry against the capacity.
pub trait Weighter<K, V>: Fn(&K, &V) -> usize + Send + Sync + 'static {}
impl<K, V, T> Weighter<K, V> for T where T: Fn(&K, &V) -> usize + Send + Sync + 'static {}

/// Entries removed by a prune pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneResult {
    /// Count of removed entries.
    pub count: usize,
    /// Total charge of removed entries.
    pub weight: usize,
}

impl std::ops::AddAssign for PruneResult {
    fn add_assign(&mut self, rhs: Self) {
        self.count += rhs.count;
        self.weight += rhs.weight;
    }
}

impl PruneResult {
    fn add(&mut self, record: &Record<impl Eviction>) {
        self.count += 1;
        self.weight += record.weight();
    }
}

/// Config of [`RawCache`].
pub struct RawCacheConfig<E, S>
where
    E: Eviction,
    S: HashBuilder,
{
    /// Total capacity, in the unit of the weighter.
    pub capacity: usize,
    /// Count of shards. Must be greater than zero.
    pub shards: usize,
    /// Maximum count of entries, `0` for unlimited.
    pub element_count_capacity: usize,
    /// Reject first-time keys while a shard is full, admit them on their second insert.
    pub lru_k: bool,
    /// Hash builder for the keys.
    pub hash_builder: S,
    /// Charge of each entry.
    pub weighter: Arc<dyn Weighter<E::Key, E::Value>>,
    /// Metrics of the cache.
    pub metrics: Arc<Metrics>,
}

struct RawCacheShard<E, I>
where
    E: Eviction,
    I: Indexer<Eviction = E>,
{
    eviction: E,
    indexer: Sentry<I>,
    /// Referenced records that were not admitted, shared by concurrent inserts of the same key.
    phantoms: I,
    visits: Visits,

    usage: usize,
    capacity: usize,
    element_count_capacity: usize,
    lru_k: bool,

    metrics: Arc<Metrics>,
}

impl<E, I> RawCacheShard<E, I>
where
    E: Eviction,
    I: Indexer<Eviction = E>,
{
    /// Count of entries to evict down to before `reserve` more entries are indexed.
    fn count_target(&self, reserve: usize) -> usize {
        match self.element_count_capacity {
            0 => usize::MAX,
            capacity => capacity.saturating_sub(reserve),
        }
    }

    fn is_overflow(&self) -> bool {
        self.usage > self.capacity || self.indexer.len() > self.count_target(0)
    }

    /// Evict unreferenced entries until both targets are met or nothing is evictable.
    fn evict(&mut self, usage_target: usize, count_target: usize, garbages: &mut Vec<Arc<Record<E>>>) {
        while self.usage > usage_target || self.indexer.len() > count_target {
            let evicted = match self.eviction.pop() {
                Some(evicted) => evicted,
                None => break,
            };
            self.metrics.memory_evict.increase(1);
            self.unindex(evicted, garbages);
        }
    }

    /// Remove a record that has just left the eviction container from the indexer.
    fn unindex(&mut self, record: Arc<Record<E>>, garbages: &mut Vec<Arc<Record<E>>>) {
        let indexed = self.indexer.remove(record.hash(), record.key());
        strict_assert!(indexed.as_ref().is_some_and(|r| Arc::ptr_eq(r, &record)));
        strict_assert!(!record.is_in_indexer());
        strict_assert!(!record.is_in_eviction());

        self.usage -= record.weight();
        self.metrics.memory_usage.decrease(record.weight() as _);

        garbages.push(record);
    }

    fn admit(&mut self, record: &Record<E>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.lru_k && self.usage + record.weight() > self.capacity {
            let admitted = self.visits.visit(record.hash(), record.weight(), self.capacity);
            tracing::trace!(
                "[raw]: lru-k admission of record (hash: {}) on full shard: {}",
                record.hash(),
                admitted
            );
            return admitted;
        }
        true
    }

    /// Insert the record unless the key is resident.
    ///
    /// Returns the record the new entry refers to, with its reference count already increased, and the source of it.
    fn emplace(&mut self, record: Arc<Record<E>>, garbages: &mut Vec<Arc<Record<E>>>) -> (Arc<Record<E>>, Source) {
        if let Some(resident) = self.indexer.get(record.hash(), record.key()).cloned() {
            // The first insert wins, the given value is dropped out of the lock.
            self.metrics.memory_duplicate.increase(1);
            resident.inc_refs(1);
            self.eviction.acquire(&resident);
            garbages.push(record);
            return (resident, Source::Memory);
        }

        if let Some(phantom) = self.phantoms.get(record.hash(), record.key()).cloned() {
            // A not admitted value of the key is still referenced, every insert refers to it.
            self.metrics.memory_duplicate.increase(1);
            garbages.push(record);
            if self.admit(&phantom) {
                let phantom = self.phantoms.remove(phantom.hash(), phantom.key());
                strict_assert!(phantom.is_some());
                if let Some(phantom) = phantom {
                    phantom.set_phantom(false);
                    self.index(&phantom, garbages);
                    return (phantom, Source::Memory);
                }
            }
            phantom.inc_refs(1);
            return (phantom, Source::Memory);
        }

        if !self.admit(&record) {
            self.metrics.memory_phantom.increase(1);
            record.set_phantom(true);
            record.inc_refs(1);
            let resident = self.phantoms.insert(record.clone());
            strict_assert!(resident.is_none());
            return (record, Source::Outer);
        }

        self.index(&record, garbages);
        (record, Source::Outer)
    }

    /// Index an admitted record and take a reference of it.
    fn index(&mut self, record: &Arc<Record<E>>, garbages: &mut Vec<Arc<Record<E>>>) {
        let weight = record.weight();

        // Evict overflow records.
        self.evict(self.capacity.saturating_sub(weight), self.count_target(1), garbages);

        let resident = self.indexer.insert(record.clone());
        strict_assert!(resident.is_none());
        strict_assert!(record.is_in_indexer());

        self.eviction.push(record.clone());
        strict_assert!(record.is_in_eviction());

        self.usage += weight;
        self.metrics.memory_insert.increase(1);
        self.metrics.memory_usage.increase(weight as _);

        // Increase the reference count within the lock section.
        record.inc_refs(1);
        self.eviction.acquire(record);
    }

    fn get<Q>(&mut self, hash: u64, key: &Q) -> Option<Arc<Record<E>>>
    where
        Q: Hash + Equivalent<E::Key> + ?Sized,
    {
        let record = match self.indexer.get(hash, key).cloned() {
            Some(record) => {
                self.metrics.memory_hit.increase(1);
                record
            }
            None => {
                self.metrics.memory_miss.increase(1);
                return None;
            }
        };

        strict_assert!(record.is_in_indexer());

        record.inc_refs(1);
        self.eviction.acquire(&record);

        Some(record)
    }

    fn remove<Q>(&mut self, hash: u64, key: &Q) -> Option<Arc<Record<E>>>
    where
        Q: Hash + Equivalent<E::Key> + ?Sized,
    {
        let record = self.indexer.remove(hash, key)?;

        if record.is_in_eviction() {
            self.eviction.remove(&record);
        }
        strict_assert!(!record.is_in_indexer());
        strict_assert!(!record.is_in_eviction());

        self.usage -= record.weight();

        self.metrics.memory_remove.increase(1);
        self.metrics.memory_usage.decrease(record.weight() as _);

        record.inc_refs(1);

        Some(record)
    }

    /// Called with the reference count observed as zero out of the lock.
    fn release(&mut self, record: &Arc<Record<E>>, garbages: &mut Vec<Arc<Record<E>>>) {
        // Another reference may have been taken before the lock is acquired.
        if record.refs() > 0 {
            return;
        }

        self.metrics.memory_release.increase(1);

        if record.is_phantom() {
            if self
                .phantoms
                .get(record.hash(), record.key())
                .is_some_and(|phantom| Arc::ptr_eq(phantom, record))
            {
                if let Some(phantom) = self.phantoms.remove(record.hash(), record.key()) {
                    garbages.push(phantom);
                }
            }
            return;
        }

        self.eviction.release(record);

        if self.is_overflow() {
            self.evict(self.capacity, self.count_target(0), garbages);
        }
    }

    fn prune_stale(&mut self, now: Instant, stale: Duration, garbages: &mut Vec<Arc<Record<E>>>) -> PruneResult {
        let mut res = PruneResult::default();
        while let Some(record) = self.eviction.pop_stale(now, stale) {
            res.add(&record);
            self.unindex(record, garbages);
        }
        self.metrics.memory_sweep.increase(res.count as _);
        res
    }

    fn prune_all(&mut self, garbages: &mut Vec<Arc<Record<E>>>) -> PruneResult {
        let mut res = PruneResult::default();
        while let Some(record) = self.eviction.pop() {
            res.add(&record);
            self.unindex(record, garbages);
        }
        self.metrics.memory_sweep.increase(res.count as _);
        res
    }

    fn clear(&mut self, garbages: &mut Vec<Arc<Record<E>>>) {
        let records = self.indexer.drain().collect_vec();
        self.eviction.clear();
        self.visits.clear();
        garbages.extend(self.phantoms.drain());

        self.metrics.memory_remove.increase(records.len() as _);
        self.metrics.memory_usage.decrease(self.usage as _);
        self.usage = 0;

        garbages.extend(records);
    }
}

struct RawCacheInner<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    shards: Vec<RwLock<RawCacheShard<E, I>>>,

    hash_builder: Arc<S>,
    weighter: Arc<dyn Weighter<E::Key, E::Value>>,

    metrics: Arc<Metrics>,
}

impl<E, S, I> RawCacheInner<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn clear(&self) {
        let mut garbages = vec![];

        self.shards
            .iter()
            .map(|shard| shard.write())
            .for_each(|mut shard| shard.clear(&mut garbages));

        // Do not deallocate data within the lock section.
        drop(garbages);
    }

    fn shard(&self, hash: u64) -> &RwLock<RawCacheShard<E, I>> {
        &self.shards[hash as usize % self.shards.len()]
    }
}

impl<E, S, I> Drop for RawCacheInner<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

/// A sharded, capacity bounded, reference counted in-memory cache.
///
/// Each shard is guarded by its own [`RwLock`]. Entries are charged by the weighter and evicted by the eviction
/// algorithm `E` once they are no longer referenced by any [`RawCacheEntry`].
pub struct RawCache<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    inner: Arc<RawCacheInner<E, S, I>>,
}

impl<E, S, I> Clone for RawCache<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E, S, I> Debug for RawCache<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCache")
            .field("shards", &self.shards())
            .field("capacity", &self.capacity())
            .field("usage", &self.usage())
            .finish()
    }
}

impl<E, S, I> RawCache<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    /// Create a new cache.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is zero.
    pub fn new(config: RawCacheConfig<E, S>) -> Self {
        assert!(config.shards > 0, "shards must be greater than zero.");

        let shards = (0..config.shards)
            .map(|index| RawCacheShard {
                eviction: E::new(),
                indexer: Sentry::default(),
                phantoms: I::default(),
                visits: Visits::default(),
                usage: 0,
                capacity: Self::shard_capacity_for(config.capacity, config.shards, index),
                element_count_capacity: match config.element_count_capacity {
                    0 => 0,
                    total => Self::shard_capacity_for(total, config.shards, index).max(1),
                },
                lru_k: config.lru_k,
                metrics: config.metrics.clone(),
            })
            .map(RwLock::new)
            .collect_vec();

        let inner = RawCacheInner {
            shards,
            hash_builder: Arc::new(config.hash_builder),
            weighter: config.weighter,
            metrics: config.metrics,
        };

        Self { inner: Arc::new(inner) }
    }

    /// Change the total capacity and evict the overflowed unreferenced entries.
    pub fn resize(&self, capacity: usize) {
        let shards = self.inner.shards.len();

        for (index, shard) in self.inner.shards.iter().enumerate() {
            let shard_capacity = Self::shard_capacity_for(capacity, shards, index);
            let mut garbages = vec![];
            shard.write().with(|mut shard| {
                shard.capacity = shard_capacity;
                let count_target = shard.count_target(0);
                shard.evict(shard_capacity, count_target, &mut garbages);
            });
            // Deallocate data out of the lock critical section.
            drop(garbages);
        }
    }

    /// Insert an entry with [`Hint::Normal`].
    pub fn insert(&self, key: E::Key, value: E::Value) -> RawCacheEntry<E, S, I> {
        self.insert_with_hint(key, value, Hint::Normal)
    }

    /// Insert an entry with the given hint.
    ///
    /// If an entry with the same key is resident, the given key and value are dropped and the returned entry refers
    /// to the resident one, with [`Source::Memory`]. If the entry is not admitted, the returned entry is a phantom
    /// that is not counted against the capacity and is freed when released.
    ///
    /// While a phantom is referenced, inserts of the same key refer to it with [`Source::Memory`] as well. If one of
    /// them is admitted, the phantom value is the one that gets cached.
    pub fn insert_with_hint(&self, key: E::Key, value: E::Value, hint: Hint) -> RawCacheEntry<E, S, I> {
        let hash = self.inner.hash_builder.hash_one(&key);
        let weight = (self.inner.weighter)(&key, &value);
        let record = Arc::new(Record::new(Data {
            key,
            value,
            hint,
            hash,
            weight,
        }));

        let mut garbages = vec![];

        let (record, source) = self
            .inner
            .shard(hash)
            .write()
            .with(|mut shard| shard.emplace(record, &mut garbages));

        // Deallocate data out of the lock critical section.
        drop(garbages);

        RawCacheEntry {
            inner: self.inner.clone(),
            record,
            source,
        }
    }

    /// Get the entry of the key and mark it as recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<RawCacheEntry<E, S, I>>
    where
        Q: Hash + Equivalent<E::Key> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);

        let record = self.inner.shard(hash).write().with(|mut shard| shard.get(hash, key))?;

        Some(RawCacheEntry {
            inner: self.inner.clone(),
            record,
            source: Source::Memory,
        })
    }

    /// Returns `true` if the key is resident. Does not touch the recency of the entry.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<E::Key> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);

        self.inner
            .shard(hash)
            .read()
            .with(|shard| shard.indexer.get(hash, key).is_some())
    }

    /// Remove the entry of the key from the cache.
    ///
    /// The returned entry keeps the value alive until it is dropped.
    pub fn remove<Q>(&self, key: &Q) -> Option<RawCacheEntry<E, S, I>>
    where
        Q: Hash + Equivalent<E::Key> + ?Sized,
    {
        let hash = self.inner.hash_builder.hash_one(key);

        let record = self
            .inner
            .shard(hash)
            .write()
            .with(|mut shard| shard.remove(hash, key))?;

        Some(RawCacheEntry {
            inner: self.inner.clone(),
            record,
            source: Source::Memory,
        })
    }

    /// Remove every unreferenced entry that has not been visited for at least `stale`.
    ///
    /// Returns the count and the total charge of the removed entries.
    pub fn prune_stale(&self, stale: Duration) -> PruneResult {
        let now = Instant::now();
        let mut res = PruneResult::default();
        for shard in self.inner.shards.iter() {
            let mut garbages = vec![];
            res += shard.write().prune_stale(now, stale, &mut garbages);
            // Deallocate data out of the lock critical section.
            drop(garbages);
        }
        tracing::debug!("[raw]: pruned {} stale entries, weight: {}", res.count, res.weight);
        res
    }

    /// Remove every unreferenced entry.
    ///
    /// Returns the count and the total charge of the removed entries.
    pub fn evict_all(&self) -> PruneResult {
        let mut res = PruneResult::default();
        for shard in self.inner.shards.iter() {
            let mut garbages = vec![];
            res += shard.write().prune_all(&mut garbages);
            // Deallocate data out of the lock critical section.
            drop(garbages);
        }
        tracing::debug!("[raw]: pruned {} entries, weight: {}", res.count, res.weight);
        res
    }

    /// Remove every entry from the cache. Referenced entries stay alive until their last reference is dropped.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Total capacity.
    pub fn capacity(&self) -> usize {
        self.inner.shards.iter().map(|shard| shard.read().capacity).sum()
    }

    /// Total charge of the resident entries.
    pub fn usage(&self) -> usize {
        self.inner.shards.iter().map(|shard| shard.read().usage).sum()
    }

    /// Count of the resident entries.
    pub fn count(&self) -> usize {
        self.inner.shards.iter().map(|shard| shard.read().indexer.len()).sum()
    }

    /// Metrics of the cache.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Hash builder of the cache.
    pub fn hash_builder(&self) -> &Arc<S> {
        &self.inner.hash_builder
    }

    /// Count of shards.
    pub fn shards(&self) -> usize {
        self.inner.shards.len()
    }

    fn shard_capacity_for(total: usize, shards: usize, index: usize) -> usize {
        let base = total / shards;
        let remainder = total % shards;
        base + usize::from(index < remainder)
    }
}

/// A reference to an entry of [`RawCache`].
///
/// The entry is not evictable while any reference to it is alive. Dropping the last reference makes it evictable
/// again, or frees it if it has already been removed from the cache or was never admitted.
pub struct RawCacheEntry<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    inner: Arc<RawCacheInner<E, S, I>>,
    record: Arc<Record<E>>,
    source: Source,
}

impl<E, S, I> Debug for RawCacheEntry<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCacheEntry")
            .field("record", &self.record)
            .field("source", &self.source)
            .finish()
    }
}

impl<E, S, I> Drop for RawCacheEntry<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn drop(&mut self) {
        if self.record.dec_refs(1) > 0 {
            return;
        }

        let mut garbages = vec![];
        self.inner
            .shard(self.record.hash())
            .write()
            .with(|mut shard| shard.release(&self.record, &mut garbages));
        // Deallocate data out of the lock critical section.
        drop(garbages);
    }
}

impl<E, S, I> Clone for RawCacheEntry<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    fn clone(&self) -> Self {
        self.record.inc_refs(1);
        Self {
            inner: self.inner.clone(),
            record: self.record.clone(),
            source: self.source,
        }
    }
}

impl<E, S, I> Deref for RawCacheEntry<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    type Target = E::Value;

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl<E, S, I> RawCacheEntry<E, S, I>
where
    E: Eviction,
    S: HashBuilder,
    I: Indexer<Eviction = E>,
{
    /// Hash of the key.
    pub fn hash(&self) -> u64 {
        self.record.hash()
    }

    /// Key of the entry.
    pub fn key(&self) -> &E::Key {
        self.record.key()
    }

    /// Value of the entry.
    pub fn value(&self) -> &E::Value {
        self.record.value()
    }

    /// Eviction hint of the entry.
    pub fn hint(&self) -> Hint {
        self.record.hint()
    }

    /// Charge of the entry.
    pub fn weight(&self) -> usize {
        self.record.weight()
    }

    /// Count of live references to the entry.
    pub fn refs(&self) -> usize {
        self.record.refs()
    }

    /// Returns `true` if the entry is no longer indexed by the cache.
    pub fn is_outdated(&self) -> bool {
        !self.record.is_in_indexer()
    }

    /// Returns `true` if the entry was never admitted into the cache.
    pub fn is_phantom(&self) -> bool {
        self.record.is_phantom()
    }

    /// [`Source::Outer`] if the entry holds the value given by the caller, [`Source::Memory`] otherwise.
    pub fn source(&self) -> Source {
        self.source
    }
}
