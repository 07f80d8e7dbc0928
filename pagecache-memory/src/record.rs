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
    cell::UnsafeCell,
    fmt::Debug,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use bitflags::bitflags;
use pagecache_common::properties::Hint;

use crate::eviction::Eviction;

bitflags! {
    /// Atomic flags of a [`Record`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Flags: u64 {
        /// The record is indexed by the shard.
        const IN_INDEXER = 0b00000001;
        /// The record is linked in the eviction container of the shard.
        const IN_EVICTION = 0b00000010;
        /// The record was never admitted and is freed when its last reference is released.
        const PHANTOM = 0b00000100;
    }
}

/// The immutable payload of a [`Record`].
pub struct Data<E>
where
    E: Eviction,
{
    /// Key of the entry.
    pub key: E::Key,
    /// Value of the entry.
    pub value: E::Value,
    /// Eviction priority hint.
    pub hint: Hint,
    /// Hash of the key.
    pub hash: u64,
    /// Charge of the entry against the shard capacity.
    pub weight: usize,
}

/// [`Record`] holds the information of the cached entry.
///
/// The eviction state is only touched with the write lock of the owning shard held.
pub struct Record<E>
where
    E: Eviction,
{
    data: Data<E>,
    state: UnsafeCell<E::State>,
    refs: AtomicUsize,
    flags: AtomicU64,
}

unsafe impl<E> Send for Record<E> where E: Eviction {}
unsafe impl<E> Sync for Record<E> where E: Eviction {}

impl<E> Debug for Record<E>
where
    E: Eviction,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("hash", &self.data.hash)
            .field("weight", &self.data.weight)
            .field("hint", &self.data.hint)
            .field("refs", &self.refs())
            .finish()
    }
}

impl<E> Record<E>
where
    E: Eviction,
{
    /// Create a record with data.
    pub fn new(data: Data<E>) -> Self {
        Record {
            data,
            state: Default::default(),
            refs: AtomicUsize::new(0),
            flags: AtomicU64::new(0),
        }
    }

    /// Get the immutable reference of the record key.
    pub fn key(&self) -> &E::Key {
        &self.data.key
    }

    /// Get the immutable reference of the record value.
    pub fn value(&self) -> &E::Value {
        &self.data.value
    }

    /// Get the record hint.
    pub fn hint(&self) -> Hint {
        self.data.hint
    }

    /// Get the record hash.
    pub fn hash(&self) -> u64 {
        self.data.hash
    }

    /// Get the record weight.
    pub fn weight(&self) -> usize {
        self.data.weight
    }

    /// Get the record state wrapped with [`UnsafeCell`].
    ///
    /// # Safety
    ///
    /// The state must only be dereferenced with the write lock of the owning shard held.
    pub fn state(&self) -> &UnsafeCell<E::State> {
        &self.state
    }

    /// Set in eviction flag.
    pub fn set_in_eviction(&self, val: bool) {
        self.set_flags(Flags::IN_EVICTION, val, Ordering::Release);
    }

    /// Get in eviction flag.
    pub fn is_in_eviction(&self) -> bool {
        self.get_flags(Flags::IN_EVICTION, Ordering::Acquire)
    }

    /// Set in indexer flag.
    pub fn set_in_indexer(&self, val: bool) {
        self.set_flags(Flags::IN_INDEXER, val, Ordering::Release);
    }

    /// Get in indexer flag.
    pub fn is_in_indexer(&self) -> bool {
        self.get_flags(Flags::IN_INDEXER, Ordering::Acquire)
    }

    /// Set phantom flag.
    pub fn set_phantom(&self, val: bool) {
        self.set_flags(Flags::PHANTOM, val, Ordering::Release);
    }

    /// Get phantom flag.
    pub fn is_phantom(&self) -> bool {
        self.get_flags(Flags::PHANTOM, Ordering::Acquire)
    }

    /// Set the record atomic flags.
    pub fn set_flags(&self, flags: Flags, val: bool, order: Ordering) {
        match val {
            true => self.flags.fetch_or(flags.bits(), order),
            false => self.flags.fetch_and(!flags.bits(), order),
        };
    }

    /// Get the record atomic flags.
    pub fn get_flags(&self, flags: Flags, order: Ordering) -> bool {
        self.flags.load(order) & flags.bits() == flags.bits()
    }

    /// Get the atomic reference count.
    pub fn refs(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// Increase the atomic reference count.
    ///
    /// This function returns the new reference count after the op.
    pub fn inc_refs(&self, val: usize) -> usize {
        let old = self.refs.fetch_add(val, Ordering::SeqCst);
        tracing::trace!(
            "[record]: inc record (hash: {}) refs: {} => {}",
            self.hash(),
            old,
            old + val
        );
        old + val
    }

    /// Decrease the atomic reference count.
    ///
    /// This function returns the new reference count after the op.
    pub fn dec_refs(&self, val: usize) -> usize {
        let old = self.refs.fetch_sub(val, Ordering::SeqCst);
        tracing::trace!(
            "[record]: dec record (hash: {}) refs: {} => {}",
            self.hash(),
            old,
            old - val
        );
        old - val
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::lru::Lru;

    fn record(hint: Hint) -> Record<Lru<u64, u64>> {
        Record::new(Data {
            key: 1,
            value: 2,
            hint,
            hash: 1,
            weight: 3,
        })
    }

    #[test]
    fn test_record_flags() {
        let r = record(Hint::Durable);
        assert!(!r.is_in_indexer());
        assert!(!r.is_in_eviction());
        assert!(!r.is_phantom());

        r.set_in_indexer(true);
        r.set_in_eviction(true);
        assert!(r.is_in_indexer());
        assert!(r.is_in_eviction());
        assert!(!r.is_phantom());

        r.set_in_indexer(false);
        assert!(!r.is_in_indexer());
        assert!(r.is_in_eviction());

        r.set_phantom(true);
        assert!(r.is_phantom());
        assert_eq!(r.hint(), Hint::Durable);
        assert_eq!(r.weight(), 3);
    }

    #[test]
    fn test_record_refs() {
        let r = record(Hint::Normal);
        assert_eq!(r.inc_refs(2), 2);
        assert_eq!(r.inc_refs(1), 3);
        assert_eq!(r.dec_refs(3), 0);
        assert_eq!(r.refs(), 0);
    }
}
