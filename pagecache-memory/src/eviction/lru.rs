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

use pagecache_common::{
    code::{Key, Value},
    properties::Hint,
    strict_assert,
};

use super::Eviction;
use crate::{
    record::Record,
    slab::{SlabList, Token},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Queue {
    #[default]
    Detached,
    Normal,
    Durable,
    Pinned,
}

/// Lru eviction algorithm state.
#[derive(Debug, Default)]
pub struct LruState {
    token: Option<Token>,
    queue: Queue,
    last_visit: Option<Instant>,
}

/// LRU eviction algorithm.
///
/// Unreferenced records are kept in two lists ordered by the time their last reference was released:
/// one for [`Hint::Normal`] records and one for [`Hint::Durable`] records. The durable list is only drained when the
/// normal list is empty. Referenced records are moved to a pin list and are never popped.
pub struct Lru<K, V>
where
    K: Key,
    V: Value,
{
    normal: SlabList<Arc<Record<Self>>>,
    durable: SlabList<Arc<Record<Self>>>,
    pinned: SlabList<Arc<Record<Self>>>,
}

impl<K, V> Lru<K, V>
where
    K: Key,
    V: Value,
{
    fn list(&mut self, queue: Queue) -> &mut SlabList<Arc<Record<Self>>> {
        match queue {
            Queue::Normal => &mut self.normal,
            Queue::Durable => &mut self.durable,
            Queue::Pinned => &mut self.pinned,
            Queue::Detached => unreachable!("detached records are not linked"),
        }
    }

    fn link(&mut self, record: Arc<Record<Self>>, queue: Queue) {
        let state = record.state().get();
        strict_assert!(unsafe { (*state).token.is_none() });
        // The list keeps the record alive, so the state pointer stays valid.
        let token = self.list(queue).push_back(record);
        unsafe {
            (*state).queue = queue;
            (*state).token = Some(token);
        }
    }

    fn unlink(&mut self, record: &Arc<Record<Self>>) -> Option<Arc<Record<Self>>> {
        let state = unsafe { &mut *record.state().get() };
        let token = state.token.take()?;
        let queue = std::mem::take(&mut state.queue);
        let r = self.list(queue).remove(token);
        strict_assert!(r.as_ref().is_some_and(|r| Arc::ptr_eq(r, record)));
        r
    }

    fn detach(record: &Arc<Record<Self>>) {
        let state = unsafe { &mut *record.state().get() };
        state.token = None;
        state.queue = Queue::Detached;
        record.set_in_eviction(false);
    }

    fn tier(record: &Record<Self>) -> Queue {
        match record.hint() {
            Hint::Normal => Queue::Normal,
            Hint::Durable => Queue::Durable,
        }
    }

    fn is_stale(record: &Record<Self>, now: Instant, stale: Duration) -> bool {
        let state = unsafe { &*record.state().get() };
        state
            .last_visit
            .is_some_and(|last| now.saturating_duration_since(last) >= stale)
    }
}

impl<K, V> Eviction for Lru<K, V>
where
    K: Key,
    V: Value,
{
    type Key = K;
    type Value = V;
    type State = LruState;

    fn new() -> Self {
        Self {
            normal: SlabList::new(),
            durable: SlabList::new(),
            pinned: SlabList::new(),
        }
    }

    fn push(&mut self, record: Arc<Record<Self>>) {
        strict_assert!(!record.is_in_eviction());

        record.set_in_eviction(true);
        let state = unsafe { &mut *record.state().get() };
        state.last_visit = Some(Instant::now());

        let queue = Self::tier(&record);
        self.link(record, queue);
    }

    fn pop(&mut self) -> Option<Arc<Record<Self>>> {
        let record = self.normal.pop_front().or_else(|| self.durable.pop_front())?;
        Self::detach(&record);
        Some(record)
    }

    fn pop_stale(&mut self, now: Instant, stale: Duration) -> Option<Arc<Record<Self>>> {
        // Both lists are ordered by the last visit, so only the fronts need to be checked.
        let list = if self.normal.front().is_some_and(|r| Self::is_stale(r, now, stale)) {
            &mut self.normal
        } else if self.durable.front().is_some_and(|r| Self::is_stale(r, now, stale)) {
            &mut self.durable
        } else {
            return None;
        };
        let record = list.pop_front()?;
        Self::detach(&record);
        Some(record)
    }

    fn remove(&mut self, record: &Arc<Record<Self>>) {
        strict_assert!(record.is_in_eviction());
        self.unlink(record);
        record.set_in_eviction(false);
    }

    fn clear(&mut self) -> Vec<Arc<Record<Self>>> {
        let mut records = self.normal.drain();
        records.append(&mut self.durable.drain());
        records.append(&mut self.pinned.drain());
        records.iter().for_each(Self::detach);
        records
    }

    fn acquire(&mut self, record: &Arc<Record<Self>>) {
        if !record.is_in_eviction() {
            return;
        }

        let state = unsafe { &*record.state().get() };
        if state.queue == Queue::Pinned {
            return;
        }

        // Pin the record by moving it to the pin list.
        if let Some(r) = self.unlink(record) {
            self.link(r, Queue::Pinned);
        }
    }

    fn release(&mut self, record: &Arc<Record<Self>>) {
        if !record.is_in_eviction() {
            return;
        }

        let state = unsafe { &mut *record.state().get() };
        if state.queue != Queue::Pinned {
            return;
        }
        state.last_visit = Some(Instant::now());

        // Unpin the record by moving it back to the tail of its tier.
        if let Some(r) = self.unlink(record) {
            let queue = Self::tier(&r);
            self.link(r, queue);
        }
    }

    fn len(&self) -> usize {
        self.normal.len() + self.durable.len() + self.pinned.len()
    }
}
