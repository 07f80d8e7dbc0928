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

use hashbrown::HashMap;

use crate::slab::{SlabList, Token};

/// Recently rejected keys of a full shard, used for LRU-K admission.
///
/// A key that misses a full shard is remembered by its hash instead of being admitted. Inserting the same key again
/// while it is still remembered admits it. The charges of the remembered keys are bounded by the shard capacity and
/// the oldest ones are forgotten first.
#[derive(Debug, Default)]
pub struct Visits {
    list: SlabList<(u64, usize)>,
    index: HashMap<u64, Token>,
    usage: usize,
}

impl Visits {
    /// Record a visit of the key with the given hash and charge.
    ///
    /// Returns `true` if the key was already remembered, in which case it is forgotten and should be admitted.
    pub fn visit(&mut self, hash: u64, charge: usize, capacity: usize) -> bool {
        if let Some(token) = self.index.remove(&hash) {
            if let Some((_, c)) = self.list.remove(token) {
                self.usage -= c;
            }
            return true;
        }

        if charge > capacity {
            return false;
        }

        while self.usage + charge > capacity {
            match self.list.pop_front() {
                Some((h, c)) => {
                    self.index.remove(&h);
                    self.usage -= c;
                }
                None => break,
            }
        }

        let token = self.list.push_back((hash, charge));
        self.index.insert(hash, token);
        self.usage += charge;
        false
    }

    /// Total charge of the remembered keys.
    pub fn usage(&self) -> usize {
        self.usage
    }

    /// Count of the remembered keys.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if no key is remembered.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Forget every key.
    pub fn clear(&mut self) {
        self.list.drain();
        self.index.clear();
        self.usage = 0;
    }
}
