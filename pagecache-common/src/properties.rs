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

use serde::{Deserialize, Serialize};

/// Hint for the eviction algorithm to decide the priority of the specific entry.
///
/// Entries with [`Hint::Durable`] live in a separate tier of each shard and are only evicted after every
/// [`Hint::Normal`] entry of the same shard is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hint {
    /// The default hint.
    #[default]
    Normal,
    /// Suggest the entry is latency sensitive and should resist eviction.
    ///
    /// Used for pages of in-memory tables.
    Durable,
}

impl From<bool> for Hint {
    /// Map an `in_memory` flag to a hint.
    fn from(in_memory: bool) -> Self {
        if in_memory {
            Hint::Durable
        } else {
            Hint::Normal
        }
    }
}

/// Source of the cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// The cache entry holds the value given by the caller.
    Outer,
    /// The cache entry holds a value that was already resident in the cache.
    Memory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_from_in_memory() {
        assert_eq!(Hint::from(true), Hint::Durable);
        assert_eq!(Hint::from(false), Hint::Normal);
        assert_eq!(Hint::default(), Hint::Normal);
    }
}
