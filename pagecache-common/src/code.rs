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

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use twox_hash::XxHash64;

/// Key trait for the in-memory cache.
pub trait Key: Send + Sync + 'static + Hash + Eq {}
/// Value trait for the in-memory cache.
pub trait Value: Send + Sync + 'static {}

impl<T: Send + Sync + 'static + Hash + Eq> Key for T {}
impl<T: Send + Sync + 'static> Value for T {}

/// Hash builder trait.
pub trait HashBuilder: BuildHasher + Send + Sync + 'static {}
impl<T> HashBuilder for T where T: BuildHasher + Send + Sync + 'static {}

/// The default hasher for the cache key.
///
/// XxHash64 keeps the distribution of encoded page keys uniform across shards even though they share long file name
/// prefixes.
pub type DefaultHasher = BuildHasherDefault<XxHash64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hasher_is_stable() {
        let hasher = DefaultHasher::default();
        let a = hasher.hash_one(b"segment_0.dat".as_slice());
        let b = hasher.hash_one(b"segment_0.dat".as_slice());
        let c = hasher.hash_one(b"segment_1.dat".as_slice());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
