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

use std::fmt::Display;

use bytes::BufMut;

/// Identity of a cached page: the file it was read from and its offset in the file.
///
/// `file_size` tells apart a file that was removed and recreated under the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Path of the file.
    pub file_name: String,
    /// Size of the file.
    pub file_size: u64,
    /// Offset of the page in the file.
    pub offset: i64,
}

impl CacheKey {
    /// Width of the fixed size suffix of the encoded key.
    pub const SUFFIX_LEN: usize = std::mem::size_of::<u64>() + std::mem::size_of::<i64>();

    /// Create a cache key.
    pub fn new(file_name: impl Into<String>, file_size: u64, offset: i64) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            offset,
        }
    }

    /// Encode the key into the flat binary key of the underlying container.
    ///
    /// The name bytes are followed by the native endian `file_size` and `offset`. The numeric suffix has a fixed
    /// width, so different keys never encode to the same bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.file_name.len() + Self::SUFFIX_LEN);
        buf.put_slice(self.file_name.as_bytes());
        buf.put_u64_ne(self.file_size);
        buf.put_i64_ne(self.offset);
        buf
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.file_name, self.file_size, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let key = CacheKey::new("file_a", 4096, 0);
        let buf = key.encode();
        assert_eq!(buf.len(), "file_a".len() + CacheKey::SUFFIX_LEN);
        assert_eq!(&buf[..6], b"file_a");
        assert_eq!(&buf[6..14], &4096u64.to_ne_bytes());
        assert_eq!(&buf[14..], &0i64.to_ne_bytes());
    }

    #[test]
    fn test_encode_deterministic() {
        assert_eq!(
            CacheKey::new("segment_0.dat", 1 << 20, 512).encode(),
            CacheKey::new("segment_0.dat".to_string(), 1 << 20, 512).encode()
        );
    }

    #[test]
    fn test_encode_distinguishes_fields() {
        let keys = [
            CacheKey::new("a", 1, 0),
            CacheKey::new("a", 2, 0),
            CacheKey::new("a", 1, 1),
            CacheKey::new("b", 1, 0),
            CacheKey::new("", 1, 0),
            CacheKey::new("a", 1, -1),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a.encode(), b.encode(), "{a} and {b} must not collide");
            }
        }
    }

    #[test]
    fn test_long_name_not_truncated() {
        let name = "x".repeat(4096);
        let buf = CacheKey::new(name.clone(), 7, 9).encode();
        assert_eq!(&buf[..name.len()], name.as_bytes());
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheKey::new("file_a", 4096, 8).to_string(), "file_a:4096@8");
    }
}
