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
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// A memory accounting scope.
///
/// Every cache domain owns one tracker. Page values add their allocation to the tracker when they are built and
/// subtract it again when they are dropped, so [`MemTracker::consumption`] reflects the bytes that are alive for the
/// domain, whether or not the cache still indexes them.
///
/// Values evicted or discarded by an insert are dropped after the shard lock is released, so the consumption may
/// briefly stay above the usage reported by the cache.
pub struct MemTracker {
    label: String,
    consumption: AtomicUsize,
    peak: AtomicUsize,
}

impl Debug for MemTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTracker")
            .field("label", &self.label)
            .field("consumption", &self.consumption())
            .field("peak", &self.peak_consumption())
            .finish()
    }
}

impl MemTracker {
    /// Create a tracker with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            consumption: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Label of the tracker.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bytes currently accounted.
    pub fn consumption(&self) -> usize {
        self.consumption.load(Ordering::Relaxed)
    }

    /// The highest consumption ever observed.
    pub fn peak_consumption(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Add `bytes` to the consumption.
    pub fn consume(&self, bytes: usize) {
        let current = self.consumption.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(current, Ordering::Relaxed);
    }

    /// Subtract `bytes` from the consumption.
    pub fn release(&self, bytes: usize) {
        let old = self.consumption.fetch_sub(bytes, Ordering::Relaxed);
        crate::strict_assert!(old >= bytes, "mem tracker {} released more than consumed", self.label);
    }

    /// Consume `bytes` and return a guard that releases them when dropped.
    pub fn track(self: &Arc<Self>, bytes: usize) -> MemTrackerGuard {
        self.consume(bytes);
        MemTrackerGuard {
            tracker: self.clone(),
            bytes,
        }
    }
}

/// Releases the tracked bytes from its [`MemTracker`] on drop.
#[derive(Debug)]
pub struct MemTrackerGuard {
    tracker: Arc<MemTracker>,
    bytes: usize,
}

impl MemTrackerGuard {
    /// The tracker the bytes are accounted to.
    pub fn tracker(&self) -> &Arc<MemTracker> {
        &self.tracker
    }

    /// Bytes held by the guard.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for MemTrackerGuard {
    fn drop(&mut self) {
        self.tracker.release(self.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_release() {
        let tracker = MemTracker::new("test");
        tracker.consume(100);
        tracker.consume(28);
        assert_eq!(tracker.consumption(), 128);
        tracker.release(100);
        assert_eq!(tracker.consumption(), 28);
        assert_eq!(tracker.peak_consumption(), 128);
        assert_eq!(tracker.label(), "test");
    }

    #[test]
    fn test_guard() {
        let tracker = Arc::new(MemTracker::new("guard"));
        let g1 = tracker.track(4096);
        let g2 = tracker.track(1024);
        assert_eq!(g1.bytes(), 4096);
        assert_eq!(tracker.consumption(), 5120);
        drop(g1);
        assert_eq!(tracker.consumption(), 1024);
        drop(g2);
        assert_eq!(tracker.consumption(), 0);
        assert_eq!(tracker.peak_consumption(), 5120);
    }

    #[test]
    fn test_concurrent_guards() {
        let tracker = Arc::new(MemTracker::new("concurrent"));
        let handles = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        let _guard = tracker.track(i);
                    }
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().for_each(|h| h.join().unwrap());
        assert_eq!(tracker.consumption(), 0);
    }
}
