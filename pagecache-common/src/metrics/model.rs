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

use std::borrow::Cow;

use super::{BoxedCounter, BoxedGauge, RegistryOps};
use crate::metrics::registry::noop::NoopMetricsRegistry;

/// Per-domain page cache metrics.
///
/// Every cache domain owns one [`Metrics`] instance labeled with the domain name.
#[derive(Debug)]
pub struct Metrics {
    /// Entries stored by an insert.
    pub memory_insert: BoxedCounter,
    /// Inserts that lost the race against a resident entry of the same key.
    pub memory_duplicate: BoxedCounter,
    /// Inserts that were not admitted and returned a phantom entry.
    pub memory_phantom: BoxedCounter,
    /// Lookups that found an entry.
    pub memory_hit: BoxedCounter,
    /// Lookups that found nothing.
    pub memory_miss: BoxedCounter,
    /// Entries removed by an explicit erase.
    pub memory_remove: BoxedCounter,
    /// Entries evicted for capacity.
    pub memory_evict: BoxedCounter,
    /// Entries removed by the stale sweep or a full prune.
    pub memory_sweep: BoxedCounter,
    /// Last references released.
    pub memory_release: BoxedCounter,

    /// Total charge of the resident entries.
    pub memory_usage: BoxedGauge,
}

impl Metrics {
    /// Create a new metrics instance with the given domain name and registry.
    pub fn new<R>(name: impl Into<Cow<'static, str>>, registry: &R) -> Self
    where
        R: RegistryOps + ?Sized,
    {
        let name = name.into();

        let pagecache_op_total = registry.register_counter_vec(
            "pagecache_op_total".into(),
            "page cache operations".into(),
            &["name", "op"],
        );
        let pagecache_usage =
            registry.register_gauge_vec("pagecache_usage".into(), "page cache usage".into(), &["name"]);

        let op = |op: &'static str| pagecache_op_total.counter(&[name.clone(), op.into()]);

        let memory_insert = op("insert");
        let memory_duplicate = op("duplicate");
        let memory_phantom = op("phantom");
        let memory_hit = op("hit");
        let memory_miss = op("miss");
        let memory_remove = op("remove");
        let memory_evict = op("evict");
        let memory_sweep = op("sweep");
        let memory_release = op("release");

        let memory_usage = pagecache_usage.gauge(&[name.clone()]);

        Self {
            memory_insert,
            memory_duplicate,
            memory_phantom,
            memory_hit,
            memory_miss,
            memory_remove,
            memory_evict,
            memory_sweep,
            memory_release,
            memory_usage,
        }
    }

    /// Build noop metrics.
    ///
    /// Note: `noop` is only supposed to be called by other pagecache components.
    #[doc(hidden)]
    pub fn noop() -> Self {
        Self::new("test", &NoopMetricsRegistry)
    }
}
