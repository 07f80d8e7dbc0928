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
    sync::Weak,
    thread::JoinHandle,
    time::{Duration, Instant},
};

use flume::RecvTimeoutError;
use pagecache_common::error::{Error, ErrorKind, Result};

use crate::cache::StoragePageCache;

/// Background thread that periodically removes stale pages from a [`StoragePageCache`].
///
/// The thread only holds a weak reference to the cache. It stops when the sweeper is dropped or the cache is gone.
#[derive(Debug)]
pub struct StaleSweeper {
    tx: flume::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StaleSweeper {
    pub(crate) fn spawn(cache: Weak<StoragePageCache>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::invalid_config(
                "interval",
                format!("{interval:?}"),
                "stale sweep interval must be greater than zero",
            ));
        }

        let (tx, rx) = flume::bounded(1);
        let handle = std::thread::Builder::new()
            .name("pagecache-sweeper".to_string())
            .spawn(move || Self::run(cache, rx, interval))
            .map_err(|e| Error::new(ErrorKind::External, "spawn stale sweeper thread failed").with_source(e))?;

        tracing::debug!("[page cache]: stale sweeper started with interval {:?}", interval);

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    fn run(cache: Weak<StoragePageCache>, rx: flume::Receiver<()>, interval: Duration) {
        loop {
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let Some(cache) = cache.upgrade() else {
                        tracing::warn!("[page cache]: cache is gone, stale sweeper exits");
                        break;
                    };
                    let now = Instant::now();
                    let res = cache.prune_stale();
                    tracing::debug!(
                        "[page cache]: stale sweep removed {} pages, {} bytes, in {:?}",
                        res.count,
                        res.weight,
                        now.elapsed()
                    );
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("[page cache]: stale sweeper stopped");
    }

    /// Stop the sweeper and wait for its thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Returns `true` if the sweeper thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| handle.is_finished())
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.tx.try_send(());
        if handle.join().is_err() {
            tracing::warn!("[page cache]: stale sweeper thread panicked");
        }
    }
}

impl Drop for StaleSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
