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

use std::{any::Any, fmt::Debug, sync::Arc};

use pagecache_common::properties::Source;

use crate::{
    page::{Page, PageType},
    policy::{PageCachePolicy, PageCacheEntry},
};

/// A scoped reference to a cached page.
///
/// The page stays readable as long as the handle is alive, even if it is evicted or erased meanwhile. Dropping a
/// non-empty handle releases the reference exactly once. A default handle is empty and releases nothing.
#[derive(Default)]
pub struct PageCacheHandle {
    inner: Option<(PageCachePolicy, PageCacheEntry)>,
}

impl Debug for PageCacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some((cache, entry)) => f
                .debug_struct("PageCacheHandle")
                .field("cache", &cache.cache_type())
                .field("entry", entry)
                .finish(),
            None => f.write_str("PageCacheHandle(empty)"),
        }
    }
}

impl Drop for PageCacheHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl PageCacheHandle {
    /// Wrap an entry of the given domain.
    pub fn new(cache: PageCachePolicy, entry: PageCacheEntry) -> Self {
        Self {
            inner: Some((cache, entry)),
        }
    }

    /// Exchange the references held by two handles.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.inner, &mut other.inner);
    }

    /// Release the reference now and leave the handle empty.
    pub fn release(&mut self) {
        if let Some((cache, entry)) = self.inner.take() {
            cache.release(entry);
        }
    }

    /// Returns `true` if the handle holds no reference.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// The domain the referenced page belongs to.
    pub fn cache(&self) -> Option<&PageCachePolicy> {
        self.inner.as_ref().map(|(cache, _)| cache)
    }

    /// The referenced page.
    pub fn page(&self) -> Option<&Page> {
        self.inner.as_ref().map(|(_, entry)| entry.value())
    }

    /// Content of the referenced owned buffer page, or `None` if the handle is empty or holds a shared object page.
    pub fn try_data(&self) -> Option<&[u8]> {
        self.page().and_then(Page::as_data).map(|page| page.data())
    }

    /// Content of the referenced owned buffer page.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty or holds a shared object page.
    pub fn data(&self) -> &[u8] {
        match self.page() {
            Some(Page::Data(page)) => page.data(),
            Some(Page::Shared(_)) => panic!("page cache handle holds a shared object page, not a data page"),
            None => panic!("page cache handle is empty"),
        }
    }

    /// The referenced shared object as `T`, or `None` if the handle is empty, holds an owned buffer page or an
    /// object of another type.
    pub fn try_get<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.page().and_then(Page::as_shared).and_then(|page| page.downcast::<T>())
    }

    /// The referenced shared object as `T`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is empty, holds an owned buffer page or an object of another type.
    pub fn get<T>(&self) -> Arc<T>
    where
        T: Any + Send + Sync,
    {
        match self.page() {
            Some(Page::Shared(page)) => match page.downcast::<T>() {
                Some(object) => object,
                None => panic!(
                    "page cache handle holds an object of another type than {}",
                    std::any::type_name::<T>()
                ),
            },
            Some(Page::Data(_)) => panic!("page cache handle holds a data page, not a shared object page"),
            None => panic!("page cache handle is empty"),
        }
    }

    /// Returns `true` if the handle refers to the value given to the insert that created it.
    ///
    /// `false` for lookups, empty handles and inserts that lost against an already resident page.
    pub fn inserted(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|(_, entry)| entry.source() == Source::Outer)
    }

    /// Returns `true` if the referenced page is indexed by its domain.
    ///
    /// Pages that were not admitted, evicted or erased are only kept alive by their handles.
    pub fn is_cached(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|(_, entry)| !entry.is_outdated())
    }

    /// Kind of the referenced page.
    pub fn page_type(&self) -> Option<PageType> {
        self.page().map(Page::page_type)
    }

    /// Size of the referenced page, `0` for an empty handle.
    pub fn size(&self) -> usize {
        self.page().map(Page::size).unwrap_or_default()
    }
}
