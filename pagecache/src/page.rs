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

use pagecache_common::{
    error::{Error, ErrorKind},
    mem_tracker::{MemTracker, MemTrackerGuard},
};
use serde::{Deserialize, Serialize};

/// Kind of a cached page. Each kind is cached in its own domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageType {
    /// Column data page.
    DataPage,
    /// Secondary index page.
    IndexPage,
    /// Primary key index page.
    PrimaryKeyIndexPage,
}

impl PageType {
    /// Every page type that has a cache domain.
    pub const ALL: [PageType; 3] = [PageType::DataPage, PageType::IndexPage, PageType::PrimaryKeyIndexPage];

    /// The on-disk tag of the page type.
    pub fn code(&self) -> i32 {
        match self {
            PageType::DataPage => 1,
            PageType::IndexPage => 2,
            PageType::PrimaryKeyIndexPage => 5,
        }
    }

    /// Name of the page type.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::DataPage => "data_page",
            PageType::IndexPage => "index_page",
            PageType::PrimaryKeyIndexPage => "primary_key_index_page",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i32> for PageType {
    type Error = Error;

    /// Convert an on-disk page type tag.
    ///
    /// Tags of pages that are never cached (unknown, dictionary, short key) are rejected.
    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PageType::DataPage),
            2 => Ok(PageType::IndexPage),
            5 => Ok(PageType::PrimaryKeyIndexPage),
            code => Err(
                Error::new(ErrorKind::Unsupported, "page type has no cache domain").with_context("page_type", code),
            ),
        }
    }
}

/// A page backed by an owned byte buffer.
///
/// The buffer is allocated with a fixed capacity. The logical size can be shrunk with [`DataPage::reset_size`]
/// before the page is inserted into the cache; once inserted the page is shared and immutable.
pub struct DataPage {
    buf: Box<[u8]>,
    size: usize,
    page_type: PageType,
    guard: Option<MemTrackerGuard>,
}

impl Debug for DataPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPage")
            .field("capacity", &self.capacity())
            .field("size", &self.size)
            .field("page_type", &self.page_type)
            .field("tracker", &self.guard.as_ref().map(|g| g.tracker().label()))
            .finish()
    }
}

impl DataPage {
    /// Allocate a zeroed page of `byte_count` bytes.
    ///
    /// The allocation is accounted to `tracker` if given.
    pub fn new(byte_count: usize, page_type: PageType, tracker: Option<&Arc<MemTracker>>) -> Self {
        Self::from_vec(vec![0; byte_count], page_type, tracker)
    }

    /// Build a page from an already filled buffer.
    pub fn from_vec(buf: Vec<u8>, page_type: PageType, tracker: Option<&Arc<MemTracker>>) -> Self {
        let buf = buf.into_boxed_slice();
        let size = buf.len();
        let guard = tracker.map(|tracker| tracker.track(size));
        Self {
            buf,
            size,
            page_type,
            guard,
        }
    }

    /// The logical content of the page.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.size]
    }

    /// The whole allocated buffer, for filling the page before it is inserted.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Logical size of the page.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocated size of the page.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Shrink the logical size of the page.
    ///
    /// # Panics
    ///
    /// Panics if `size` is larger than the capacity.
    pub fn reset_size(&mut self, size: usize) {
        assert!(
            size <= self.capacity(),
            "page size {size} exceeds the page capacity {}",
            self.capacity()
        );
        self.size = size;
    }

    /// Kind of the page.
    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    /// The tracker the allocation is accounted to.
    pub fn mem_tracker(&self) -> Option<&Arc<MemTracker>> {
        self.guard.as_ref().map(|guard| guard.tracker())
    }
}

/// A page holding a shared structured object, e.g. a decoded index.
///
/// Holders of the object may keep their own strong or weak references independent from the cache.
pub struct SharedPage {
    object: Arc<dyn Any + Send + Sync>,
    size: usize,
    page_type: PageType,
    guard: Option<MemTrackerGuard>,
}

impl Debug for SharedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPage")
            .field("size", &self.size)
            .field("page_type", &self.page_type)
            .field("tracker", &self.guard.as_ref().map(|g| g.tracker().label()))
            .finish()
    }
}

impl SharedPage {
    /// Wrap a shared object with its caller estimated `size`.
    ///
    /// `size` is accounted to `tracker` if given.
    pub fn new<T>(object: Arc<T>, size: usize, page_type: PageType, tracker: Option<&Arc<MemTracker>>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            object,
            size,
            page_type,
            guard: tracker.map(|tracker| tracker.track(size)),
        }
    }

    /// The type erased object.
    pub fn object(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.object
    }

    /// The object as `T`, or `None` if it has another type.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.object.clone().downcast::<T>().ok()
    }

    /// Estimated size of the object.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Kind of the page.
    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    /// The tracker the size is accounted to.
    pub fn mem_tracker(&self) -> Option<&Arc<MemTracker>> {
        self.guard.as_ref().map(|guard| guard.tracker())
    }
}

/// A cached page value.
#[derive(Debug)]
pub enum Page {
    /// Owned byte buffer.
    Data(DataPage),
    /// Shared structured object.
    Shared(SharedPage),
}

impl Page {
    /// Charge of the page against the byte budget of its domain.
    pub fn size(&self) -> usize {
        match self {
            Page::Data(page) => page.size(),
            Page::Shared(page) => page.size(),
        }
    }

    /// Kind of the page.
    pub fn page_type(&self) -> PageType {
        match self {
            Page::Data(page) => page.page_type(),
            Page::Shared(page) => page.page_type(),
        }
    }

    /// The owned buffer page, if it is one.
    pub fn as_data(&self) -> Option<&DataPage> {
        match self {
            Page::Data(page) => Some(page),
            Page::Shared(_) => None,
        }
    }

    /// The shared object page, if it is one.
    pub fn as_shared(&self) -> Option<&SharedPage> {
        match self {
            Page::Shared(page) => Some(page),
            Page::Data(_) => None,
        }
    }
}

impl From<DataPage> for Page {
    fn from(page: DataPage) -> Self {
        Page::Data(page)
    }
}

impl From<SharedPage> for Page {
    fn from(page: SharedPage) -> Self {
        Page::Shared(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_type_codes() {
        for page_type in PageType::ALL {
            assert_eq!(PageType::try_from(page_type.code()).unwrap(), page_type);
        }
        for code in [0, 3, 4, 6, -1] {
            let e = PageType::try_from(code).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Unsupported);
        }
    }

    #[test]
    fn test_data_page_tracking() {
        let tracker = Arc::new(MemTracker::new("test"));

        let mut page = DataPage::new(4096, PageType::DataPage, Some(&tracker));
        assert_eq!(tracker.consumption(), 4096);
        assert_eq!(page.capacity(), 4096);
        assert_eq!(page.size(), 4096);
        assert!(page.data().iter().all(|b| *b == 0));

        page.data_mut()[..3].copy_from_slice(b"abc");
        page.reset_size(3);
        assert_eq!(page.data(), b"abc");
        assert_eq!(page.size(), 3);
        // The whole capacity stays accounted.
        assert_eq!(tracker.consumption(), 4096);

        drop(page);
        assert_eq!(tracker.consumption(), 0);

        let untracked = DataPage::new(128, PageType::IndexPage, None);
        assert!(untracked.mem_tracker().is_none());
        assert_eq!(tracker.consumption(), 0);
    }

    #[test]
    #[should_panic]
    fn test_reset_size_over_capacity() {
        let mut page = DataPage::new(16, PageType::DataPage, None);
        page.reset_size(17);
    }

    #[test]
    fn test_shared_page() {
        #[derive(Debug, PartialEq)]
        struct Index(Vec<u32>);

        let tracker = Arc::new(MemTracker::new("test"));
        let object = Arc::new(Index(vec![1, 2, 3]));
        let page = SharedPage::new(object.clone(), 1000, PageType::PrimaryKeyIndexPage, Some(&tracker));
        assert_eq!(tracker.consumption(), 1000);

        let got = page.downcast::<Index>().unwrap();
        assert!(Arc::ptr_eq(&got, &object));
        assert!(page.downcast::<String>().is_none());

        let page = Page::from(page);
        assert_eq!(page.size(), 1000);
        assert_eq!(page.page_type(), PageType::PrimaryKeyIndexPage);
        assert!(page.as_data().is_none());

        drop(got);
        drop(page);
        assert_eq!(tracker.consumption(), 0);
        // The object outlives the page.
        assert_eq!(object.0, vec![1, 2, 3]);
    }
}
