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
    sync::{Arc, Barrier},
    thread,
    time::{Duration, Instant},
};

use itertools::Itertools;
use pagecache::{CacheKey, ErrorKind, PageCacheHandle, PageType, StoragePageCache, StoragePageCacheBuilder};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn data_cache(capacity: usize, lru_k: bool) -> StoragePageCache {
    StoragePageCacheBuilder::new(capacity)
        .with_index_cache_percentage(0)
        .with_shards(1)
        .with_data_page_lru_k(lru_k)
        .build()
        .unwrap()
}

fn insert(
    cache: &StoragePageCache,
    key: &CacheKey,
    data: &[u8],
    page_type: PageType,
    in_memory: bool,
) -> PageCacheHandle {
    let mut page = cache.new_data_page(data.len(), true, page_type);
    page.data_mut().copy_from_slice(data);
    cache.insert(key, page, page_type, in_memory)
}

fn key(offset: i64) -> CacheKey {
    CacheKey::new("segment_0.dat", 1 << 20, offset)
}

#[test_log::test]
fn test_end_to_end() {
    let cache = Arc::new(
        StoragePageCacheBuilder::new(1_000_000)
            .with_index_cache_percentage(20)
            .with_pk_index_cache_capacity(50_000)
            .with_shards(4)
            .build()
            .unwrap(),
    );
    assert_eq!(cache.capacity(PageType::DataPage), 800_000);
    assert_eq!(cache.capacity(PageType::IndexPage), 200_000);
    assert_eq!(cache.capacity(PageType::PrimaryKeyIndexPage), 50_000);

    let data = (0..100u8).collect_vec();
    let k = CacheKey::new("file_a", 4096, 0);
    let handle = insert(&cache, &k, &data, PageType::DataPage, false);
    assert!(handle.inserted());
    drop(handle);

    let handle = cache.lookup(&k, PageType::DataPage).unwrap();
    assert_eq!(handle.data(), &data[..]);
    assert_eq!(handle.page_type(), Some(PageType::DataPage));
    assert_eq!(handle.size(), 100);
    drop(handle);

    let k = CacheKey::new("file_a", 4096, 4096);
    let barrier = Arc::new(Barrier::new(2));
    let handles = (0..2u8)
        .map(|i| {
            let cache = cache.clone();
            let barrier = barrier.clone();
            let k = k.clone();
            thread::spawn(move || {
                barrier.wait();
                insert(&cache, &k, &[i; 100], PageType::DataPage, true)
            })
        })
        .collect_vec()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect_vec();

    assert_eq!(handles.iter().filter(|h| h.inserted()).count(), 1);
    assert_eq!(handles[0].data(), handles[1].data());
    let cached = cache.lookup(&k, PageType::DataPage).unwrap();
    assert_eq!(cached.data(), handles[0].data());
    assert!(cached.data() == [0u8; 100] || cached.data() == [1u8; 100]);
}

#[test_log::test]
fn test_shared_object_round_trip() {
    struct ShortKeyIndex {
        keys: Vec<String>,
    }

    let cache = data_cache(1 << 20, false);
    let k = key(0);
    let index = Arc::new(ShortKeyIndex {
        keys: vec!["a".to_string(), "b".to_string()],
    });

    let handle = cache.insert_shared(&k, index.clone(), 256, PageType::IndexPage, false);
    assert!(handle.inserted());
    assert_eq!(cache.mem_tracker(PageType::IndexPage).consumption(), 256);
    drop(handle);
    assert_eq!(cache.mem_tracker(PageType::IndexPage).consumption(), 0);

    // The index domain has no budget, the object is only kept by its handle.
    assert!(cache.lookup(&k, PageType::IndexPage).is_none());

    let handle = cache.insert_shared(&k, index.clone(), 256, PageType::DataPage, false);
    assert_eq!(cache.mem_tracker(PageType::DataPage).consumption(), 256);
    drop(handle);
    let handle = cache.lookup(&k, PageType::DataPage).unwrap();
    let object = handle.get::<ShortKeyIndex>();
    assert!(Arc::ptr_eq(&object, &index));
    assert_eq!(object.keys, vec!["a", "b"]);
    assert!(handle.try_data().is_none());
}

#[test_log::test]
fn test_single_writer_per_key() {
    const THREADS: usize = 8;

    let cache = Arc::new(data_cache(1 << 20, false));
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles = (0..THREADS)
        .map(|i| {
            let cache = cache.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                insert(&cache, &key(42), &[i as u8; 512], PageType::DataPage, false)
            })
        })
        .collect_vec()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect_vec();

    assert_eq!(handles.iter().filter(|h| h.inserted()).count(), 1);
    for handle in &handles {
        assert_eq!(handle.data(), handles[0].data());
    }
    assert_eq!(cache.usage(PageType::DataPage), 512);
    assert_eq!(cache.element_count(PageType::DataPage), 1);

    drop(handles);
    // Losers are freed, only the resident page is accounted.
    assert_eq!(cache.mem_tracker(PageType::DataPage).consumption(), 512);
}

#[test_log::test]
fn test_single_writer_per_key_on_full_domain() {
    const THREADS: usize = 8;

    // Default settings keep LRU-K admission on for data pages.
    let cache = Arc::new(
        StoragePageCacheBuilder::new(1000)
            .with_index_cache_percentage(0)
            .with_shards(1)
            .build()
            .unwrap(),
    );
    for i in 0..10 {
        insert(&cache, &key(i), &[0; 100], PageType::DataPage, false);
    }
    assert_eq!(cache.usage(PageType::DataPage), 1000);

    // Sequential inserts of a new key while the domain is full.
    let k = CacheKey::new("f", 1, 777);
    let a = insert(&cache, &k, &[1; 100], PageType::DataPage, false);
    let b = insert(&cache, &k, &[2; 100], PageType::DataPage, false);
    assert!(a.inserted());
    assert!(!b.inserted());
    assert_eq!(a.data(), [1; 100]);
    assert_eq!(b.data(), [1; 100]);
    assert!(a.is_cached());
    assert_eq!(cache.lookup(&k, PageType::DataPage).unwrap().data(), [1; 100]);
    drop((a, b));

    for round in 0..50 {
        let k = CacheKey::new("f", 1, 1000 + round);
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles = (0..THREADS)
            .map(|i| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                let k = k.clone();
                thread::spawn(move || {
                    barrier.wait();
                    insert(&cache, &k, &[i as u8; 100], PageType::DataPage, false)
                })
            })
            .collect_vec()
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect_vec();

        assert_eq!(handles.iter().filter(|h| h.inserted()).count(), 1);
        for handle in &handles {
            assert_eq!(handle.data(), handles[0].data());
        }
        if let Some(cached) = cache.lookup(&k, PageType::DataPage) {
            assert_eq!(cached.data(), handles[0].data());
        }
    }

    assert!(cache.usage(PageType::DataPage) <= 1000);
    assert_eq!(
        cache.mem_tracker(PageType::DataPage).consumption(),
        cache.usage(PageType::DataPage)
    );
}

#[test_log::test]
fn test_capacity_bound() {
    const CAPACITY: usize = 10_000;

    let cache = data_cache(CAPACITY, false);
    let mut rng = SmallRng::seed_from_u64(114514);

    for i in 0..1000 {
        let size = rng.random_range(1..=1000);
        let handle = insert(&cache, &key(i), &vec![0; size], PageType::DataPage, rng.random_bool(0.2));
        assert!(handle.inserted());
        drop(handle);
        assert!(cache.usage(PageType::DataPage) <= CAPACITY);
    }

    // Referenced pages may push a shard over its budget temporarily.
    let held = (1000..1020)
        .map(|i| insert(&cache, &key(i), &[1; 1000], PageType::DataPage, false))
        .collect_vec();
    assert_eq!(cache.usage(PageType::DataPage), 20_000);
    drop(held);
    assert!(cache.usage(PageType::DataPage) <= CAPACITY);
    assert_eq!(
        cache.mem_tracker(PageType::DataPage).consumption(),
        cache.usage(PageType::DataPage)
    );
}

#[test_log::test]
fn test_in_memory_priority() {
    let cache = data_cache(1000, false);

    insert(&cache, &key(-1), &[7; 100], PageType::DataPage, true);
    for i in 0..50 {
        insert(&cache, &key(i), &[0; 100], PageType::DataPage, false);
    }

    let handle = cache.lookup(&key(-1), PageType::DataPage).unwrap();
    assert_eq!(handle.data(), [7; 100]);
    assert!(cache.lookup(&key(0), PageType::DataPage).is_none());
    assert!(cache.lookup(&key(49), PageType::DataPage).is_some());
}

#[test_log::test]
fn test_handle_outlives_eviction_and_erase() {
    let cache = data_cache(1000, false);

    let erased = insert(&cache, &key(0), b"erased", PageType::DataPage, false);
    assert!(cache.erase(&key(0), PageType::DataPage));
    assert!(!cache.erase(&key(0), PageType::DataPage));
    assert!(cache.lookup(&key(0), PageType::DataPage).is_none());
    assert!(!erased.is_cached());
    assert_eq!(erased.data(), b"erased");

    let mut evicted = insert(&cache, &key(1), b"evicted", PageType::DataPage, false);
    let mut other = cache.lookup(&key(1), PageType::DataPage).unwrap();
    other.release();
    assert!(other.is_empty());

    evicted.swap(&mut other);
    assert!(evicted.is_empty());
    // Pinned pages are not evicted, a full prune skips them.
    assert_eq!(cache.prune_all().count, 0);
    assert!(other.is_cached());

    // Shrinking to nothing cannot take the referenced page away.
    cache.page_cache(PageType::DataPage).resize(0);
    assert!(other.is_cached());
    assert_eq!(other.data(), b"evicted");
    drop(other);
    assert!(cache.lookup(&key(1), PageType::DataPage).is_none());
    assert_eq!(erased.data(), b"erased");

    drop(erased);
    assert_eq!(cache.mem_tracker(PageType::DataPage).consumption(), 0);
}

#[test_log::test]
fn test_domain_routing() {
    let cache = StoragePageCacheBuilder::new(2000)
        .with_index_cache_percentage(50)
        .with_pk_index_cache_capacity(500)
        .with_shards(1)
        .with_data_page_lru_k(false)
        .build()
        .unwrap();

    for i in 0..30 {
        insert(&cache, &key(i), &[0; 100], PageType::DataPage, false);
    }
    insert(&cache, &key(0), &[1; 100], PageType::IndexPage, false);
    insert(&cache, &key(0), &[2; 100], PageType::PrimaryKeyIndexPage, false);

    assert_eq!(cache.usage(PageType::DataPage), 1000);
    assert_eq!(cache.usage(PageType::IndexPage), 100);
    assert_eq!(cache.usage(PageType::PrimaryKeyIndexPage), 100);

    // The same key is cached independently per domain.
    assert!(cache.lookup(&key(0), PageType::DataPage).is_none());
    assert_eq!(cache.lookup(&key(0), PageType::IndexPage).unwrap().data(), [1; 100]);
    assert_eq!(
        cache.lookup(&key(0), PageType::PrimaryKeyIndexPage).unwrap().data(),
        [2; 100]
    );

    for page_type in PageType::ALL {
        assert_eq!(cache.mem_tracker(page_type).consumption(), cache.usage(page_type));
    }
}

#[test_log::test]
fn test_zero_capacity_domain() {
    let cache = StoragePageCacheBuilder::new(1000)
        .with_pk_index_cache_capacity(0)
        .build()
        .unwrap();

    let handle = insert(&cache, &key(0), b"phantom", PageType::PrimaryKeyIndexPage, true);
    assert!(handle.inserted());
    assert!(!handle.is_cached());
    assert_eq!(handle.data(), b"phantom");
    assert!(cache.lookup(&key(0), PageType::PrimaryKeyIndexPage).is_none());
    assert_eq!(cache.usage(PageType::PrimaryKeyIndexPage), 0);
    assert_eq!(cache.mem_tracker(PageType::PrimaryKeyIndexPage).consumption(), 7);

    drop(handle);
    assert_eq!(cache.mem_tracker(PageType::PrimaryKeyIndexPage).consumption(), 0);
}

#[test_log::test]
fn test_lru_k_admission() {
    let cache = data_cache(1000, true);

    for i in 0..10 {
        assert!(insert(&cache, &key(i), &[0; 100], PageType::DataPage, false).is_cached());
    }
    assert_eq!(cache.usage(PageType::DataPage), 1000);

    // First visit on a full domain.
    let handle = insert(&cache, &key(10), &[1; 100], PageType::DataPage, false);
    assert!(!handle.is_cached());
    drop(handle);
    assert!(cache.lookup(&key(10), PageType::DataPage).is_none());
    assert!(cache.lookup(&key(0), PageType::DataPage).is_some());

    // Second visit.
    let handle = insert(&cache, &key(10), &[1; 100], PageType::DataPage, false);
    assert!(handle.is_cached());
    drop(handle);
    assert_eq!(cache.lookup(&key(10), PageType::DataPage).unwrap().data(), [1; 100]);
    assert_eq!(cache.usage(PageType::DataPage), 1000);
    assert_eq!(cache.element_count(PageType::DataPage), 10);
}

#[test_log::test]
fn test_stale_sweep() {
    let cache = StoragePageCacheBuilder::new(1 << 20)
        .with_shards(2)
        .with_data_page_cache_stale_sweep_time(Duration::ZERO)
        .build()
        .unwrap();

    let held = insert(&cache, &key(0), &[0; 100], PageType::DataPage, false);
    insert(&cache, &key(1), &[0; 100], PageType::DataPage, false);
    insert(&cache, &key(2), &[0; 100], PageType::DataPage, true);
    insert(&cache, &key(0), &[0; 100], PageType::IndexPage, false);

    let res = cache.prune_stale();
    assert_eq!(res.count, 2);
    assert_eq!(res.weight, 200);
    assert!(cache.lookup(&key(1), PageType::DataPage).is_none());
    assert!(cache.lookup(&key(0), PageType::IndexPage).is_some());

    drop(held);
    assert_eq!(cache.prune_stale().count, 1);
    assert_eq!(cache.usage(PageType::DataPage), 0);
    assert_eq!(cache.usage(PageType::IndexPage), 100);
}

#[test_log::test]
fn test_trackers_return_to_zero() {
    let cache = Arc::new(
        StoragePageCacheBuilder::new(64 * 1024)
            .with_index_cache_percentage(25)
            .with_pk_index_cache_capacity(8 * 1024)
            .with_shards(4)
            .build()
            .unwrap(),
    );
    let trackers = PageType::ALL.map(|page_type| cache.mem_tracker(page_type).clone());

    let threads = (0..4u64)
        .map(|seed| {
            let cache = cache.clone();
            thread::spawn(move || {
                let mut rng = SmallRng::seed_from_u64(seed);
                let mut held = vec![];
                for _ in 0..2000 {
                    let page_type = PageType::ALL[rng.random_range(0..PageType::ALL.len())];
                    let k = key(rng.random_range(0..200));
                    match rng.random_range(0..10) {
                        0 => {
                            cache.erase(&k, page_type);
                        }
                        1..=4 => {
                            if let Some(handle) = cache.lookup(&k, page_type) {
                                held.push(handle);
                            }
                        }
                        _ => {
                            let size = rng.random_range(1..2048);
                            let handle = insert(&cache, &k, &vec![0; size], page_type, rng.random_bool(0.1));
                            held.push(handle);
                        }
                    }
                    if held.len() > 8 {
                        held.remove(rng.random_range(0..held.len()));
                    }
                }
            })
        })
        .collect_vec();
    threads.into_iter().for_each(|t| t.join().unwrap());

    for page_type in PageType::ALL {
        assert!(cache.usage(page_type) <= cache.capacity(page_type));
        assert_eq!(cache.mem_tracker(page_type).consumption(), cache.usage(page_type));
    }

    drop(cache);
    for tracker in trackers {
        assert_eq!(tracker.consumption(), 0, "tracker: {}", tracker.label());
        assert!(tracker.peak_consumption() > 0);
    }
}

fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    f()
}

#[test_log::test]
fn test_stale_sweeper() {
    let cache = Arc::new(
        StoragePageCacheBuilder::new(1 << 20)
            .with_data_page_cache_stale_sweep_time(Duration::ZERO)
            .build()
            .unwrap(),
    );

    let err = cache.start_stale_sweeper(Duration::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let sweeper = cache.start_stale_sweeper(Duration::from_millis(10)).unwrap();
    insert(&cache, &key(0), &[0; 100], PageType::DataPage, false);
    insert(&cache, &key(0), &[0; 100], PageType::IndexPage, false);
    assert!(wait_until(Duration::from_secs(10), || cache.usage(PageType::DataPage) == 0));
    assert_eq!(cache.usage(PageType::IndexPage), 100);
    assert!(!sweeper.is_finished());
    sweeper.stop();

    // The sweeper exits on its own once the cache is gone.
    let sweeper = cache.start_stale_sweeper(Duration::from_millis(10)).unwrap();
    drop(cache);
    assert!(wait_until(Duration::from_secs(10), || sweeper.is_finished()));
}
