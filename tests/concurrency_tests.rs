mod common;

use common::{png_for, PixelHasher};
use phashstore::storage::MemoryStorage;
use phashstore::{ImageStore, SaveStatus};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

fn shared_store() -> Arc<ImageStore<MemoryStorage>> {
    Arc::new(ImageStore::new(MemoryStorage::new(), "img").with_hasher(PixelHasher))
}

#[test]
fn test_concurrent_identical_saves_store_once() {
    let store = shared_store();
    let barrier = Arc::new(Barrier::new(THREADS));
    let bytes = Arc::new(png_for(0x1234_5678_9ABC_DEF0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let bytes = Arc::clone(&bytes);
            thread::spawn(move || {
                barrier.wait();
                store.save_image_bytes(&bytes, false, 5)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = outcomes
        .iter()
        .filter(|o| o.status == SaveStatus::Success)
        .count();
    let exists = outcomes
        .iter()
        .filter(|o| o.status == SaveStatus::Exists)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(exists, THREADS - 1);
    assert_eq!(store.len(), 1);
    assert_eq!(store.storage().object_count("img"), 1);

    let id = outcomes[0].identifier.clone().unwrap();
    assert!(outcomes.iter().all(|o| o.identifier.as_ref() == Some(&id)));
}

#[test]
fn test_concurrent_distinct_saves_all_indexed() {
    let store = shared_store();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as u64)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // One distinct byte each, far apart in Hamming space
                let value = 0xFFu64 << (i * 8);
                let bytes = png_for(value);
                barrier.wait();
                store.save_image_bytes(&bytes, false, 2)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().status, SaveStatus::Success);
    }
    assert_eq!(store.len(), THREADS);
    assert_eq!(store.index().enumerate().len(), THREADS);
    assert_eq!(store.storage().object_count("img"), THREADS);
}

#[test]
fn test_reads_during_saves() {
    let store = shared_store();
    let first = store.save_image_bytes(&png_for(1), false, 0);
    let first_id = first.identifier.unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 1..40u64 {
                store.save_image_bytes(&png_for(i << 16), false, 0);
            }
        })
    };
    let reader = {
        let store = Arc::clone(&store);
        let first_id = first_id.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                assert!(store.exists_by_identifier(first_id.as_str()).unwrap());
                assert!(store.pick_random(&[]).is_some());
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.len(), 40);
}
