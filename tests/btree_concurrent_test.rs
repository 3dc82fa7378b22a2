//! Concurrency tests for the B+ tree index

use std::sync::Arc;
use std::thread;

use crabtree::buffer::BufferPoolManager;
use crabtree::common::{index_key_from_u64, IndexKey, PageId, RecordId, SlotId};
use crabtree::index::{BPlusTreeIndex, IntegerComparator};
use crabtree::storage::disk::DiskManager;

use tempfile::NamedTempFile;

fn create_tree(
    pool_size: usize,
    max_size: u16,
) -> (Arc<BPlusTreeIndex>, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let disk_manager = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    let bpm = Arc::new(BufferPoolManager::new(pool_size, disk_manager));
    let header_page_id = bpm.new_page().unwrap().page_id();
    let tree = BPlusTreeIndex::new(
        "concurrent_index",
        header_page_id,
        bpm,
        Arc::new(IntegerComparator),
        max_size,
        max_size,
    )
    .unwrap();
    (Arc::new(tree), temp_file)
}

fn key(k: u64) -> IndexKey {
    index_key_from_u64(k)
}

fn rid(k: u64) -> RecordId {
    RecordId::new(PageId::new(k as u32), SlotId::new(0))
}

fn collect_keys(tree: &BPlusTreeIndex) -> Vec<u64> {
    tree.begin()
        .unwrap()
        .map(|entry| u64::from_le_bytes(entry.unwrap().0))
        .collect()
}

fn assert_strictly_increasing(keys: &[u64]) {
    for window in keys.windows(2) {
        assert!(window[0] < window[1], "scan out of order: {:?}", window);
    }
}

#[test]
fn test_concurrent_disjoint_inserts() {
    let (tree, _temp) = create_tree(256, 16);

    let mut handles = Vec::new();
    for t in 0..4u64 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            for i in 0..250u64 {
                let k = t * 1000 + i;
                assert!(tree.insert(&key(k), rid(k)).unwrap());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Exactly the union of the four ranges, in order.
    let scanned = collect_keys(&tree);
    assert_eq!(scanned.len(), 1000);
    assert_strictly_increasing(&scanned);
    for t in 0..4u64 {
        for i in 0..250u64 {
            let k = t * 1000 + i;
            assert_eq!(tree.get_value(&key(k)).unwrap(), Some(rid(k)), "key {}", k);
        }
    }
}

#[test]
fn test_concurrent_readers_and_writers() {
    let (tree, _temp) = create_tree(256, 16);

    // Even keys are present before any reader starts.
    for k in (0..800u64).filter(|k| k % 2 == 0) {
        tree.insert(&key(k), rid(k)).unwrap();
    }

    let mut handles = Vec::new();

    // Writers fill in disjoint halves of the odd keys.
    for t in 0..2u64 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            let start = 1 + t * 400;
            for k in (start..start + 400).step_by(2) {
                assert!(tree.insert(&key(k), rid(k)).unwrap());
            }
        }));
    }

    // Readers must never observe a torn structure: scans stay strictly
    // ordered and contain every pre-inserted key; point lookups on
    // pre-inserted keys always succeed.
    for t in 0..2u64 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            for round in 0..30u64 {
                let scanned = collect_keys(&tree);
                assert_strictly_increasing(&scanned);
                assert!(scanned.len() >= 400);

                let probe = ((t * 131 + round * 29) % 400) * 2;
                assert_eq!(
                    tree.get_value(&key(probe)).unwrap(),
                    Some(rid(probe)),
                    "pre-inserted key {} disappeared",
                    probe
                );
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let scanned = collect_keys(&tree);
    assert_eq!(scanned, (0..800).collect::<Vec<u64>>());
}

#[test]
fn test_concurrent_disjoint_removes() {
    let (tree, _temp) = create_tree(256, 16);

    for k in 0..800u64 {
        tree.insert(&key(k), rid(k)).unwrap();
    }

    // Each thread removes a disjoint quarter of the even keys.
    let mut handles = Vec::new();
    for t in 0..4u64 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            let start = t * 200;
            for k in (start..start + 200).filter(|k| k % 2 == 0) {
                tree.remove(&key(k)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<u64> = (0..800).filter(|k| k % 2 == 1).collect();
    assert_eq!(collect_keys(&tree), expected);
    for k in (0..800u64).filter(|k| k % 2 == 0) {
        assert_eq!(tree.get_value(&key(k)).unwrap(), None);
    }
}

#[test]
fn test_concurrent_mixed_operations() {
    let (tree, _temp) = create_tree(256, 16);

    // A stable base of keys that no thread touches.
    for k in 10_000..10_400u64 {
        tree.insert(&key(k), rid(k)).unwrap();
    }

    let mut handles = Vec::new();

    // Churn threads insert and then remove their own range repeatedly.
    for t in 0..3u64 {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            let start = t * 1000;
            for _ in 0..5 {
                for k in start..start + 100 {
                    assert!(tree.insert(&key(k), rid(k)).unwrap());
                }
                for k in start..start + 100 {
                    tree.remove(&key(k)).unwrap();
                }
            }
        }));
    }

    // A reader keeps validating the stable base.
    {
        let tree = Arc::clone(&tree);
        handles.push(thread::spawn(move || {
            for _ in 0..30 {
                let scanned = collect_keys(&tree);
                assert_strictly_increasing(&scanned);
                for k in (10_000..10_400u64).step_by(97) {
                    assert_eq!(tree.get_value(&key(k)).unwrap(), Some(rid(k)));
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Only the stable base remains.
    assert_eq!(
        collect_keys(&tree),
        (10_000..10_400).collect::<Vec<u64>>()
    );
}
