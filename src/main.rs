use std::sync::Arc;

use crabtree::buffer::BufferPoolManager;
use crabtree::common::{index_key_from_u64, PageId, RecordId, SlotId};
use crabtree::index::{BPlusTreeIndex, IntegerComparator};
use crabtree::storage::disk::DiskManager;

fn main() {
    env_logger::init();

    println!("Crabtree - buffer pool + B+ tree storage core");
    println!("=============================================\n");

    let db_path = "demo.db";

    let disk_manager = Arc::new(DiskManager::new(db_path).expect("Failed to create disk manager"));
    println!("Created disk manager for: {}", db_path);

    let bpm = Arc::new(BufferPoolManager::new(16, disk_manager));
    println!("Created buffer pool with 16 frames");

    let header_page_id = bpm
        .new_page()
        .expect("Failed to allocate header page")
        .page_id();
    let tree = BPlusTreeIndex::new(
        "demo_index",
        header_page_id,
        Arc::clone(&bpm),
        Arc::new(IntegerComparator),
        4,
        4,
    )
    .expect("Failed to create index");
    println!("Created B+ tree index (header page {})\n", header_page_id);

    for k in [50u64, 20, 80, 10, 40, 60, 90, 30, 70] {
        let rid = RecordId::new(PageId::new(k as u32), SlotId::new(0));
        tree.insert(&index_key_from_u64(k), rid)
            .expect("Insert failed");
        println!("Inserted key {}", k);
    }

    let found = tree
        .get_value(&index_key_from_u64(40))
        .expect("Lookup failed");
    println!("\nLookup 40 -> {:?}", found);

    tree.remove(&index_key_from_u64(40)).expect("Remove failed");
    let found = tree
        .get_value(&index_key_from_u64(40))
        .expect("Lookup failed");
    println!("After remove, lookup 40 -> {:?}", found);

    print!("\nFull scan:");
    let iter = tree.begin().expect("Failed to build iterator");
    for entry in iter {
        let (key, _rid) = entry.expect("Scan failed");
        print!(" {}", u64::from_le_bytes(key));
    }
    println!();

    bpm.flush_all_pages().expect("Flush failed");
    println!("\nFlushed all pages to {}", db_path);
}
