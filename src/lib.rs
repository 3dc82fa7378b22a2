//! Crabtree - a disk-oriented buffer pool and concurrent B+ tree in Rust
//!
//! The crate implements the storage core of a disk-oriented database:
//! fixed-size pages cached in a bounded buffer pool under a clock
//! replacement policy, and a concurrent unique-key B+ tree index built
//! on top of it with latch-crabbing descents.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): disk I/O
//!   - `DiskManager`: reads and writes fixed-size pages in a backing file
//!   - `DiskScheduler`: background worker thread for disk requests
//!
//! - **Buffer Pool** (`buffer`): memory management for pages
//!   - `BufferPoolManager`: page table, free list, eviction, flushing
//!   - `ClockReplacer`: clock page replacement with pinning
//!   - `FrameHeader`: per-frame metadata; its data lock is the page latch
//!   - `ReadPageGuard`/`WritePageGuard`: RAII pin + latch handles
//!
//! - **Index** (`index`): the B+ tree
//!   - `BPlusTreeIndex`: point lookup, unique insert, delete, range scan
//!   - `BTreeIterator`: forward iteration over the leaf chain
//!   - `KeyComparator`: total order over opaque fixed-width keys
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crabtree::buffer::BufferPoolManager;
//! use crabtree::common::{index_key_from_u64, PageId, RecordId, SlotId};
//! use crabtree::index::{BPlusTreeIndex, IntegerComparator};
//! use crabtree::storage::disk::DiskManager;
//!
//! let disk_manager = Arc::new(DiskManager::new("index.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, disk_manager));
//!
//! // The header page belongs to the caller.
//! let header_page_id = bpm.new_page().unwrap().page_id();
//! let tree = BPlusTreeIndex::new(
//!     "orders_pk",
//!     header_page_id,
//!     bpm,
//!     Arc::new(IntegerComparator),
//!     32,
//!     32,
//! )
//! .unwrap();
//!
//! let key = index_key_from_u64(42);
//! tree.insert(&key, RecordId::new(PageId::new(7), SlotId::new(0))).unwrap();
//! assert!(tree.get_value(&key).unwrap().is_some());
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{CrabtreeError, IndexKey, PageId, RecordId, Result, SlotId};
