pub mod btree_index;
pub mod btree_iterator;
pub mod btree_page;
pub mod key_comparator;

pub use btree_index::BPlusTreeIndex;
pub use btree_iterator::BTreeIterator;
pub use btree_page::{BTreeNode, BTreeNodeRef, HeaderPage, HeaderPageRef};
pub use key_comparator::{BytewiseComparator, IntegerComparator, KeyComparator};
