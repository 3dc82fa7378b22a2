use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::{BufferPoolManager, ReadPageGuard, WritePageGuard};
use crate::common::{CrabtreeError, IndexKey, PageId, RecordId, Result, INVALID_PAGE_ID};

use super::btree_iterator::BTreeIterator;
use super::btree_page::{BTreeNode, BTreeNodeRef, HeaderPage, HeaderPageRef};
use super::key_comparator::KeyComparator;

/// The structural operation a write descent performs; determines the
/// safety rule used for crabbing. Plain lookups descend with read
/// latches and never retain ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Insert,
    Delete,
}

/// How a descent picks its branch at each internal node.
#[derive(Clone, Copy)]
enum LeafSearch<'k> {
    Key(&'k IndexKey),
    Leftmost,
    Rightmost,
}

/// Per-operation bookkeeping for a write descent: the root-id latch
/// (held while the operation may still move the root), the write-latched
/// ancestors in descent order, pages scheduled for deletion once every
/// latch is dropped, and parent-pointer fixups addressed to pages the
/// operation itself has latched further down the stack.
struct OpContext<'a> {
    root_guard: Option<MutexGuard<'a, ()>>,
    ancestors: Vec<WritePageGuard>,
    deleted: Vec<PageId>,
    parent_fixups: Vec<(PageId, PageId)>,
}

impl<'a> OpContext<'a> {
    fn new() -> Self {
        Self {
            root_guard: None,
            ancestors: Vec::new(),
            deleted: Vec::new(),
            parent_fixups: Vec::new(),
        }
    }

    /// Releases the root-id latch and every retained ancestor latch/pin.
    fn release_ancestors(&mut self) {
        self.root_guard = None;
        self.ancestors.clear();
    }
}

/// A concurrent B+ tree index over the buffer pool, with unique keys.
///
/// The root page id lives only in the header page and is re-read under
/// latch on every descent. Read descents hand-over-hand read latches;
/// write descents crab: ancestors stay write-latched until a child that
/// cannot propagate a structural change is reached.
pub struct BPlusTreeIndex {
    index_name: String,
    header_page_id: PageId,
    bpm: Arc<BufferPoolManager>,
    comparator: Arc<dyn KeyComparator>,
    leaf_max_size: u16,
    internal_max_size: u16,
    /// Serializes root id changes and gates descents.
    root_latch: Mutex<()>,
}

impl BPlusTreeIndex {
    /// Creates a tree over the given header page, initializing it to the
    /// empty state. The header page must already exist in the pool's id
    /// space and belongs to the caller.
    pub fn new(
        index_name: impl Into<String>,
        header_page_id: PageId,
        bpm: Arc<BufferPoolManager>,
        comparator: Arc<dyn KeyComparator>,
        leaf_max_size: u16,
        internal_max_size: u16,
    ) -> Result<Self> {
        {
            let mut header_guard = bpm.fetch_page_write(header_page_id)?;
            let mut header = HeaderPage::new(header_guard.data_mut());
            header.init();
        }

        Ok(Self {
            index_name: index_name.into(),
            header_page_id,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
            root_latch: Mutex::new(()),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Whether the tree currently holds no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.get_root_page_id()? == INVALID_PAGE_ID)
    }

    /// Current root page id, re-read from the header page.
    pub fn get_root_page_id(&self) -> Result<PageId> {
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        Ok(HeaderPageRef::new(header_guard.data()).root_page_id())
    }

    /// Point lookup.
    pub fn get_value(&self, key: &IndexKey) -> Result<Option<RecordId>> {
        let Some(leaf_guard) = self.find_leaf_read(LeafSearch::Key(key))? else {
            return Ok(None);
        };
        let node = BTreeNodeRef::new(leaf_guard.data());
        Ok(node.leaf_lookup(key, &*self.comparator))
    }

    /// Inserts a unique key. Returns false (leaving the tree unchanged)
    /// if the key is already present.
    pub fn insert(&self, key: &IndexKey, rid: RecordId) -> Result<bool> {
        let mut ctx = OpContext::new();
        let Some(mut leaf_guard) = self.find_leaf_write(key, Operation::Insert, &mut ctx)? else {
            // Empty tree; the root-id latch is still held in ctx.
            self.start_new_tree(key, rid, &mut ctx)?;
            return Ok(true);
        };

        let (old_size, new_size) = {
            let mut node = BTreeNode::new(leaf_guard.data_mut());
            let old = node.size();
            (old, node.leaf_insert(key, rid, &*self.comparator))
        };

        if new_size == old_size {
            // Duplicate key; latches and pins unwind via guard drops.
            return Ok(false);
        }
        if new_size < self.leaf_max_size {
            return Ok(true);
        }

        // The leaf is over-full: split off a sibling and push the
        // sibling's first key up.
        let mut new_leaf_guard = self.bpm.new_page()?;
        let new_leaf_page_id = new_leaf_guard.page_id();
        log::debug!(
            "splitting leaf {} into {}",
            leaf_guard.page_id(),
            new_leaf_page_id
        );

        let risen_key = {
            let mut old_node = BTreeNode::new(leaf_guard.data_mut());
            let mut new_node = BTreeNode::new(new_leaf_guard.data_mut());
            new_node.init_leaf(
                new_leaf_page_id,
                old_node.parent_page_id(),
                self.leaf_max_size,
            );
            old_node.leaf_move_half_to(&mut new_node);
            new_node.set_next_page_id(old_node.next_page_id());
            old_node.set_next_page_id(new_leaf_page_id);
            new_node.key_at(0)
        };

        self.insert_into_parent(&mut leaf_guard, &risen_key, &mut new_leaf_guard, &mut ctx)?;
        Ok(true)
    }

    /// Removes a key. Absent keys are a silent no-op.
    pub fn remove(&self, key: &IndexKey) -> Result<()> {
        let mut ctx = OpContext::new();
        let Some(mut leaf_guard) = self.find_leaf_write(key, Operation::Delete, &mut ctx)? else {
            return Ok(());
        };

        let (old_size, new_size) = {
            let mut node = BTreeNode::new(leaf_guard.data_mut());
            let old = node.size();
            (old, node.leaf_remove(key, &*self.comparator))
        };

        if new_size == old_size {
            return Ok(());
        }

        let leaf_should_delete = self.coalesce_or_redistribute(&mut leaf_guard, &mut ctx, None)?;
        self.apply_parent_fixup(&mut ctx, &mut leaf_guard);
        if leaf_should_delete {
            ctx.deleted.push(leaf_guard.page_id());
        }

        drop(leaf_guard);
        ctx.release_ancestors();
        debug_assert!(ctx.parent_fixups.is_empty());

        // Deferred deletion: only after every latch is dropped can the
        // frames go back to the pool.
        let deleted = std::mem::take(&mut ctx.deleted);
        for page_id in deleted {
            self.bpm.delete_page(page_id)?;
        }
        Ok(())
    }

    /// Iterator positioned at the first entry.
    pub fn begin(&self) -> Result<BTreeIterator> {
        let leaf_guard = self.find_leaf_read(LeafSearch::Leftmost)?;
        BTreeIterator::new(Arc::clone(&self.bpm), leaf_guard, 0)
    }

    /// Iterator positioned at the first entry with key >= `key`.
    pub fn begin_from(&self, key: &IndexKey) -> Result<BTreeIterator> {
        let Some(leaf_guard) = self.find_leaf_read(LeafSearch::Key(key))? else {
            return BTreeIterator::new(Arc::clone(&self.bpm), None, 0);
        };
        let index = BTreeNodeRef::new(leaf_guard.data()).leaf_key_index(key, &*self.comparator);
        BTreeIterator::new(Arc::clone(&self.bpm), Some(leaf_guard), index)
    }

    /// Iterator positioned past the last entry.
    pub fn end(&self) -> Result<BTreeIterator> {
        let Some(leaf_guard) = self.find_leaf_read(LeafSearch::Rightmost)? else {
            return BTreeIterator::new(Arc::clone(&self.bpm), None, 0);
        };
        let size = BTreeNodeRef::new(leaf_guard.data()).size() as usize;
        BTreeIterator::new(Arc::clone(&self.bpm), Some(leaf_guard), size)
    }

    /// Read descent: hand-over-hand read latches, parent released after
    /// the child latch is held. Returns None for an empty tree.
    fn find_leaf_read(&self, target: LeafSearch<'_>) -> Result<Option<ReadPageGuard>> {
        let mut guard = {
            let _root_guard = self.root_latch.lock();
            let root_page_id = {
                let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
                HeaderPageRef::new(header_guard.data()).root_page_id()
            };
            if root_page_id == INVALID_PAGE_ID {
                return Ok(None);
            }
            // The root latch is released only once the root page's read
            // latch is held.
            self.bpm.fetch_page_read(root_page_id)?
        };

        loop {
            let child_page_id = {
                let node = BTreeNodeRef::new(guard.data());
                if node.is_leaf() {
                    None
                } else {
                    Some(match target {
                        LeafSearch::Key(key) => node.internal_lookup(key, &*self.comparator),
                        LeafSearch::Leftmost => node.child_at(0),
                        LeafSearch::Rightmost => node.child_at(node.size() as usize - 1),
                    })
                }
            };
            let Some(child_page_id) = child_page_id else {
                return Ok(Some(guard));
            };
            // Assignment latches the child first, then drops the parent.
            guard = self.bpm.fetch_page_read(child_page_id)?;
        }
    }

    /// Write descent with latch crabbing. Ancestors that may be affected
    /// by a structural change stay write-latched in `ctx`; reaching a
    /// safe child releases all of them. Returns None for an empty tree,
    /// in which case the root-id latch stays held in `ctx` so the caller
    /// can install a first root atomically.
    fn find_leaf_write<'a>(
        &'a self,
        key: &IndexKey,
        op: Operation,
        ctx: &mut OpContext<'a>,
    ) -> Result<Option<WritePageGuard>> {
        ctx.root_guard = Some(self.root_latch.lock());

        let root_page_id = {
            let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
            HeaderPageRef::new(header_guard.data()).root_page_id()
        };
        if root_page_id == INVALID_PAGE_ID {
            return Ok(None);
        }

        let mut guard = self.bpm.fetch_page_write(root_page_id)?;
        if Self::is_safe(&BTreeNodeRef::new(guard.data()), op) {
            ctx.root_guard = None;
        }

        loop {
            let child_page_id = {
                let node = BTreeNodeRef::new(guard.data());
                if node.is_leaf() {
                    None
                } else {
                    Some(node.internal_lookup(key, &*self.comparator))
                }
            };
            let Some(child_page_id) = child_page_id else {
                return Ok(Some(guard));
            };

            let child_guard = self.bpm.fetch_page_write(child_page_id)?;
            let child_is_safe = Self::is_safe(&BTreeNodeRef::new(child_guard.data()), op);

            ctx.ancestors.push(guard);
            if child_is_safe {
                ctx.release_ancestors();
            }
            guard = child_guard;
        }
    }

    /// Whether `op` applied below this node can propagate a structural
    /// change past it.
    fn is_safe(node: &BTreeNodeRef<'_>, op: Operation) -> bool {
        let is_root = node.parent_page_id() == INVALID_PAGE_ID;
        match op {
            // One below the split threshold: a single insert into a node
            // at max_size - 1 still fills it to the split trigger.
            Operation::Insert => node.size() < node.max_size() - 1,
            Operation::Delete => {
                if is_root {
                    node.size() > 2
                } else {
                    node.size() > node.min_size()
                }
            }
        }
    }

    /// Installs the first leaf as root. The root-id latch must be held
    /// in `ctx`.
    fn start_new_tree(&self, key: &IndexKey, rid: RecordId, ctx: &mut OpContext<'_>) -> Result<()> {
        debug_assert!(ctx.root_guard.is_some());

        let mut leaf_guard = self.bpm.new_page()?;
        let leaf_page_id = leaf_guard.page_id();
        {
            let mut node = BTreeNode::new(leaf_guard.data_mut());
            node.init_leaf(leaf_page_id, INVALID_PAGE_ID, self.leaf_max_size);
            node.leaf_insert(key, rid, &*self.comparator);
        }
        self.set_root_page_id(leaf_page_id)?;
        log::debug!("installed leaf {} as first root", leaf_page_id);
        Ok(())
    }

    /// Publishes `key` separating `old_guard` and `new_guard` into their
    /// parent, growing a new root or splitting the parent as needed.
    fn insert_into_parent(
        &self,
        old_guard: &mut WritePageGuard,
        key: &IndexKey,
        new_guard: &mut WritePageGuard,
        ctx: &mut OpContext<'_>,
    ) -> Result<()> {
        let old_page_id = old_guard.page_id();
        let new_page_id = new_guard.page_id();
        let old_parent_id = BTreeNodeRef::new(old_guard.data()).parent_page_id();

        if old_parent_id == INVALID_PAGE_ID {
            // The split node was the root: grow the tree by one level.
            debug_assert!(ctx.root_guard.is_some());

            let mut root_guard = self.bpm.new_page()?;
            let root_page_id = root_guard.page_id();
            {
                let mut root = BTreeNode::new(root_guard.data_mut());
                root.init_internal(root_page_id, INVALID_PAGE_ID, self.internal_max_size);
                root.populate_new_root(old_page_id, key, new_page_id);
            }
            BTreeNode::new(old_guard.data_mut()).set_parent_page_id(root_page_id);
            BTreeNode::new(new_guard.data_mut()).set_parent_page_id(root_page_id);

            self.set_root_page_id(root_page_id)?;
            log::debug!("grew new root {}", root_page_id);
            ctx.release_ancestors();
            return Ok(());
        }

        let mut parent_guard = ctx.ancestors.pop().ok_or_else(|| {
            CrabtreeError::IndexCorrupted("parent latch missing from descent path".into())
        })?;
        debug_assert_eq!(parent_guard.page_id(), old_parent_id);

        let new_size = {
            let mut parent = BTreeNode::new(parent_guard.data_mut());
            parent.internal_insert_after(old_page_id, key, new_page_id)
        };
        if new_size < self.internal_max_size {
            ctx.release_ancestors();
            return Ok(());
        }

        // The parent is over-full in turn.
        let mut new_parent_guard = self.bpm.new_page()?;
        let new_parent_page_id = new_parent_guard.page_id();
        log::debug!(
            "splitting internal {} into {}",
            parent_guard.page_id(),
            new_parent_page_id
        );

        let (promoted_key, moved_children) = {
            let mut parent = BTreeNode::new(parent_guard.data_mut());
            let mut new_parent = BTreeNode::new(new_parent_guard.data_mut());
            new_parent.init_internal(
                new_parent_page_id,
                parent.parent_page_id(),
                self.internal_max_size,
            );
            let moved = parent.internal_move_half_to(&mut new_parent);
            (new_parent.key_at(0), moved)
        };

        // Re-parent the moved children. The split halves we still hold
        // latched are updated through their guards; everything else is
        // unlatched and fetched directly.
        for child_page_id in moved_children {
            if child_page_id == old_page_id {
                BTreeNode::new(old_guard.data_mut()).set_parent_page_id(new_parent_page_id);
            } else if child_page_id == new_page_id {
                BTreeNode::new(new_guard.data_mut()).set_parent_page_id(new_parent_page_id);
            } else {
                self.reparent(child_page_id, new_parent_page_id)?;
            }
        }

        self.insert_into_parent(&mut parent_guard, &promoted_key, &mut new_parent_guard, ctx)
    }

    /// Restores the occupancy invariant of an under-full `node_guard`
    /// after a removal, borrowing from or merging with a sibling.
    /// Returns true when the caller's node page was emptied and must be
    /// entered into the deleted set.
    ///
    /// `latched_child` names the one child of this node the operation
    /// already holds write-latched further down the stack; its parent
    /// pointer updates are deferred through `ctx.parent_fixups`.
    fn coalesce_or_redistribute(
        &self,
        node_guard: &mut WritePageGuard,
        ctx: &mut OpContext<'_>,
        latched_child: Option<PageId>,
    ) -> Result<bool> {
        let (node_page_id, parent_page_id, size, min_size, max_size) = {
            let node = BTreeNodeRef::new(node_guard.data());
            (
                node.page_id(),
                node.parent_page_id(),
                node.size(),
                node.min_size(),
                node.max_size(),
            )
        };

        if parent_page_id == INVALID_PAGE_ID {
            let root_should_delete = self.adjust_root(node_guard, ctx, latched_child)?;
            ctx.release_ancestors();
            return Ok(root_should_delete);
        }

        if size >= min_size {
            ctx.release_ancestors();
            return Ok(false);
        }

        let mut parent_guard = ctx.ancestors.pop().ok_or_else(|| {
            CrabtreeError::IndexCorrupted("parent latch missing from descent path".into())
        })?;

        let (index, sibling_page_id) = {
            let parent = BTreeNodeRef::new(parent_guard.data());
            let index = parent.child_index(node_page_id).ok_or_else(|| {
                CrabtreeError::IndexCorrupted(format!("page {} not found in parent", node_page_id))
            })?;
            let sibling_index = if index == 0 { 1 } else { index - 1 };
            (index, parent.child_at(sibling_index))
        };
        let mut sibling_guard = self.bpm.fetch_page_write(sibling_page_id)?;
        let sibling_size = BTreeNodeRef::new(sibling_guard.data()).size();

        if size + sibling_size >= max_size {
            self.redistribute(&mut sibling_guard, node_guard, &mut parent_guard, index)?;
            ctx.release_ancestors();
            return Ok(false);
        }

        // Merge. The survivor is always the left page: for the leftmost
        // node the right sibling is emptied into it, otherwise the node
        // empties into its left sibling.
        if index == 0 {
            log::debug!("merging {} into {}", sibling_page_id, node_page_id);
            let moved_children = {
                let mut node = BTreeNode::new(node_guard.data_mut());
                let mut sibling = BTreeNode::new(sibling_guard.data_mut());
                let mut parent = BTreeNode::new(parent_guard.data_mut());

                let moved = if node.is_leaf() {
                    sibling.leaf_move_all_to(&mut node);
                    node.set_next_page_id(sibling.next_page_id());
                    Vec::new()
                } else {
                    let middle_key = parent.key_at(1);
                    sibling.internal_move_all_to(&mut node, &middle_key)
                };
                parent.internal_remove_at(1);
                moved
            };
            for child_page_id in moved_children {
                self.reparent_or_defer(child_page_id, node_page_id, latched_child, ctx)?;
            }
            ctx.deleted.push(sibling_page_id);
            drop(sibling_guard);

            let parent_should_delete =
                self.coalesce_or_redistribute(&mut parent_guard, ctx, Some(node_page_id))?;
            self.apply_parent_fixup(ctx, &mut parent_guard);
            self.apply_parent_fixup(ctx, node_guard);
            if parent_should_delete {
                ctx.deleted.push(parent_guard.page_id());
            }
            Ok(false)
        } else {
            log::debug!("merging {} into {}", node_page_id, sibling_page_id);
            let moved_children = {
                let mut node = BTreeNode::new(node_guard.data_mut());
                let mut sibling = BTreeNode::new(sibling_guard.data_mut());
                let mut parent = BTreeNode::new(parent_guard.data_mut());

                let moved = if node.is_leaf() {
                    node.leaf_move_all_to(&mut sibling);
                    sibling.set_next_page_id(node.next_page_id());
                    Vec::new()
                } else {
                    let middle_key = parent.key_at(index);
                    node.internal_move_all_to(&mut sibling, &middle_key)
                };
                parent.internal_remove_at(index);
                moved
            };
            for child_page_id in moved_children {
                self.reparent_or_defer(child_page_id, sibling_page_id, latched_child, ctx)?;
            }
            drop(sibling_guard);

            let parent_should_delete =
                self.coalesce_or_redistribute(&mut parent_guard, ctx, Some(node_page_id))?;
            self.apply_parent_fixup(ctx, &mut parent_guard);
            self.apply_parent_fixup(ctx, node_guard);
            if parent_should_delete {
                ctx.deleted.push(parent_guard.page_id());
            }
            Ok(true)
        }
    }

    /// Moves one boundary entry from `sibling` into `node` and refreshes
    /// the separator in the parent. `index` is the node's slot in its
    /// parent; the sibling is right of the node iff `index == 0`.
    fn redistribute(
        &self,
        sibling_guard: &mut WritePageGuard,
        node_guard: &mut WritePageGuard,
        parent_guard: &mut WritePageGuard,
        index: usize,
    ) -> Result<()> {
        log::debug!(
            "redistributing between {} and {}",
            node_guard.page_id(),
            sibling_guard.page_id()
        );
        let node_page_id = node_guard.page_id();

        let moved_child = {
            let mut node = BTreeNode::new(node_guard.data_mut());
            let mut sibling = BTreeNode::new(sibling_guard.data_mut());
            let mut parent = BTreeNode::new(parent_guard.data_mut());

            if node.is_leaf() {
                if index == 0 {
                    sibling.leaf_move_first_to_end_of(&mut node);
                    parent.set_key_at(1, &sibling.key_at(0));
                } else {
                    sibling.leaf_move_last_to_front_of(&mut node);
                    parent.set_key_at(index, &node.key_at(0));
                }
                None
            } else if index == 0 {
                let middle_key = parent.key_at(1);
                let moved = sibling.internal_move_first_to_end_of(&mut node, &middle_key);
                parent.set_key_at(1, &sibling.key_at(0));
                Some(moved)
            } else {
                let middle_key = parent.key_at(index);
                let moved = sibling.internal_move_last_to_front_of(&mut node, &middle_key);
                parent.set_key_at(index, &node.key_at(0));
                Some(moved)
            }
        };

        // The borrowed child changes parents; it always comes from the
        // sibling's subtree, which this operation has not latched.
        if let Some(child_page_id) = moved_child {
            self.reparent(child_page_id, node_page_id)?;
        }
        Ok(())
    }

    /// Handles the shrink cases at the root: an internal root left with
    /// a single child is replaced by that child, an empty leaf root
    /// empties the tree. Returns true when the old root page must be
    /// deleted.
    fn adjust_root(
        &self,
        root_guard: &mut WritePageGuard,
        ctx: &mut OpContext<'_>,
        latched_child: Option<PageId>,
    ) -> Result<bool> {
        let (is_leaf, size) = {
            let node = BTreeNodeRef::new(root_guard.data());
            (node.is_leaf(), node.size())
        };

        if !is_leaf && size == 1 {
            let child_page_id =
                BTreeNode::new(root_guard.data_mut()).remove_and_return_only_child();
            self.set_root_page_id(child_page_id)?;
            self.reparent_or_defer(child_page_id, INVALID_PAGE_ID, latched_child, ctx)?;
            log::debug!("collapsed root into {}", child_page_id);
            return Ok(true);
        }

        if is_leaf && size == 0 {
            self.set_root_page_id(INVALID_PAGE_ID)?;
            log::debug!("tree emptied");
            return Ok(true);
        }

        Ok(false)
    }

    /// Rewrites the header's root pointer. Callers hold the root-id
    /// latch.
    fn set_root_page_id(&self, root_page_id: PageId) -> Result<()> {
        let mut header_guard = self.bpm.fetch_page_write(self.header_page_id)?;
        let mut header = HeaderPage::new(header_guard.data_mut());
        header.set_root_page_id(root_page_id);
        Ok(())
    }

    /// Sets a child's parent pointer through a fresh write latch.
    fn reparent(&self, child_page_id: PageId, parent_page_id: PageId) -> Result<()> {
        let mut child_guard = self.bpm.fetch_page_write(child_page_id)?;
        BTreeNode::new(child_guard.data_mut()).set_parent_page_id(parent_page_id);
        Ok(())
    }

    /// Like `reparent`, but a child this operation already holds latched
    /// lower in the stack cannot be re-latched here; its fixup is
    /// deferred and applied through the held guard as the stack unwinds.
    fn reparent_or_defer(
        &self,
        child_page_id: PageId,
        parent_page_id: PageId,
        latched_child: Option<PageId>,
        ctx: &mut OpContext<'_>,
    ) -> Result<()> {
        if latched_child == Some(child_page_id) {
            ctx.parent_fixups.push((child_page_id, parent_page_id));
            Ok(())
        } else {
            self.reparent(child_page_id, parent_page_id)
        }
    }

    /// Applies a pending parent-pointer fixup addressed to the page
    /// behind `guard`, if any.
    fn apply_parent_fixup(&self, ctx: &mut OpContext<'_>, guard: &mut WritePageGuard) {
        let page_id = guard.page_id();
        if let Some(pos) = ctx.parent_fixups.iter().position(|&(child, _)| child == page_id) {
            let (_, parent_page_id) = ctx.parent_fixups.remove(pos);
            BTreeNode::new(guard.data_mut()).set_parent_page_id(parent_page_id);
        }
    }
}
