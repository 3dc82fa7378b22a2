use std::sync::Arc;

use crate::buffer::{BufferPoolManager, ReadPageGuard};
use crate::common::{IndexKey, RecordId, Result, INVALID_PAGE_ID};

use super::btree_page::BTreeNodeRef;

/// Forward iterator over the leaf chain. Holds a read latch (and pin) on
/// the current leaf only; hopping to the next leaf releases the current
/// one before latching its successor, so a scan never holds two leaf
/// latches at once.
///
/// An iterator without a leaf guard represents the end position of an
/// empty tree.
pub struct BTreeIterator {
    bpm: Arc<BufferPoolManager>,
    leaf_guard: Option<ReadPageGuard>,
    index: usize,
}

impl BTreeIterator {
    pub(crate) fn new(
        bpm: Arc<BufferPoolManager>,
        leaf_guard: Option<ReadPageGuard>,
        index: usize,
    ) -> Result<Self> {
        let mut iter = Self {
            bpm,
            leaf_guard,
            index,
        };
        // A position past the last slot of a leaf with a successor is
        // normalized onto the successor's first slot.
        iter.skip_exhausted_leaves()?;
        Ok(iter)
    }

    /// True once the iterator has moved past the last entry.
    pub fn is_end(&self) -> bool {
        match &self.leaf_guard {
            None => true,
            Some(guard) => {
                let node = BTreeNodeRef::new(guard.data());
                self.index == node.size() as usize
                    && node.next_page_id() == INVALID_PAGE_ID
            }
        }
    }

    /// The entry under the cursor, or None at the end position.
    pub fn current(&self) -> Option<(IndexKey, RecordId)> {
        let guard = self.leaf_guard.as_ref()?;
        let node = BTreeNodeRef::new(guard.data());
        if self.index < node.size() as usize {
            Some((node.key_at(self.index), node.rid_at(self.index)))
        } else {
            None
        }
    }

    /// Moves to the next entry, following the sibling pointer when the
    /// current leaf is exhausted.
    pub fn advance(&mut self) -> Result<()> {
        self.index += 1;
        self.skip_exhausted_leaves()
    }

    fn skip_exhausted_leaves(&mut self) -> Result<()> {
        loop {
            let Some(guard) = &self.leaf_guard else {
                return Ok(());
            };
            let (size, next_page_id) = {
                let node = BTreeNodeRef::new(guard.data());
                (node.size() as usize, node.next_page_id())
            };
            if self.index < size || next_page_id == INVALID_PAGE_ID {
                return Ok(());
            }
            // Pin the successor while the current leaf's latch still
            // protects the sibling link, so the successor cannot be
            // deleted or evicted during the hop. The latch itself is
            // only taken after the current leaf is released; holding
            // both would deadlock against a right-to-left merge.
            let next_pin = self.bpm.fetch_page_basic(next_page_id)?;
            self.leaf_guard = None;
            self.leaf_guard = Some(self.bpm.fetch_page_read(next_page_id)?);
            drop(next_pin);
            self.index = 0;
        }
    }
}

impl PartialEq for BTreeIterator {
    fn eq(&self, other: &Self) -> bool {
        let this_page = self.leaf_guard.as_ref().map(|guard| guard.page_id());
        let other_page = other.leaf_guard.as_ref().map(|guard| guard.page_id());
        this_page == other_page && self.index == other.index
    }
}

impl Iterator for BTreeIterator {
    type Item = Result<(IndexKey, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.current()?;
        match self.advance() {
            Ok(()) => Some(Ok(item)),
            Err(e) => Some(Err(e)),
        }
    }
}
