use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::common::{FrameId, PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// Metadata and storage for one buffer pool frame.
///
/// The buffer sits behind an RwLock that doubles as the per-page latch;
/// read/write page guards hold it for their lifetime. The pin count is
/// independent of the latch and only shields the frame from eviction.
pub struct FrameHeader {
    /// Index of this frame in the pool's frame array
    frame_id: FrameId,
    /// Raw id of the resident page; INVALID_PAGE_ID's bits when vacant
    page_id: AtomicU32,
    /// Number of outstanding pins on this frame
    pin_count: AtomicU32,
    /// Whether the resident page diverged from its on-disk image
    is_dirty: AtomicBool,
    /// The page bytes; the lock is the page latch
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl FrameHeader {
    /// Creates a vacant frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: AtomicU32::new(INVALID_PAGE_ID.0),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// The page currently resident in this frame, INVALID_PAGE_ID if
    /// vacant.
    pub fn page_id(&self) -> PageId {
        PageId::new(self.page_id.load(Ordering::Acquire))
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id.0, Ordering::Release);
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Takes one more pin on the frame.
    pub fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases one pin and returns the remaining count. Returns None
    /// if the frame was not pinned; the count never wraps below zero.
    pub fn unpin(&self) -> Option<u32> {
        self.pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .ok()
            .map(|previous| previous - 1)
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Records that the resident page diverged from its on-disk image.
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
    }

    /// Clears the dirty flag after a write-back.
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    /// The page latch guarding this frame's buffer.
    pub(crate) fn latch(&self) -> &RwLock<Box<[u8; PAGE_SIZE]>> {
        &self.data
    }

    /// Copies the frame's buffer into `dst` under a read latch.
    pub fn read_data(&self, dst: &mut [u8]) {
        assert_eq!(dst.len(), PAGE_SIZE);
        let guard = self.data.read();
        dst.copy_from_slice(&guard[..]);
    }

    /// Replaces the frame's buffer with `src` under a write latch.
    pub fn write_data(&self, src: &[u8]) {
        assert_eq!(src.len(), PAGE_SIZE);
        let mut guard = self.data.write();
        guard.copy_from_slice(src);
    }

    /// Returns the frame to its vacant state: no resident page, no
    /// pins, clean, zeroed buffer.
    pub fn reset(&self) {
        self.page_id.store(INVALID_PAGE_ID.0, Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }
}
