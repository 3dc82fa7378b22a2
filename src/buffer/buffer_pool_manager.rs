use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{CrabtreeError, FrameId, PageId, Result, INVALID_PAGE_ID, PAGE_SIZE};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{BasicPageGuard, ClockReplacer, FrameHeader, ReadPageGuard, WritePageGuard};

/// Page table, free list and page id allocator, guarded by one mutex so
/// that victim selection and table installation are atomic.
struct PoolInner {
    /// Page table: maps page IDs to frame IDs
    page_table: HashMap<PageId, FrameId>,
    /// Free list: frames that hold no live page
    free_list: VecDeque<FrameId>,
    /// Next page id to hand out; ids are dense and monotonic
    next_page_id: u32,
}

/// Internal state shared between the manager and its page guards.
pub(crate) struct PoolState {
    /// The buffer pool frames
    frames: Vec<Arc<FrameHeader>>,
    /// Bookkeeping under the pool mutex
    inner: Mutex<PoolInner>,
    /// Clock replacer for eviction decisions
    replacer: ClockReplacer,
    /// Disk scheduler for I/O
    disk_scheduler: DiskScheduler,
}

impl PoolState {
    /// Decrements a page's pin count, ORs in the dirty hint, and notifies
    /// the replacer when the count reaches zero.
    /// Returns false if the page is not resident or was not pinned.
    pub(crate) fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();
        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];

        if is_dirty {
            frame.mark_dirty();
        }
        match frame.unpin() {
            None => false,
            Some(0) => {
                self.replacer.unpin(frame_id);
                true
            }
            Some(_) => true,
        }
    }
}

/// BufferPoolManager mediates all access to disk pages through a bounded
/// in-memory frame cache. Victims are taken from the free list first and
/// then from the clock replacer; dirty frames are written back on
/// eviction.
pub struct BufferPoolManager {
    /// Number of frames in the buffer pool
    pool_size: usize,
    /// Shared state, also held by outstanding page guards
    state: Arc<PoolState>,
}

impl BufferPoolManager {
    /// Creates a new BufferPoolManager with the given pool size and disk
    /// manager. Initially every frame is on the free list.
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        let state = Arc::new(PoolState {
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
                next_page_id: 0,
            }),
            replacer: ClockReplacer::new(pool_size),
            disk_scheduler: DiskScheduler::new(disk_manager),
        });

        Self { pool_size, state }
    }

    /// Allocates a fresh page id, installs it in a victim frame and
    /// returns a write guard over the zeroed page (pin count 1).
    pub fn new_page(&self) -> Result<WritePageGuard> {
        let (page_id, frame) = {
            let mut inner = self.state.inner.lock();
            let frame_id = self.acquire_victim_frame(&mut inner)?;

            let page_id = PageId::new(inner.next_page_id);
            inner.next_page_id += 1;

            let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
            self.repurpose_frame(&mut inner, &frame, page_id)?;

            frame.pin();
            self.state.replacer.pin(frame_id);
            (page_id, frame)
        };

        Ok(unsafe { WritePageGuard::new(page_id, frame, Arc::clone(&self.state)) })
    }

    /// Pins a page without latching it.
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<BasicPageGuard> {
        let frame = self.fetch_frame(page_id)?;
        Ok(BasicPageGuard::new(page_id, frame, Arc::clone(&self.state)))
    }

    /// Fetches a page for shared access.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        let frame = self.fetch_frame(page_id)?;
        Ok(unsafe { ReadPageGuard::new(page_id, frame, Arc::clone(&self.state)) })
    }

    /// Fetches a page for exclusive access.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        let frame = self.fetch_frame(page_id)?;
        Ok(unsafe { WritePageGuard::new(page_id, frame, Arc::clone(&self.state)) })
    }

    /// Decrements a page's pin count. `is_dirty` ORs into the frame's
    /// dirty flag (a high-water mark cleared only by flushes/evictions).
    /// Returns false if the page is not resident or its pin count was
    /// already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.state.unpin_page(page_id, is_dirty)
    }

    /// Writes a page's current buffer to disk regardless of its dirty
    /// flag, then clears the flag. Pin count is unchanged.
    /// Returns Ok(false) for INVALID_PAGE_ID or a non-resident page.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        // Pin around the copy so the frame cannot be repurposed mid-flush.
        let frame = {
            let inner = self.state.inner.lock();
            let Some(&frame_id) = inner.page_table.get(&page_id) else {
                return Ok(false);
            };
            let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
            frame.pin();
            self.state.replacer.pin(frame_id);
            frame
        };

        let mut data = [0u8; PAGE_SIZE];
        frame.read_data(&mut data);

        let write_result = self.state.disk_scheduler.schedule_write_sync(page_id, &data);
        if write_result.is_ok() {
            frame.clear_dirty();
        }

        self.state.unpin_page(page_id, false);

        write_result.map(|_| true)
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let page_ids: Vec<PageId> = {
            let inner = self.state.inner.lock();
            inner.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Removes a page from the pool and returns its frame to the free
    /// list. The page's bytes are discarded without write-back; the id is
    /// logically dead afterwards.
    /// Returns Ok(true) if the page is absent (idempotent), Ok(false) if
    /// it is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        inner.page_table.remove(&page_id);
        frame.reset();
        // Clear the reference bit so the replacer cannot hand the frame
        // out while it sits on the free list.
        self.state.replacer.pin(frame_id);
        inner.free_list.push_back(frame_id);

        log::debug!("deleted page {} from frame {}", page_id, frame_id);
        Ok(true)
    }

    /// Returns the pin count for a resident page.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.state.inner.lock();
        inner
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].pin_count())
    }

    /// Returns the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of frames on the free list.
    pub fn free_frame_count(&self) -> usize {
        let inner = self.state.inner.lock();
        inner.free_list.len()
    }

    /// Returns the number of evictable frames tracked by the replacer.
    pub fn evictable_frame_count(&self) -> usize {
        self.state.replacer.size()
    }

    /// Pins the frame holding `page_id`, reading it from disk first if it
    /// is not resident.
    fn fetch_frame(&self, page_id: PageId) -> Result<Arc<FrameHeader>> {
        if page_id == INVALID_PAGE_ID {
            return Err(CrabtreeError::InvalidPageId(page_id));
        }

        let mut inner = self.state.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.state.frames[frame_id.as_usize()];
            frame.pin();
            self.state.replacer.pin(frame_id);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.acquire_victim_frame(&mut inner)?;
        let frame = Arc::clone(&self.state.frames[frame_id.as_usize()]);
        self.repurpose_frame(&mut inner, &frame, page_id)?;

        let mut data = [0u8; PAGE_SIZE];
        self.state
            .disk_scheduler
            .schedule_read_sync(page_id, &mut data)?;
        frame.write_data(&data);
        frame.clear_dirty();

        frame.pin();
        self.state.replacer.pin(frame_id);
        Ok(frame)
    }

    /// Picks a frame to (re)use: the free list first, then the replacer.
    fn acquire_victim_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }
        self.state
            .replacer
            .victim()
            .ok_or(CrabtreeError::PoolExhausted)
    }

    /// Retargets a victim frame from its current page to `new_page_id`:
    /// writes the old contents back if dirty, swaps the page table
    /// entries and leaves the frame zeroed with pin count 0.
    fn repurpose_frame(
        &self,
        inner: &mut PoolInner,
        frame: &FrameHeader,
        new_page_id: PageId,
    ) -> Result<()> {
        let old_page_id = frame.page_id();
        if old_page_id != INVALID_PAGE_ID {
            if frame.is_dirty() {
                let mut data = [0u8; PAGE_SIZE];
                frame.read_data(&mut data);
                self.state
                    .disk_scheduler
                    .schedule_write_sync(old_page_id, &data)?;
                log::debug!(
                    "evicted dirty page {} from frame {}",
                    old_page_id,
                    frame.frame_id()
                );
            }
            inner.page_table.remove(&old_page_id);
        }

        if new_page_id != INVALID_PAGE_ID {
            inner.page_table.insert(new_page_id, frame.frame_id());
        }

        frame.reset();
        frame.set_page_id(new_page_id);
        Ok(())
    }
}
