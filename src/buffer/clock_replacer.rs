use parking_lot::Mutex;

use crate::common::FrameId;

struct ClockState {
    /// One reference bit per frame. A set bit marks the frame as a
    /// victim candidate; pinned frames always have the bit cleared.
    ref_flags: Vec<bool>,
    /// The rotating clock hand
    hand: usize,
}

/// Clock replacement policy.
///
/// The reference bit here is inverted relative to the textbook clock:
/// `unpin` sets the bit ("this frame became evictable") and `pin` clears
/// it, so `victim` skips pinned frames without any extra bookkeeping.
pub struct ClockReplacer {
    num_frames: usize,
    state: Mutex<ClockState>,
}

impl ClockReplacer {
    /// Creates a replacer tracking `num_frames` frames, all initially
    /// non-evictable.
    pub fn new(num_frames: usize) -> Self {
        Self {
            num_frames,
            state: Mutex::new(ClockState {
                ref_flags: vec![false; num_frames],
                hand: 0,
            }),
        }
    }

    /// Selects a victim frame: starting at the hand, sweeps at most one
    /// full revolution looking for a set reference bit. The chosen
    /// frame's bit is cleared and the hand moves past it.
    /// Returns None if no frame is evictable.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock();

        let mut current = state.hand;
        for _ in 0..self.num_frames {
            if !state.ref_flags[current] {
                current = self.next_slot(current);
                continue;
            }
            state.ref_flags[current] = false;
            state.hand = self.next_slot(current);
            return Some(FrameId::new(current as u32));
        }
        None
    }

    /// Marks a frame as in use again: clears its reference bit and
    /// advances the hand to the slot after it.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        state.hand = self.next_slot(frame_id.as_usize());
        state.ref_flags[frame_id.as_usize()] = false;
    }

    /// Marks a frame as a victim candidate by setting its reference bit.
    /// Called when a frame's pin count drops to zero.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        state.ref_flags[frame_id.as_usize()] = true;
    }

    /// Returns the number of evictable frames (set reference bits).
    pub fn size(&self) -> usize {
        let state = self.state.lock();
        state.ref_flags.iter().filter(|&&flag| flag).count()
    }

    fn next_slot(&self, slot: usize) -> usize {
        (slot + 1) % self.num_frames
    }
}
