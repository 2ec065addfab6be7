use bitvec::prelude::*;

use crate::memory::{FrameId, PageRef, VirtualPage};

use super::{PolicyKind, PolicyState, ReplacementPolicy};

/// Second-chance clock over frames.
///
/// Reference bits live in a shadow array indexed by frame number, not on the
/// pages. `occupied` mirrors which frames hold a page the policy was told
/// about, so the sweep never hands back a free frame.
#[derive(Debug)]
pub struct Clock {
    referenced: BitVec,
    occupied: BitVec,
    hand: usize,
}

impl Clock {
    pub fn new(total_frames: u64) -> Self {
        assert!(total_frames > 0, "clock needs at least one frame");
        Clock {
            referenced: bitvec![0; total_frames as usize],
            occupied: bitvec![0; total_frames as usize],
            hand: 0,
        }
    }

    /// Frame the next sweep starts from
    pub fn hand(&self) -> FrameId {
        self.hand as FrameId
    }

    pub fn is_referenced(&self, frame: FrameId) -> bool {
        self.referenced[frame as usize]
    }

    fn frame_of(page: &VirtualPage) -> usize {
        match page.current_frame() {
            Some(frame) => frame as usize,
            None => panic!("clock: {} is not resident", page.page_ref()),
        }
    }
}

impl ReplacementPolicy for Clock {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Clock
    }

    fn init_overhead(&mut self, _page: PageRef) -> PolicyState {
        PolicyState::Empty
    }

    fn free_overhead(&mut self, page: &VirtualPage) {
        if let Some(frame) = page.current_frame() {
            self.referenced.set(frame as usize, false);
            self.occupied.set(frame as usize, false);
        }
    }

    fn notify_access(&mut self, page: &VirtualPage) {
        self.referenced.set(Self::frame_of(page), true);
    }

    fn notify_load(&mut self, page: &VirtualPage) {
        let frame = Self::frame_of(page);
        self.referenced.set(frame, true);
        self.occupied.set(frame, true);
    }

    fn choose_victim(&mut self) -> FrameId {
        assert!(
            self.occupied.any(),
            "clock: choose_victim called with no resident pages"
        );
        let frames = self.referenced.len();

        // Terminates within two revolutions: the first clears every set bit
        loop {
            let frame = self.hand;
            self.hand = (self.hand + 1) % frames;
            if !self.occupied[frame] {
                continue;
            }
            if self.referenced[frame] {
                self.referenced.set(frame, false);
            } else {
                self.occupied.set(frame, false);
                return frame as FrameId;
            }
        }
    }

    fn tracked_frames(&self) -> Option<Vec<FrameId>> {
        Some(self.occupied.iter_ones().map(|f| f as FrameId).collect())
    }
}
