use std::fmt;

use bitvec::prelude::*;

use crate::replace::PolicyState;

pub type Pid = u64;
pub type Vpn = u64;
pub type FrameId = u64;

/// Identifies a virtual page by its owning process and page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRef {
    pub pid: Pid,
    pub vpn: Vpn,
}

impl PageRef {
    pub fn new(pid: Pid, vpn: Vpn) -> Self {
        PageRef { pid, vpn }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {} vpn {}", self.pid, self.vpn)
    }
}

/// A page in some process's address space.
///
/// Residency is derived from `current_frame`; there is no separate flag that
/// could drift out of sync with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPage {
    pub pid: Pid,
    pub vpn: Vpn,
    current_frame: Option<FrameId>,
    /// Bookkeeping owned by the replacement policy
    pub overhead: PolicyState,
}

impl VirtualPage {
    /// Create a non-resident page
    pub fn new(pid: Pid, vpn: Vpn, overhead: PolicyState) -> Self {
        VirtualPage {
            pid,
            vpn,
            current_frame: None,
            overhead,
        }
    }

    #[inline]
    pub fn page_ref(&self) -> PageRef {
        PageRef::new(self.pid, self.vpn)
    }

    #[inline]
    pub fn is_resident(&self) -> bool {
        self.current_frame.is_some()
    }

    #[inline]
    pub fn current_frame(&self) -> Option<FrameId> {
        self.current_frame
    }
}

/// One slot of physical memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalFrame {
    pub frame_number: FrameId,
    resident_page: Option<PageRef>,
}

impl PhysicalFrame {
    #[inline]
    pub fn resident_page(&self) -> Option<PageRef> {
        self.resident_page
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.resident_page.is_none()
    }
}

/// Tracks which frames are available for allocation
#[derive(Debug, Clone)]
pub struct FreeFrameList {
    used: BitVec,
}

impl FreeFrameList {
    /// All frames start out free
    pub fn new(total_frames: usize) -> Self {
        FreeFrameList {
            used: bitvec![0; total_frames],
        }
    }

    pub fn mark_occupied(&mut self, frame: FrameId) {
        self.used.set(frame as usize, true);
    }

    pub fn mark_free(&mut self, frame: FrameId) {
        self.used.set(frame as usize, false);
    }

    #[inline]
    pub fn is_free(&self, frame: FrameId) -> bool {
        !self.used[frame as usize]
    }

    /// Lowest-numbered free frame
    pub fn first_free(&self) -> Option<FrameId> {
        self.used.first_zero().map(|i| i as FrameId)
    }

    pub fn free_count(&self) -> u64 {
        self.used.count_zeros() as u64
    }

    pub fn used_count(&self) -> u64 {
        self.used.count_ones() as u64
    }
}

/// Physical memory: a fixed array of frames plus the free/used bitmap.
///
/// The table does not decide which page to evict; the simulator asks the
/// replacement policy for a victim and then calls [`FrameTable::evict`].
#[derive(Debug, Clone)]
pub struct FrameTable {
    frames: Vec<PhysicalFrame>,
    free: FreeFrameList,
}

impl FrameTable {
    /// Create a table of `total_frames` free frames
    pub fn new(total_frames: u64) -> Self {
        assert!(total_frames > 0, "frame table needs at least one frame");
        let frames = (0..total_frames)
            .map(|frame_number| PhysicalFrame {
                frame_number,
                resident_page: None,
            })
            .collect();
        FrameTable {
            frames,
            free: FreeFrameList::new(total_frames as usize),
        }
    }

    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.frames.len() as u64
    }

    #[inline]
    pub fn has_free_frame(&self) -> bool {
        self.free.free_count() > 0
    }

    #[inline]
    pub fn allocated_count(&self) -> u64 {
        self.free.used_count()
    }

    /// Lowest-numbered free frame. The frame stays free until [`load`] binds
    /// a page into it.
    ///
    /// Panics when memory is full; check [`has_free_frame`] first.
    ///
    /// [`load`]: FrameTable::load
    /// [`has_free_frame`]: FrameTable::has_free_frame
    pub fn allocate_free_frame(&self) -> FrameId {
        match self.free.first_free() {
            Some(frame) => frame,
            None => panic!("allocate_free_frame called with every frame in use"),
        }
    }

    /// Bind `page` into the free frame `frame_id`
    pub fn load(&mut self, frame_id: FrameId, page: &mut VirtualPage) {
        let frame = &mut self.frames[frame_id as usize];
        assert!(
            frame.resident_page.is_none(),
            "frame {} already holds {:?}",
            frame_id,
            frame.resident_page
        );
        assert!(
            !page.is_resident(),
            "{} is already resident in frame {:?}",
            page.page_ref(),
            page.current_frame
        );

        frame.resident_page = Some(page.page_ref());
        page.current_frame = Some(frame_id);
        self.free.mark_occupied(frame_id);
    }

    /// Unbind the page held in `frame_id`; `page` must be that page
    pub fn evict(&mut self, frame_id: FrameId, page: &mut VirtualPage) {
        let frame = &mut self.frames[frame_id as usize];
        assert_eq!(
            frame.resident_page,
            Some(page.page_ref()),
            "evicting frame {} which does not hold {}",
            frame_id,
            page.page_ref()
        );
        assert_eq!(page.current_frame, Some(frame_id));

        frame.resident_page = None;
        page.current_frame = None;
        self.free.mark_free(frame_id);
    }

    /// The page currently held by a frame, if any
    #[inline]
    pub fn resident_page(&self, frame_id: FrameId) -> Option<PageRef> {
        self.frames[frame_id as usize].resident_page
    }

    pub fn frame(&self, frame_id: FrameId) -> &PhysicalFrame {
        &self.frames[frame_id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhysicalFrame> {
        self.frames.iter()
    }
}
