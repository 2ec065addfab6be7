//! Page replacement policies.
//!
//! Every policy sees the same notifications from the simulator:
//!
//! - `init_overhead` once per new virtual page
//! - `notify_load` right after the page becomes resident
//! - `notify_access` on every later hit against it
//! - `free_overhead` when its process finishes
//! - `choose_victim` only when no frame is free
//!
//! A victim returned by `choose_victim` is no longer tracked by the policy;
//! the simulator evicts that frame next and loads the faulted page into it.

mod clock;
mod fifo;
mod list;
mod lru;
mod random;

use std::fmt;

use crate::memory::{FrameId, PageRef, VirtualPage};

pub use clock::Clock;
pub use fifo::Fifo;
pub use list::NodeId;
pub use lru::Lru;
pub use random::Random;

/// Per-page bookkeeping private to a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    /// The policy keeps nothing per page
    Empty,
    /// Handle to the page's node in a list policy's arena
    ListNode(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Lru,
    Fifo,
    Clock,
    Random,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Lru,
        PolicyKind::Fifo,
        PolicyKind::Clock,
        PolicyKind::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Lru => "lru",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Clock => "clock",
            PolicyKind::Random => "random",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait ReplacementPolicy: fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// Create the policy's state for a freshly allocated page
    fn init_overhead(&mut self, page: PageRef) -> PolicyState;

    /// Discard a page's state; a resident page stops being tracked
    fn free_overhead(&mut self, page: &VirtualPage);

    /// The page was referenced while resident
    fn notify_access(&mut self, page: &VirtualPage);

    /// The page just became resident
    fn notify_load(&mut self, page: &VirtualPage);

    /// Pick an occupied frame to evict. Panics if nothing is resident.
    fn choose_victim(&mut self) -> FrameId;

    /// Frames the policy currently tracks as occupied, in eviction order
    /// where the policy has one. `None` when the policy tracks nothing.
    fn tracked_frames(&self) -> Option<Vec<FrameId>>;
}

/// Construct the policy for `kind` over `total_frames` frames
pub fn build(kind: PolicyKind, total_frames: u64, seed: u64) -> Box<dyn ReplacementPolicy> {
    match kind {
        PolicyKind::Lru => Box::new(Lru::new()),
        PolicyKind::Fifo => Box::new(Fifo::new()),
        PolicyKind::Clock => Box::new(Clock::new(total_frames)),
        PolicyKind::Random => Box::new(Random::new(total_frames, seed)),
    }
}
