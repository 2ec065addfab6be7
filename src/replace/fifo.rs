use crate::memory::{FrameId, PageRef, VirtualPage};

use super::list::{PageList, node_of, resident_frame};
use super::{PolicyKind, PolicyState, ReplacementPolicy};

/// First in, first out. Same list as [`Lru`](super::Lru), but hits never
/// reorder it.
#[derive(Debug, Default)]
pub struct Fifo {
    queue: PageList,
}

impl Fifo {
    pub fn new() -> Self {
        Fifo {
            queue: PageList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.len() == 0
    }
}

impl ReplacementPolicy for Fifo {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }

    fn init_overhead(&mut self, page: PageRef) -> PolicyState {
        PolicyState::ListNode(self.queue.alloc(page))
    }

    fn free_overhead(&mut self, page: &VirtualPage) {
        self.queue.release(node_of(page));
    }

    fn notify_access(&mut self, _page: &VirtualPage) {}

    fn notify_load(&mut self, page: &VirtualPage) {
        self.queue.push_back(node_of(page), resident_frame(page));
    }

    fn choose_victim(&mut self) -> FrameId {
        match self.queue.pop_front() {
            Some(frame) => frame,
            None => panic!("fifo: choose_victim called with no resident pages"),
        }
    }

    fn tracked_frames(&self) -> Option<Vec<FrameId>> {
        Some(self.queue.frames())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FrameTable;

    fn load(policy: &mut Fifo, frames: &mut FrameTable, vpn: u64) -> VirtualPage {
        let overhead = policy.init_overhead(PageRef::new(2, vpn));
        let mut page = VirtualPage::new(2, vpn, overhead);
        let frame = frames.allocate_free_frame();
        frames.load(frame, &mut page);
        policy.notify_load(&page);
        page
    }

    #[test]
    fn test_fifo_order_law() {
        let mut policy = Fifo::new();
        let mut frames = FrameTable::new(3);
        let a = load(&mut policy, &mut frames, 1);
        let b = load(&mut policy, &mut frames, 2);
        let c = load(&mut policy, &mut frames, 3);

        assert_eq!(policy.choose_victim(), a.current_frame().unwrap());
        assert_eq!(policy.choose_victim(), b.current_frame().unwrap());
        assert_eq!(policy.choose_victim(), c.current_frame().unwrap());
    }

    #[test]
    fn test_fifo_access_does_not_refresh() {
        let mut policy = Fifo::new();
        let mut frames = FrameTable::new(3);
        let a = load(&mut policy, &mut frames, 1);
        let _b = load(&mut policy, &mut frames, 2);
        let _c = load(&mut policy, &mut frames, 3);

        policy.notify_access(&a);
        policy.notify_access(&a);

        assert_eq!(policy.tracked_frames(), Some(vec![0, 1, 2]));
        assert_eq!(policy.choose_victim(), a.current_frame().unwrap());
    }

    #[test]
    fn test_fifo_reload_goes_to_tail() {
        let mut policy = Fifo::new();
        let mut frames = FrameTable::new(2);
        let mut a = load(&mut policy, &mut frames, 1);
        let _b = load(&mut policy, &mut frames, 2);

        let victim = policy.choose_victim();
        frames.evict(victim, &mut a);
        frames.load(victim, &mut a);
        policy.notify_load(&a);

        assert_eq!(policy.tracked_frames(), Some(vec![1, 0]));
        assert_eq!(policy.len(), 2);
    }

    #[test]
    #[should_panic(expected = "no resident pages")]
    fn test_fifo_victim_with_nothing_resident_panics() {
        let mut policy = Fifo::new();
        policy.choose_victim();
    }
}
