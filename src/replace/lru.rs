use crate::memory::{FrameId, PageRef, VirtualPage};

use super::list::{PageList, node_of, resident_frame};
use super::{PolicyKind, PolicyState, ReplacementPolicy};

/// Least recently used: victims come from the head of a recency list and
/// every hit moves the page to the tail.
#[derive(Debug, Default)]
pub struct Lru {
    list: PageList,
}

impl Lru {
    pub fn new() -> Self {
        Lru {
            list: PageList::new(),
        }
    }

    /// Number of resident pages being tracked
    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.len() == 0
    }
}

impl ReplacementPolicy for Lru {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }

    fn init_overhead(&mut self, page: PageRef) -> PolicyState {
        PolicyState::ListNode(self.list.alloc(page))
    }

    fn free_overhead(&mut self, page: &VirtualPage) {
        self.list.release(node_of(page));
    }

    fn notify_access(&mut self, page: &VirtualPage) {
        self.list.move_to_back(node_of(page));
    }

    fn notify_load(&mut self, page: &VirtualPage) {
        self.list.push_back(node_of(page), resident_frame(page));
    }

    fn choose_victim(&mut self) -> FrameId {
        match self.list.pop_front() {
            Some(frame) => frame,
            None => panic!("lru: choose_victim called with no resident pages"),
        }
    }

    fn tracked_frames(&self) -> Option<Vec<FrameId>> {
        Some(self.list.frames())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FrameTable;

    fn load_pages(policy: &mut Lru, frames: &mut FrameTable, vpns: &[u64]) -> Vec<VirtualPage> {
        vpns.iter()
            .map(|&vpn| {
                let overhead = policy.init_overhead(PageRef::new(1, vpn));
                let mut page = VirtualPage::new(1, vpn, overhead);
                let frame = frames.allocate_free_frame();
                frames.load(frame, &mut page);
                policy.notify_load(&page);
                page
            })
            .collect()
    }

    #[test]
    fn test_lru_without_access_evicts_in_load_order() {
        let mut policy = Lru::new();
        let mut frames = FrameTable::new(3);
        let pages = load_pages(&mut policy, &mut frames, &[10, 11, 12]);

        let order: Vec<FrameId> = (0..3).map(|_| policy.choose_victim()).collect();
        let expected: Vec<FrameId> = pages.iter().filter_map(VirtualPage::current_frame).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_lru_recency_law() {
        // Load A, B, C then touch A: eviction order becomes B, C, A
        let mut policy = Lru::new();
        let mut frames = FrameTable::new(3);
        let pages = load_pages(&mut policy, &mut frames, &[1, 2, 3]);
        let (a, b, c) = (&pages[0], &pages[1], &pages[2]);

        policy.notify_access(a);

        assert_eq!(policy.choose_victim(), b.current_frame().unwrap());
        assert_eq!(policy.choose_victim(), c.current_frame().unwrap());
        assert_eq!(policy.choose_victim(), a.current_frame().unwrap());
        assert!(policy.is_empty());
    }

    #[test]
    fn test_lru_free_overhead_of_resident_page() {
        let mut policy = Lru::new();
        let mut frames = FrameTable::new(3);
        let pages = load_pages(&mut policy, &mut frames, &[1, 2, 3]);

        policy.free_overhead(&pages[0]);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.tracked_frames(), Some(vec![1, 2]));
    }

    #[test]
    fn test_lru_free_overhead_of_evicted_page() {
        let mut policy = Lru::new();
        let mut frames = FrameTable::new(1);
        let mut pages = load_pages(&mut policy, &mut frames, &[1]);

        let victim = policy.choose_victim();
        frames.evict(victim, &mut pages[0]);
        policy.free_overhead(&pages[0]);
        assert!(policy.is_empty());
    }

    #[test]
    #[should_panic(expected = "no resident pages")]
    fn test_lru_victim_with_nothing_resident_panics() {
        let mut policy = Lru::new();
        policy.choose_victim();
    }
}
