use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::memory::{FrameId, PageRef, VirtualPage};

use super::{PolicyKind, PolicyState, ReplacementPolicy};

/// Uniform random victim. Seeded, so a run is reproducible.
#[derive(Debug)]
pub struct Random {
    total_frames: u64,
    rng: StdRng,
}

impl Random {
    pub fn new(total_frames: u64, seed: u64) -> Self {
        assert!(total_frames > 0, "random needs at least one frame");
        Random {
            total_frames,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ReplacementPolicy for Random {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Random
    }

    fn init_overhead(&mut self, _page: PageRef) -> PolicyState {
        PolicyState::Empty
    }

    fn free_overhead(&mut self, _page: &VirtualPage) {}

    fn notify_access(&mut self, _page: &VirtualPage) {}

    fn notify_load(&mut self, _page: &VirtualPage) {}

    fn choose_victim(&mut self) -> FrameId {
        self.rng.random_range(0..self.total_frames)
    }

    fn tracked_frames(&self) -> Option<Vec<FrameId>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_victims_in_range() {
        let mut policy = Random::new(5, 42);
        for _ in 0..1000 {
            assert!(policy.choose_victim() < 5);
        }
    }

    #[test]
    fn test_random_same_seed_same_sequence() {
        let mut a = Random::new(64, 537);
        let mut b = Random::new(64, 537);
        let seq_a: Vec<FrameId> = (0..32).map(|_| a.choose_victim()).collect();
        let seq_b: Vec<FrameId> = (0..32).map(|_| b.choose_victim()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_random_covers_every_frame() {
        let mut policy = Random::new(4, 3);
        let mut seen = [false; 4];
        for _ in 0..1000 {
            seen[policy.choose_victim() as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_random_single_frame() {
        let mut policy = Random::new(1, 9);
        assert_eq!(policy.choose_victim(), 0);
    }
}
