use rand::Rng;
use rand::seq::SliceRandom;

use crate::events::StepDirection;

/// Visiting order over slot indices plus the current/upcoming cursor.
#[derive(Debug, Clone, Default)]
pub struct PlaybackOrder {
    order: Vec<usize>,
    current: usize,
    upcoming: usize,
}

impl PlaybackOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the order with `slots`, shuffled (Fisher-Yates) when requested,
    /// and rewinds the cursor to the start.
    pub fn rebuild<R: Rng + ?Sized>(&mut self, slots: Vec<usize>, shuffle: bool, rng: &mut R) {
        self.order = slots;
        if shuffle {
            self.order.shuffle(rng);
        }
        self.current = 0;
        self.upcoming = 1.min(self.order.len().saturating_sub(1));
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.current = 0;
        self.upcoming = 0;
    }

    pub fn advance(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.current = self.upcoming;
        self.upcoming = (self.current + 1) % self.order.len();
    }

    /// Moves the cursor one position either way, wrapping at both ends.
    pub fn step(&mut self, direction: StepDirection) {
        let len = self.order.len();
        if len == 0 {
            return;
        }
        self.current = (self.current as isize + direction.delta()).rem_euclid(len as isize) as usize;
        self.upcoming = (self.current + 1) % len;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    /// Cursor positions (into the order, not slots).
    pub fn position(&self) -> (usize, usize) {
        (self.current, self.upcoming)
    }

    pub fn current_slot(&self) -> Option<usize> {
        self.order.get(self.current).copied()
    }

    pub fn upcoming_slot(&self) -> Option<usize> {
        self.order.get(self.upcoming).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        sorted == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn rebuild_yields_permutations_for_every_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = PlaybackOrder::new();
        for n in 0..40 {
            order.rebuild((0..n).collect(), false, &mut rng);
            assert_eq!(order.as_slice(), (0..n).collect::<Vec<_>>().as_slice());
            order.rebuild((0..n).collect(), true, &mut rng);
            assert!(is_permutation(order.as_slice(), n), "n={n}");
            assert_eq!(order.position(), (0, 1.min(n.saturating_sub(1))));
        }
    }

    #[test]
    fn reshuffle_keeps_every_index() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut order = PlaybackOrder::new();
        order.rebuild((0..12).collect(), true, &mut rng);
        let first = order.as_slice().to_vec();
        for _ in 0..20 {
            let slots = order.as_slice().to_vec();
            order.rebuild(slots, true, &mut rng);
            assert!(is_permutation(order.as_slice(), 12));
        }
        assert!(is_permutation(&first, 12));
    }

    #[test]
    fn advance_wraps_to_start() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut order = PlaybackOrder::new();
        order.rebuild(vec![4, 7, 9], false, &mut rng);
        assert_eq!((order.current_slot(), order.upcoming_slot()), (Some(4), Some(7)));
        order.advance();
        order.advance();
        assert_eq!((order.current_slot(), order.upcoming_slot()), (Some(9), Some(4)));
        order.advance();
        assert_eq!(order.position(), (0, 1));
    }

    #[test]
    fn step_handles_degenerate_lengths() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut order = PlaybackOrder::new();
        order.step(StepDirection::Forward);
        assert_eq!(order.current_slot(), None);

        order.rebuild(vec![3], false, &mut rng);
        order.step(StepDirection::Backward);
        assert_eq!(order.position(), (0, 0));
        order.step(StepDirection::Forward);
        assert_eq!((order.current_slot(), order.upcoming_slot()), (Some(3), Some(3)));

        order.rebuild(vec![0, 1], false, &mut rng);
        order.step(StepDirection::Backward);
        assert_eq!(order.position(), (1, 0));
        order.step(StepDirection::Forward);
        assert_eq!(order.position(), (0, 1));
    }
}
