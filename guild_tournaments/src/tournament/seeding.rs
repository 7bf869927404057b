//! Seed randomization performed once, at start, before the bracket is built.

use super::models::Participant;
use rand::{Rng, seq::SliceRandom};

/// Shuffles a roster and rewrites its seeds
pub struct SeedShuffler<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> SeedShuffler<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self { rng }
    }

    /// Apply a uniform random permutation, then re-seed 1..N in the new order
    pub fn shuffle(&mut self, participants: &mut [Participant]) {
        participants.shuffle(&mut *self.rng);
        reseed(participants);
    }
}

/// Rewrite seeds as dense 1-based indices in current roster order
pub fn reseed(participants: &mut [Participant]) {
    for (idx, participant) in participants.iter_mut().enumerate() {
        participant.seed = idx as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::BTreeSet;

    fn roster(n: i64) -> Vec<Participant> {
        (1..=n)
            .map(|id| Participant::new(id, format!("player{id}"), id as u32, Utc::now()))
            .collect()
    }

    #[test]
    fn test_shuffle_keeps_everyone_and_seeds_are_dense() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut participants = roster(9);
        SeedShuffler::new(&mut rng).shuffle(&mut participants);

        let ids: BTreeSet<_> = participants.iter().map(|p| p.id).collect();
        assert_eq!(ids, (1..=9).collect());

        let seeds: Vec<_> = participants.iter().map(|p| p.seed).collect();
        assert_eq!(seeds, (1..=9).collect::<Vec<u32>>());
    }

    #[test]
    fn test_same_rng_seed_same_order() {
        let mut first = roster(12);
        let mut second = roster(12);
        SeedShuffler::new(&mut StdRng::seed_from_u64(42)).shuffle(&mut first);
        SeedShuffler::new(&mut StdRng::seed_from_u64(42)).shuffle(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffle_randomizes_order() {
        let mut rng = StdRng::seed_from_u64(1234);
        let original: Vec<_> = roster(16).iter().map(|p| p.id).collect();

        // High probability that at least one of several shuffles moves someone
        let moved = (0..5).any(|_| {
            let mut participants = roster(16);
            SeedShuffler::new(&mut rng).shuffle(&mut participants);
            participants.iter().map(|p| p.id).collect::<Vec<_>>() != original
        });
        assert!(moved, "Roster order should be randomized");
    }

    #[test]
    fn test_reseed_after_removal() {
        let mut participants = roster(4);
        participants.remove(1);
        reseed(&mut participants);
        let pairs: Vec<_> = participants.iter().map(|p| (p.id, p.seed)).collect();
        assert_eq!(pairs, vec![(1, 1), (3, 2), (4, 3)]);
    }

    #[test]
    fn test_empty_roster() {
        let mut participants: Vec<Participant> = Vec::new();
        SeedShuffler::new(&mut rand::rng()).shuffle(&mut participants);
        assert!(participants.is_empty());
    }
}
