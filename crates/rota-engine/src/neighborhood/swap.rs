//! Full-evaluation swap neighborhood.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rota_core::{Evaluation, EvaluatorSet, Result, Roster, RotaError, SwapMove};

use super::MoveQueue;

/// Enumerates block-swap moves and evaluates each candidate against the
/// complete constraint catalog via delta queries.
///
/// For `E` employees, `D` days and block size `B` the neighborhood holds
/// `(D - B + 1) * E * (E - 1) / 2` moves. Enumeration order is by start day
/// (random when an RNG is attached, ascending otherwise), then by employee
/// pair.
pub struct SwapNeighborhood {
    evaluators: Arc<EvaluatorSet>,
    queue: MoveQueue,
    rng: Option<ChaCha8Rng>,
    only_improving: bool,
    last: Option<(SwapMove, Evaluation)>,
}

impl SwapNeighborhood {
    pub fn new(evaluators: Arc<EvaluatorSet>, block_size: usize) -> Result<Self> {
        if block_size < 1 {
            return Err(RotaError::InvalidArgument(
                "swap neighborhood block size must be at least 1".into(),
            ));
        }
        Ok(SwapNeighborhood {
            evaluators,
            queue: MoveQueue::new(block_size),
            rng: None,
            only_improving: false,
            last: None,
        })
    }

    /// Attaches an RNG; start days are then drawn in random order.
    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Restricts the best-neighbor operations to strictly improving moves.
    pub fn with_only_improving(mut self, only_improving: bool) -> Self {
        self.only_improving = only_improving;
        self
    }

    pub fn block_size(&self) -> usize {
        self.queue.block_size()
    }

    /// Changes the block size and discards the enumeration state.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<()> {
        if block_size < 1 {
            return Err(RotaError::InvalidArgument(
                "swap neighborhood block size must be at least 1".into(),
            ));
        }
        self.queue.set_block_size(block_size);
        self.last = None;
        Ok(())
    }

    /// Restarts enumeration from the origin roster.
    pub fn reset(&mut self, roster: &Roster) {
        self.queue.reset(roster);
        self.last = None;
    }

    /// Evaluates the next candidate move: the full evaluation the roster
    /// would have after applying it. `None` once the neighborhood is
    /// exhausted.
    pub fn next_neighbor_evaluation(&mut self, roster: &mut Roster) -> Option<Evaluation> {
        let mv = self.queue.next(roster, self.rng.as_mut())?;
        let evaluation = self.evaluators.predicted_evaluation(roster, &mv);
        self.last = Some((mv, evaluation.clone()));
        Some(evaluation)
    }

    /// Applies the last evaluated move to the origin and restarts
    /// enumeration. The applied roster carries the predicted evaluation as
    /// its cache.
    pub fn move_to_last_evaluated_neighbor(&mut self, roster: &mut Roster) -> Result<Evaluation> {
        let (mv, evaluation) = self.last.take().ok_or(RotaError::NoSuchNeighbor)?;
        self.evaluators.apply_swap(roster, &mv);
        self.reset(roster);
        Ok(evaluation)
    }

    /// Returns a clone of the origin with the last evaluated move applied;
    /// the origin is untouched and enumeration continues.
    pub fn last_evaluated_neighbor(&self, roster: &Roster) -> Result<Roster> {
        let (mv, evaluation) = self.last.as_ref().ok_or(RotaError::NoSuchNeighbor)?;
        let mut neighbor = roster.clone();
        mv.apply(&mut neighbor);
        neighbor.set_evaluation(evaluation.clone());
        Ok(neighbor)
    }

    /// Scans the whole neighborhood and returns its best move with the
    /// evaluation the roster would have after it. Ties keep the first
    /// encountered move. With `only_improving`, only moves strictly better
    /// than the current evaluation qualify.
    pub fn best_neighbor_evaluation(
        &mut self,
        roster: &mut Roster,
    ) -> Option<(SwapMove, Evaluation)> {
        self.reset(roster);
        let incumbent = if self.only_improving {
            Some(self.evaluators.evaluation(roster))
        } else {
            None
        };
        let mut best: Option<(SwapMove, Evaluation)> = None;
        while let Some(mv) = self.queue.next(roster, self.rng.as_mut()) {
            let evaluation = self.evaluators.predicted_evaluation(roster, &mv);
            let improves = match incumbent.as_ref() {
                Some(current) => evaluation < *current,
                None => true,
            };
            let beats_best = match best.as_ref() {
                Some((_, b)) => evaluation < *b,
                None => true,
            };
            if improves && beats_best {
                best = Some((mv, evaluation));
            }
        }
        self.last = best.clone();
        best
    }

    /// Applies the best move of the neighborhood, if any qualifies.
    pub fn move_to_best_neighbor(&mut self, roster: &mut Roster) -> Option<Evaluation> {
        let (mv, evaluation) = self.best_neighbor_evaluation(roster)?;
        self.evaluators.apply_swap(roster, &mv);
        self.reset(roster);
        Some(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{covered_roster, fixture_evaluators};
    use rand::SeedableRng;

    #[test]
    fn enumeration_is_exhaustive() {
        let mut roster = covered_roster(7, 4, 2);
        let evaluators = fixture_evaluators(roster.problem());
        let block = 3;
        let mut nh = SwapNeighborhood::new(evaluators, block).unwrap();
        nh.reset(&roster);
        let mut count = 0;
        while nh.next_neighbor_evaluation(&mut roster).is_some() {
            count += 1;
        }
        // (D - B + 1) * E * (E - 1) / 2
        assert_eq!(count, (7 - block + 1) * 4 * 3 / 2);
        // exhausted stays exhausted until reset
        assert!(nh.next_neighbor_evaluation(&mut roster).is_none());
        nh.reset(&roster);
        assert!(nh.next_neighbor_evaluation(&mut roster).is_some());
    }

    #[test]
    fn randomized_enumeration_covers_the_same_moves() {
        let mut roster = covered_roster(5, 3, 1);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapNeighborhood::new(evaluators, 2)
            .unwrap()
            .with_rng(ChaCha8Rng::seed_from_u64(9));
        nh.reset(&roster);
        let mut count = 0;
        while nh.next_neighbor_evaluation(&mut roster).is_some() {
            count += 1;
        }
        assert_eq!(count, (5 - 2 + 1) * 3 * 2 / 2);
    }

    #[test]
    fn neighbor_evaluation_matches_full_recomputation() {
        let mut roster = covered_roster(6, 4, 2);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapNeighborhood::new(evaluators.clone(), 2).unwrap();
        nh.reset(&roster);
        while let Some(predicted) = nh.next_neighbor_evaluation(&mut roster) {
            let neighbor = nh.last_evaluated_neighbor(&roster).unwrap();
            assert_eq!(evaluators.evaluate(&neighbor), predicted);
        }
    }

    #[test]
    fn move_to_last_applies_and_caches() {
        let mut roster = covered_roster(6, 4, 2);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapNeighborhood::new(evaluators.clone(), 1).unwrap();
        nh.reset(&roster);
        let predicted = nh.next_neighbor_evaluation(&mut roster).unwrap();
        let applied = nh.move_to_last_evaluated_neighbor(&mut roster).unwrap();
        assert_eq!(predicted, applied);
        assert_eq!(roster.evaluation(), Some(&predicted));
    }

    #[test]
    fn requesting_a_neighbor_before_evaluation_fails() {
        let mut roster = covered_roster(3, 2, 1);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapNeighborhood::new(evaluators, 1).unwrap();
        nh.reset(&roster);
        assert!(matches!(
            nh.last_evaluated_neighbor(&roster),
            Err(RotaError::NoSuchNeighbor)
        ));
        assert!(matches!(
            nh.move_to_last_evaluated_neighbor(&mut roster),
            Err(RotaError::NoSuchNeighbor)
        ));
    }

    #[test]
    fn best_neighbor_is_no_worse_than_every_candidate() {
        let mut roster = covered_roster(6, 4, 2);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapNeighborhood::new(evaluators, 2).unwrap();
        let (_, best) = nh.best_neighbor_evaluation(&mut roster).unwrap();
        nh.reset(&roster);
        while let Some(candidate) = nh.next_neighbor_evaluation(&mut roster) {
            assert!(best <= candidate);
        }
    }

    #[test]
    fn only_improving_best_rejects_plateaus() {
        // a roster already at its best for block size 1 yields no move
        let mut roster = covered_roster(3, 2, 1);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapNeighborhood::new(evaluators.clone(), 1)
            .unwrap()
            .with_only_improving(true);
        let current = evaluators.evaluation(&mut roster);
        if let Some((_, best)) = nh.best_neighbor_evaluation(&mut roster) {
            assert!(best < current);
        }
    }
}
