//! Constraint-satisfaction swap neighborhood.
//!
//! Candidate quality is the pair (newly satisfied, newly unsatisfied)
//! summed over every constraint evaluator. Supports an optional move filter
//! used as a tabu mechanism by guided perturbation.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Result, Roster, RotaError, SatisfactionDelta, SwapMove};

use super::{MoveQueue, SwapMoveFilter};

/// Swap neighborhood scored by satisfaction counts instead of cost.
pub struct SwapConstraintSatisfactionNeighborhood {
    evaluators: Arc<EvaluatorSet>,
    queue: MoveQueue,
    rng: Option<ChaCha8Rng>,
    filter: Option<Box<dyn SwapMoveFilter>>,
    last: Option<(SwapMove, SatisfactionDelta)>,
}

impl SwapConstraintSatisfactionNeighborhood {
    pub fn new(evaluators: Arc<EvaluatorSet>, block_size: usize) -> Result<Self> {
        if block_size < 1 {
            return Err(RotaError::InvalidArgument(
                "swap neighborhood block size must be at least 1".into(),
            ));
        }
        Ok(SwapConstraintSatisfactionNeighborhood {
            evaluators,
            queue: MoveQueue::new(block_size),
            rng: None,
            filter: None,
            last: None,
        })
    }

    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Installs a move filter; rejected moves are skipped silently.
    pub fn with_filter(mut self, filter: Box<dyn SwapMoveFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

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

    pub fn reset(&mut self, roster: &Roster) {
        self.queue.reset(roster);
        self.last = None;
    }

    /// Next candidate passing the filter, with its satisfaction delta.
    pub fn next_neighbor(&mut self, roster: &Roster) -> Option<(SwapMove, SatisfactionDelta)> {
        loop {
            let mv = self.queue.next(roster, self.rng.as_mut())?;
            if let Some(filter) = &self.filter {
                if !filter.accepts(roster, &mv) {
                    continue;
                }
            }
            let delta = self.evaluators.satisfaction_delta(roster, &mv);
            self.last = Some((mv, delta));
            return Some((mv, delta));
        }
    }

    /// Satisfaction delta of the next candidate.
    pub fn next_neighbor_evaluation(&mut self, roster: &Roster) -> Option<SatisfactionDelta> {
        self.next_neighbor(roster).map(|(_, delta)| delta)
    }

    /// Applies the last evaluated move; the evaluation cache is left
    /// invalidated (satisfaction counts say nothing about cost).
    pub fn move_to_last_evaluated_neighbor(
        &mut self,
        roster: &mut Roster,
    ) -> Result<SatisfactionDelta> {
        let (mv, delta) = self.last.take().ok_or(RotaError::NoSuchNeighbor)?;
        mv.apply(roster);
        self.reset(roster);
        Ok(delta)
    }

    pub fn last_move(&self) -> Option<SwapMove> {
        self.last.as_ref().map(|(mv, _)| *mv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighborhood::NoReturnFilter;
    use crate::test_utils::{covered_roster, fixture_evaluators};

    #[test]
    fn deltas_match_the_facade() {
        let roster = covered_roster(5, 3, 1);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh =
            SwapConstraintSatisfactionNeighborhood::new(evaluators.clone(), 2).unwrap();
        nh.reset(&roster);
        while let Some((mv, delta)) = nh.next_neighbor(&roster) {
            assert_eq!(delta, evaluators.satisfaction_delta(&roster, &mv));
        }
    }

    #[test]
    fn filter_prunes_the_enumeration() {
        let roster = covered_roster(5, 3, 1);
        let evaluators = fixture_evaluators(roster.problem());

        struct RejectAll;
        impl SwapMoveFilter for RejectAll {
            fn accepts(&self, _roster: &Roster, _mv: &SwapMove) -> bool {
                false
            }
        }

        let mut nh = SwapConstraintSatisfactionNeighborhood::new(evaluators, 1)
            .unwrap()
            .with_filter(Box::new(RejectAll));
        nh.reset(&roster);
        assert!(nh.next_neighbor(&roster).is_none());
    }

    #[test]
    fn no_return_filter_blocks_the_undo_move() {
        let mut roster = covered_roster(5, 3, 1);
        let evaluators = fixture_evaluators(roster.problem());
        let filter = NoReturnFilter::of(&roster);
        let applied = SwapMove::new(0, 1, 0, 2).unwrap();
        applied.apply(&mut roster);

        let mut nh = SwapConstraintSatisfactionNeighborhood::new(evaluators, 2)
            .unwrap()
            .with_filter(Box::new(filter));
        nh.reset(&roster);
        while let Some((mv, _)) = nh.next_neighbor(&roster) {
            assert_ne!(mv, applied, "the reverting move must be filtered out");
        }
    }

    #[test]
    fn move_to_last_requires_an_evaluated_candidate() {
        let mut roster = covered_roster(3, 2, 1);
        let evaluators = fixture_evaluators(roster.problem());
        let mut nh = SwapConstraintSatisfactionNeighborhood::new(evaluators, 1).unwrap();
        nh.reset(&roster);
        assert!(matches!(
            nh.move_to_last_evaluated_neighbor(&mut roster),
            Err(RotaError::NoSuchNeighbor)
        ));
    }
}
