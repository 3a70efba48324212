//! Biased swap neighborhood: delta evaluation over a subset of active
//! constraints.
//!
//! Used by progressive-descent construction, which grows the active set one
//! constraint at a time. Candidate quality is the per-rank cost delta of the
//! move over the active constraints only, compared against the zero delta.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rota_core::{Evaluation, EvaluatorSet, Result, Roster, RotaError, SwapMove};

use super::MoveQueue;

/// Per-rank indices of the constraints currently taken into account.
#[derive(Debug, Clone)]
pub struct ActiveSet {
    ranks: Vec<Vec<usize>>,
}

impl ActiveSet {
    /// An empty active set over `rank_count` ranks.
    pub fn empty(rank_count: usize) -> Self {
        ActiveSet {
            ranks: vec![Vec::new(); rank_count],
        }
    }

    /// The constraints flagged `initially_active` in the catalog.
    pub fn initially_active(evaluators: &EvaluatorSet) -> Self {
        let mut set = Self::empty(evaluators.rank_count());
        for rank in 0..evaluators.rank_count() {
            for index in 0..evaluators.constraint_count(rank) {
                if evaluators.is_initially_active(rank, index) {
                    set.ranks[rank].push(index);
                }
            }
        }
        set
    }

    pub fn activate(&mut self, rank: usize, index: usize) {
        if !self.ranks[rank].contains(&index) {
            self.ranks[rank].push(index);
        }
    }

    pub fn is_active(&self, rank: usize, index: usize) -> bool {
        self.ranks[rank].contains(&index)
    }

    pub fn active_in_rank(&self, rank: usize) -> &[usize] {
        &self.ranks[rank]
    }

    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn total(&self) -> usize {
        self.ranks.iter().map(|r| r.len()).sum()
    }
}

/// Swap neighborhood whose candidate quality is the cost delta over an
/// [`ActiveSet`] of constraints.
pub struct BiasedSwapNeighborhood {
    evaluators: Arc<EvaluatorSet>,
    active: ActiveSet,
    queue: MoveQueue,
    rng: Option<ChaCha8Rng>,
    only_improving: bool,
    last: Option<(SwapMove, Evaluation)>,
}

impl BiasedSwapNeighborhood {
    pub fn new(evaluators: Arc<EvaluatorSet>, active: ActiveSet, block_size: usize) -> Result<Self> {
        if block_size < 1 {
            return Err(RotaError::InvalidArgument(
                "swap neighborhood block size must be at least 1".into(),
            ));
        }
        if active.rank_count() != evaluators.rank_count() {
            return Err(RotaError::InvalidArgument(
                "active set rank count does not match the constraint catalog".into(),
            ));
        }
        Ok(BiasedSwapNeighborhood {
            evaluators,
            active,
            queue: MoveQueue::new(block_size),
            rng: None,
            only_improving: false,
            last: None,
        })
    }

    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn with_only_improving(mut self, only_improving: bool) -> Self {
        self.only_improving = only_improving;
        self
    }

    pub fn active_set(&self) -> &ActiveSet {
        &self.active
    }

    /// Swaps in a new active set; enumeration state is discarded.
    pub fn set_active(&mut self, active: ActiveSet) {
        self.active = active;
        let block_size = self.queue.block_size();
        self.queue.set_block_size(block_size);
        self.last = None;
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

    fn delta(&self, roster: &Roster, mv: &SwapMove) -> Evaluation {
        let mut delta = Evaluation::zero(self.evaluators.rank_count());
        for rank in 0..self.active.rank_count() {
            for &index in self.active.active_in_rank(rank) {
                delta.add_at(
                    rank,
                    self.evaluators
                        .evaluator(rank, index)
                        .swap_cost_difference(roster, mv),
                );
            }
        }
        delta
    }

    /// Delta of the next candidate move over the active constraints.
    pub fn next_neighbor_delta(&mut self, roster: &Roster) -> Option<Evaluation> {
        let mv = self.queue.next(roster, self.rng.as_mut())?;
        let delta = self.delta(roster, &mv);
        self.last = Some((mv, delta.clone()));
        Some(delta)
    }

    /// Applies the last evaluated move. The roster's full evaluation is
    /// unknown afterwards, so its cache is left invalidated.
    pub fn move_to_last_evaluated_neighbor(&mut self, roster: &mut Roster) -> Result<Evaluation> {
        let (mv, delta) = self.last.take().ok_or(RotaError::NoSuchNeighbor)?;
        mv.apply(roster);
        self.reset(roster);
        Ok(delta)
    }

    /// Best move by delta; with `only_improving`, only deltas strictly below
    /// zero qualify. Ties keep the first encountered move.
    pub fn best_neighbor_delta(&mut self, roster: &Roster) -> Option<(SwapMove, Evaluation)> {
        self.reset(roster);
        let zero = Evaluation::zero(self.evaluators.rank_count());
        let mut best: Option<(SwapMove, Evaluation)> = None;
        while let Some(mv) = self.queue.next(roster, self.rng.as_mut()) {
            let delta = self.delta(roster, &mv);
            if self.only_improving && delta >= zero {
                continue;
            }
            let beats_best = match best.as_ref() {
                Some((_, b)) => delta < *b,
                None => true,
            };
            if beats_best {
                best = Some((mv, delta));
            }
        }
        self.last = best.clone();
        best
    }

    /// Applies the best qualifying move, if any.
    pub fn move_to_best_neighbor(&mut self, roster: &mut Roster) -> Option<Evaluation> {
        let (mv, delta) = self.best_neighbor_delta(roster)?;
        mv.apply(roster);
        self.reset(roster);
        Some(delta)
    }
}
