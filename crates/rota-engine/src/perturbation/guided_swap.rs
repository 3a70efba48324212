//! Satisfaction-guided swap perturbation.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Result, Roster, RotaError, SatisfactionDelta, SwapMove};

use super::min_slot_exchanges;
use crate::construction::MAX_ASSIGNMENT_BLOCK;
use crate::neighborhood::{NoReturnFilter, SwapConstraintSatisfactionNeighborhood};
use crate::operator::{not_initialized, single_input, StepOperator};
use rota_config::SelectionPolicy;

/// Disturbs the roster through swap moves that newly satisfy constraint
/// units, never returning to the pre-perturbation assignments.
///
/// Move selection per the configured policy: the first move with a positive
/// newly-satisfied count, or the best such move (most newly satisfied,
/// fewest newly unsatisfied). When no satisfying move exists, any move that
/// alters the roster is taken instead.
pub struct GuidedSwapPerturbation {
    evaluators: Arc<EvaluatorSet>,
    strength: f64,
    policy: SelectionPolicy,
    rng: ChaCha8Rng,
    neighborhood: Option<SwapConstraintSatisfactionNeighborhood>,
    roster: Option<Roster>,
    required: usize,
    changed: usize,
    done: bool,
}

impl GuidedSwapPerturbation {
    pub fn new(
        evaluators: Arc<EvaluatorSet>,
        strength: f64,
        policy: SelectionPolicy,
    ) -> Result<Self> {
        if strength < 0.0 {
            return Err(RotaError::InvalidArgument(format!(
                "perturbation strength must be non-negative, got {strength}"
            )));
        }
        Ok(GuidedSwapPerturbation {
            evaluators,
            strength,
            policy,
            rng: ChaCha8Rng::from_os_rng(),
            neighborhood: None,
            roster: None,
            required: 0,
            changed: 0,
            done: false,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Candidate under the configured policy, or `None` when no move newly
    /// satisfies anything.
    fn select_satisfying(
        neighborhood: &mut SwapConstraintSatisfactionNeighborhood,
        roster: &Roster,
        policy: SelectionPolicy,
    ) -> Option<SwapMove> {
        match policy {
            SelectionPolicy::FirstImproving => {
                while let Some((mv, delta)) = neighborhood.next_neighbor(roster) {
                    if delta.newly_satisfied > 0 {
                        return Some(mv);
                    }
                }
                None
            }
            SelectionPolicy::BestImproving => {
                let mut best: Option<(SwapMove, SatisfactionDelta)> = None;
                while let Some((mv, delta)) = neighborhood.next_neighbor(roster) {
                    if delta.newly_satisfied == 0 {
                        continue;
                    }
                    let beats = match best {
                        Some((_, b)) => {
                            delta.newly_satisfied > b.newly_satisfied
                                || (delta.newly_satisfied == b.newly_satisfied
                                    && delta.newly_unsatisfied < b.newly_unsatisfied)
                        }
                        None => true,
                    };
                    if beats {
                        best = Some((mv, delta));
                    }
                }
                best.map(|(mv, _)| mv)
            }
        }
    }

    /// First filtered move that changes at least one cell.
    fn select_altering(
        neighborhood: &mut SwapConstraintSatisfactionNeighborhood,
        roster: &Roster,
    ) -> Option<SwapMove> {
        while let Some((mv, _)) = neighborhood.next_neighbor(roster) {
            if mv.is_effective(roster) {
                return Some(mv);
            }
        }
        None
    }
}

impl StepOperator for GuidedSwapPerturbation {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let roster = single_input(inputs, "GuidedSwapPerturbation")?;
        self.required = min_slot_exchanges(self.strength, &roster);
        self.changed = 0;
        self.done = false;
        let filter = NoReturnFilter::of(&roster);
        let nh_seed = self.rng.random();
        self.neighborhood = Some(
            SwapConstraintSatisfactionNeighborhood::new(self.evaluators.clone(), 1)?
                .with_rng(ChaCha8Rng::seed_from_u64(nh_seed))
                .with_filter(Box::new(filter)),
        );
        self.roster = Some(roster);
        Ok(())
    }

    /// One step selects and applies one swap move.
    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let (roster, neighborhood) = match (self.roster.as_mut(), self.neighborhood.as_mut()) {
            (Some(roster), Some(neighborhood)) => (roster, neighborhood),
            _ => return Err(not_initialized("GuidedSwapPerturbation")),
        };
        let days = roster.day_count();
        let block = self.rng.random_range(1..=MAX_ASSIGNMENT_BLOCK).min(days);
        neighborhood.set_block_size(block)?;
        neighborhood.reset(roster);

        let chosen = Self::select_satisfying(neighborhood, roster, self.policy).or_else(|| {
            neighborhood.reset(roster);
            Self::select_altering(neighborhood, roster)
        });
        let Some(mv) = chosen else {
            // nothing the filter allows can change the roster anymore
            self.done = true;
            return Ok(true);
        };

        let changed_days = mv
            .days()
            .filter(|&d| roster.assignment(d, mv.employee1()) != roster.assignment(d, mv.employee2()))
            .count();
        mv.apply(roster);
        self.changed += 2 * changed_days;

        self.done = self.changed >= self.required;
        Ok(self.done)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<Roster> {
        if self.done {
            self.roster.take()
        } else {
            None
        }
    }
}
