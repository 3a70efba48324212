//! Variable Neighborhood Descent over an active constraint subset.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Result, Roster, RotaError};

use crate::neighborhood::{ActiveSet, BiasedSwapNeighborhood};
use crate::operator::{not_initialized, single_input, StepOperator};
use rota_config::SelectionPolicy;

/// VND variant driven by [`BiasedSwapNeighborhood`]: move quality is the
/// cost delta over the active constraints, compared lexicographically
/// against the zero delta.
///
/// Leaves the result's evaluation cache invalidated, since the biased delta
/// says nothing about inactive constraints.
pub struct BiasedVariableNeighborhoodDescent {
    ladder: Vec<usize>,
    policy: SelectionPolicy,
    neighborhood: BiasedSwapNeighborhood,
    zero: rota_core::Evaluation,
    roster: Option<Roster>,
    ladder_index: usize,
    done: bool,
}

impl BiasedVariableNeighborhoodDescent {
    pub fn new(
        evaluators: Arc<EvaluatorSet>,
        active: ActiveSet,
        ladder: Vec<usize>,
        policy: SelectionPolicy,
    ) -> Result<Self> {
        if ladder.is_empty() {
            return Err(RotaError::InvalidArgument(
                "VND requires a non-empty ladder of block sizes".into(),
            ));
        }
        let zero = rota_core::Evaluation::zero(evaluators.rank_count());
        let neighborhood = BiasedSwapNeighborhood::new(evaluators, active, ladder[0])?
            .with_only_improving(true);
        Ok(BiasedVariableNeighborhoodDescent {
            ladder,
            policy,
            neighborhood,
            zero,
            roster: None,
            ladder_index: 0,
            done: false,
        })
    }

    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.neighborhood = self.neighborhood.with_rng(rng);
        self
    }

    /// Replaces the active constraint subset for the next run.
    pub fn set_active(&mut self, active: ActiveSet) {
        self.neighborhood.set_active(active);
    }

    pub fn working(&self) -> Option<&Roster> {
        self.roster.as_ref()
    }

    fn advance_ladder(&mut self, roster: &Roster) -> Result<()> {
        self.ladder_index += 1;
        if self.ladder_index == self.ladder.len() {
            self.done = true;
        } else {
            self.neighborhood.set_block_size(self.ladder[self.ladder_index])?;
            self.neighborhood.reset(roster);
        }
        Ok(())
    }

    fn restart_ladder(&mut self, roster: &Roster) -> Result<()> {
        self.ladder_index = 0;
        self.neighborhood.set_block_size(self.ladder[0])?;
        self.neighborhood.reset(roster);
        Ok(())
    }
}

impl StepOperator for BiasedVariableNeighborhoodDescent {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let roster = single_input(inputs, "BiasedVariableNeighborhoodDescent")?;
        self.restart_ladder(&roster)?;
        self.roster = Some(roster);
        self.done = false;
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let mut roster = self
            .roster
            .take()
            .ok_or_else(|| not_initialized("BiasedVariableNeighborhoodDescent"))?;

        let improved = match self.policy {
            SelectionPolicy::FirstImproving => {
                let mut improved = false;
                while let Some(delta) = self.neighborhood.next_neighbor_delta(&roster) {
                    if delta < self.zero {
                        self.neighborhood
                            .move_to_last_evaluated_neighbor(&mut roster)?;
                        improved = true;
                        break;
                    }
                }
                improved
            }
            SelectionPolicy::BestImproving => {
                self.neighborhood.move_to_best_neighbor(&mut roster).is_some()
            }
        };

        if improved {
            self.restart_ladder(&roster)?;
        } else {
            self.advance_ladder(&roster)?;
        }
        self.roster = Some(roster);
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
