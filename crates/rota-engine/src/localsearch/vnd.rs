//! Variable Neighborhood Descent with full evaluation.

use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Result, Roster, RotaError};

use crate::neighborhood::SwapNeighborhood;
use crate::operator::{not_initialized, single_input, StepOperator};
use rota_config::SelectionPolicy;

/// Descends through swap neighborhoods of growing block size.
///
/// Starts at the first ladder entry. Whenever an improving move is found
/// (first or best, per policy) it is applied and the ladder resets to its
/// first entry; otherwise the next block size is tried. The descent is done
/// once the ladder is exhausted: the roster is then a local optimum of every
/// ladder neighborhood.
pub struct VariableNeighborhoodDescent {
    evaluators: Arc<EvaluatorSet>,
    ladder: Vec<usize>,
    policy: SelectionPolicy,
    neighborhood: SwapNeighborhood,
    roster: Option<Roster>,
    ladder_index: usize,
    done: bool,
}

impl VariableNeighborhoodDescent {
    pub fn new(
        evaluators: Arc<EvaluatorSet>,
        ladder: Vec<usize>,
        policy: SelectionPolicy,
    ) -> Result<Self> {
        if ladder.is_empty() {
            return Err(RotaError::InvalidArgument(
                "VND requires a non-empty ladder of block sizes".into(),
            ));
        }
        let neighborhood =
            SwapNeighborhood::new(evaluators.clone(), ladder[0])?.with_only_improving(true);
        Ok(VariableNeighborhoodDescent {
            evaluators,
            ladder,
            policy,
            neighborhood,
            roster: None,
            ladder_index: 0,
            done: false,
        })
    }

    /// Attaches an RNG to the underlying neighborhood: start days are then
    /// enumerated in random order.
    pub fn with_rng(mut self, rng: ChaCha8Rng) -> Self {
        self.neighborhood = self.neighborhood.with_rng(rng);
        self
    }

    /// The roster currently being descended, if a run is active.
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

impl StepOperator for VariableNeighborhoodDescent {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let mut roster = single_input(inputs, "VariableNeighborhoodDescent")?;
        // prime the evaluation cache; all deltas hang off it
        self.evaluators.evaluation(&mut roster);
        self.restart_ladder(&roster)?;
        self.roster = Some(roster);
        self.done = false;
        Ok(())
    }

    /// One step examines the current neighborhood once: either applies one
    /// improving move (and resets the ladder) or advances the ladder.
    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let mut roster = self
            .roster
            .take()
            .ok_or_else(|| not_initialized("VariableNeighborhoodDescent"))?;

        let improved = match self.policy {
            SelectionPolicy::FirstImproving => {
                let current = self.evaluators.evaluation(&mut roster);
                let mut improved = false;
                while let Some(candidate) = self.neighborhood.next_neighbor_evaluation(&mut roster)
                {
                    if candidate < current {
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
