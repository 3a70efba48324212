//! Constraint-activation ladder construction.
//!
//! Starts from a fast random construction, then repeatedly runs a biased
//! descent over the currently active constraints, activating one more
//! (disabled) constraint after each local optimum until none remain.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Problem, Result, Roster, RotaError};
use tracing::debug;

use super::FastBlockConstruction;
use crate::localsearch::BiasedVariableNeighborhoodDescent;
use crate::neighborhood::ActiveSet;
use crate::operator::StepOperator;
use rota_config::SelectionPolicy;

enum Phase {
    Idle,
    Construct,
    Descend,
    Done,
}

/// Construction with progressive descent over a growing constraint set.
///
/// Coverage-style constraints (flagged `initially_active`) are enforced from
/// the start; all others begin disabled, in randomized per-rank order, and
/// are activated lowest rank first.
pub struct ConstructionWithProgressiveDescent {
    evaluators: Arc<EvaluatorSet>,
    rng: ChaCha8Rng,
    fast: FastBlockConstruction,
    descent: BiasedVariableNeighborhoodDescent,
    active: ActiveSet,
    disabled: Vec<VecDeque<usize>>,
    phase: Phase,
    result: Option<Roster>,
}

impl ConstructionWithProgressiveDescent {
    pub fn new(
        problem: Arc<Problem>,
        evaluators: Arc<EvaluatorSet>,
        block_sizes: Vec<usize>,
        policy: SelectionPolicy,
    ) -> Result<Self> {
        let active = ActiveSet::initially_active(&evaluators);
        let descent = BiasedVariableNeighborhoodDescent::new(
            evaluators.clone(),
            active.clone(),
            block_sizes,
            policy,
        )?;
        Ok(ConstructionWithProgressiveDescent {
            evaluators,
            rng: ChaCha8Rng::from_os_rng(),
            fast: FastBlockConstruction::new(problem),
            descent,
            active,
            disabled: Vec::new(),
            phase: Phase::Idle,
            result: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        let fast_seed = self.rng.random();
        self.fast = self.fast.with_seed(fast_seed);
        self
    }

    /// Next disabled constraint, lowest rank first.
    fn pop_disabled(&mut self) -> Option<(usize, usize)> {
        for (rank, queue) in self.disabled.iter_mut().enumerate() {
            if let Some(index) = queue.pop_front() {
                return Some((rank, index));
            }
        }
        None
    }

    fn remaining_disabled(&self) -> usize {
        self.disabled.iter().map(|q| q.len()).sum()
    }
}

impl StepOperator for ConstructionWithProgressiveDescent {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        self.active = ActiveSet::initially_active(&self.evaluators);
        self.disabled = (0..self.evaluators.rank_count())
            .map(|rank| {
                let mut indices: Vec<usize> = (0..self.evaluators.constraint_count(rank))
                    .filter(|&i| !self.evaluators.is_initially_active(rank, i))
                    .collect();
                indices.shuffle(&mut self.rng);
                indices.into_iter().collect()
            })
            .collect();
        self.result = None;
        self.fast.init(inputs)?;
        self.phase = Phase::Construct;
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        match self.phase {
            Phase::Idle => Err(RotaError::InvalidState(
                "ConstructionWithProgressiveDescent stepped before init".into(),
            )),
            Phase::Done => Ok(true),
            Phase::Construct => {
                if self.fast.step()? {
                    let roster = self.fast.take_result().ok_or_else(|| {
                        RotaError::Internal("finished construction produced no result".into())
                    })?;
                    self.descent.set_active(self.active.clone());
                    self.descent.init(vec![roster])?;
                    self.phase = Phase::Descend;
                }
                Ok(false)
            }
            Phase::Descend => {
                if self.descent.step()? {
                    let roster = self.descent.take_result().ok_or_else(|| {
                        RotaError::Internal("finished descent produced no result".into())
                    })?;
                    if let Some((rank, index)) = self.pop_disabled() {
                        debug!(
                            constraint = self.evaluators.constraint_name(rank, index),
                            rank,
                            remaining = self.remaining_disabled(),
                            "activating constraint"
                        );
                        self.active.activate(rank, index);
                        self.descent.set_active(self.active.clone());
                        self.descent.init(vec![roster])?;
                        return Ok(false);
                    }
                    self.result = Some(roster);
                    self.phase = Phase::Done;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    fn take_result(&mut self) -> Option<Roster> {
        if self.is_done() {
            self.result.take()
        } else {
            None
        }
    }
}
