//! Ruin-and-recreate perturbation.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Problem, RemoveReplaceMove, Result, Roster, RotaError};

use super::min_slot_exchanges;
use crate::construction::{GreedyConstruction, MAX_ASSIGNMENT_BLOCK};
use crate::operator::{single_input, StepOperator};

/// Removes random blocks of assignments back into the unassigned multiset,
/// then rebuilds the roster with greedy construction.
pub struct RuinAndRecreateProcedure {
    strength: f64,
    rng: ChaCha8Rng,
    recreate: GreedyConstruction,
    initialized: bool,
}

impl RuinAndRecreateProcedure {
    pub fn new(
        problem: Arc<Problem>,
        evaluators: Arc<EvaluatorSet>,
        strength: f64,
    ) -> Result<Self> {
        if strength < 0.0 {
            return Err(RotaError::InvalidArgument(format!(
                "perturbation strength must be non-negative, got {strength}"
            )));
        }
        Ok(RuinAndRecreateProcedure {
            strength,
            rng: ChaCha8Rng::from_os_rng(),
            recreate: GreedyConstruction::new(problem, evaluators),
            initialized: false,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        let greedy_seed = self.rng.random();
        self.recreate = self.recreate.with_seed(greedy_seed);
        self
    }

    /// Pushes ~`min_slot_exchanges` random assignments back to the
    /// unassigned buckets, removing whole blocks of adjacent days (wrapping
    /// around the period) per draw.
    fn ruin(&mut self, roster: &mut Roster) -> Result<()> {
        let days = roster.day_count();
        let employees = roster.employee_count();
        let required = min_slot_exchanges(self.strength, roster);
        let mut removed = 0;
        // bail out once nothing is left to remove
        while removed < required {
            let assigned_total: usize = (0..days)
                .map(|d| (0..employees).filter(|&e| roster.is_assigned(d, e)).count())
                .sum();
            if assigned_total == 0 {
                break;
            }
            let employee = self.rng.random_range(0..employees);
            let start = self.rng.random_range(0..days);
            let block = self.rng.random_range(1..=MAX_ASSIGNMENT_BLOCK).min(days);
            for k in 0..block {
                let day = (start + k) % days;
                if let Some(shift) = roster.assignment(day, employee) {
                    RemoveReplaceMove::new(Some(employee), None, shift, day).apply(roster)?;
                    removed += 1;
                }
            }
        }
        Ok(())
    }
}

impl StepOperator for RuinAndRecreateProcedure {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let mut roster = single_input(inputs, "RuinAndRecreateProcedure")?;
        self.ruin(&mut roster)?;
        self.recreate.init(vec![roster])?;
        self.initialized = true;
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if !self.initialized {
            return Err(RotaError::InvalidState(
                "RuinAndRecreateProcedure stepped before init".into(),
            ));
        }
        self.recreate.step()
    }

    fn is_done(&self) -> bool {
        self.initialized && self.recreate.is_done()
    }

    fn take_result(&mut self) -> Option<Roster> {
        self.recreate.take_result()
    }
}
