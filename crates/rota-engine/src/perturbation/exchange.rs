//! Three-employee block rotation perturbation.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{Result, Roster, RotaError};

use super::min_slot_exchanges;
use crate::construction::MAX_ASSIGNMENT_BLOCK;
use crate::operator::{not_initialized, single_input, StepOperator};

/// Rotates the assignments of three distinct employees over a random day
/// block, repeating until enough cells changed.
///
/// Rotation preserves both the coverage and the single-assignment-per-day
/// invariants, so no reconstruction is needed afterwards. Requires at least
/// three employees.
pub struct ExchangePerturbation {
    strength: f64,
    rng: ChaCha8Rng,
    roster: Option<Roster>,
    required: usize,
    changed: usize,
    done: bool,
}

impl ExchangePerturbation {
    pub fn new(strength: f64) -> Result<Self> {
        if strength < 0.0 {
            return Err(RotaError::InvalidArgument(format!(
                "perturbation strength must be non-negative, got {strength}"
            )));
        }
        Ok(ExchangePerturbation {
            strength,
            rng: ChaCha8Rng::from_os_rng(),
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

    /// Three distinct employees, preferring ones whose start-day shifts
    /// differ so the rotation actually moves something.
    fn pick_employees(&mut self, roster: &Roster, start_day: usize) -> [usize; 3] {
        let employees = roster.employee_count();
        let mut order: Vec<usize> = (0..employees).collect();
        order.shuffle(&mut self.rng);

        let first = order[0];
        let rest = &order[1..];
        let second = rest
            .iter()
            .copied()
            .find(|&e| roster.assignment(start_day, e) != roster.assignment(start_day, first))
            .unwrap_or(rest[0]);
        let third = rest
            .iter()
            .copied()
            .find(|&e| {
                e != second
                    && roster.assignment(start_day, e) != roster.assignment(start_day, second)
            })
            .or_else(|| rest.iter().copied().find(|&e| e != second))
            .unwrap_or(rest[0]);
        [first, second, third]
    }
}

impl StepOperator for ExchangePerturbation {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let roster = single_input(inputs, "ExchangePerturbation")?;
        if roster.employee_count() < 3 {
            return Err(RotaError::InvalidArgument(
                "ExchangePerturbation requires at least 3 employees".into(),
            ));
        }
        self.required = min_slot_exchanges(self.strength, &roster);
        self.changed = 0;
        self.done = false;
        self.roster = Some(roster);
        Ok(())
    }

    /// One step applies one three-cycle rotation over a random block.
    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let mut roster = self
            .roster
            .take()
            .ok_or_else(|| not_initialized("ExchangePerturbation"))?;
        let days = roster.day_count();

        let block = self.rng.random_range(1..=MAX_ASSIGNMENT_BLOCK).min(days);
        let mut start = self.rng.random_range(0..days);
        if start + block > days {
            // fit the window inside the period
            start = days - block;
        }

        let [e1, e2, e3] = self.pick_employees(&roster, start);
        for day in start..start + block {
            let a1 = roster.assignment(day, e1);
            let a2 = roster.assignment(day, e2);
            let a3 = roster.assignment(day, e3);
            roster.set_assignment(day, e1, a3);
            roster.set_assignment(day, e2, a1);
            roster.set_assignment(day, e3, a2);
            self.changed += 3;
        }

        self.done = self.changed >= self.required;
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
