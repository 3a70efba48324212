//! Fast randomized block construction.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{Problem, Result, Roster, RotaError};

use super::MAX_ASSIGNMENT_BLOCK;
use crate::operator::{not_initialized, optional_input, StepOperator};

/// Assigns random blocks of consecutive demand slots to random free
/// employees until no demand remains.
///
/// One step places one block. Fails with `NoFeasibleSolution` when a day
/// still has open demand but every employee already works that day.
pub struct FastBlockConstruction {
    problem: Arc<Problem>,
    rng: ChaCha8Rng,
    roster: Option<Roster>,
    done: bool,
}

impl FastBlockConstruction {
    pub fn new(problem: Arc<Problem>) -> Self {
        FastBlockConstruction {
            problem,
            rng: ChaCha8Rng::from_os_rng(),
            roster: None,
            done: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }
}

impl StepOperator for FastBlockConstruction {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let roster = match optional_input(inputs, "FastBlockConstruction")? {
            Some(roster) => roster,
            None => Roster::empty(self.problem.clone()),
        };
        self.done = roster.total_unassigned() == 0;
        self.roster = Some(roster);
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let roster = self
            .roster
            .as_mut()
            .ok_or_else(|| not_initialized("FastBlockConstruction"))?;
        let days = roster.day_count();
        let employees = roster.employee_count();

        let open_days: Vec<usize> = (0..days).filter(|&d| roster.has_unassigned(d)).collect();
        let day = open_days[self.rng.random_range(0..open_days.len())];

        // wrapping search for a free employee, from a random offset
        let offset = self.rng.random_range(0..employees);
        let employee = (0..employees)
            .map(|k| (offset + k) % employees)
            .find(|&e| !roster.is_assigned(day, e))
            .ok_or_else(|| {
                RotaError::NoFeasibleSolution(format!(
                    "day {day} still has open demand but every employee is assigned"
                ))
            })?;

        let block = self.rng.random_range(1..=MAX_ASSIGNMENT_BLOCK);
        for k in 0..block {
            let d = (day + k) % days;
            if roster.is_assigned(d, employee) || !roster.has_unassigned(d) {
                continue;
            }
            let slot = self.rng.random_range(0..roster.unassigned(d).len());
            let shift = roster.take_unassigned(d, slot);
            roster.set_assignment(d, employee, Some(shift));
        }

        self.done = roster.total_unassigned() == 0;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixture_problem;

    #[test]
    fn builds_a_coverage_complete_roster() {
        let problem = fixture_problem(7, 4, 2);
        let mut op = FastBlockConstruction::new(problem).with_seed(11);
        op.init(vec![]).unwrap();
        op.run().unwrap();
        let roster = op.take_result().unwrap();
        assert_eq!(roster.total_unassigned(), 0);
        assert!(roster.coverage_consistent());
    }

    #[test]
    fn completes_a_partial_roster() {
        let problem = fixture_problem(5, 3, 1);
        let mut seeded = Roster::empty(problem.clone());
        // pre-assign one day by hand
        let shift = seeded.take_unassigned(0, 0);
        seeded.set_assignment(0, 2, Some(shift));

        let mut op = FastBlockConstruction::new(problem).with_seed(3);
        op.init(vec![seeded]).unwrap();
        op.run().unwrap();
        let roster = op.take_result().unwrap();
        assert!(roster.coverage_consistent());
        // the hand-made assignment survived
        assert!(roster.is_assigned(0, 2));
    }

    #[test]
    fn reports_infeasible_demand() {
        // 1 employee cannot cover demand 2 on one day
        let problem = {
            use rota_core::{
                ContractId, Employee, Problem, SchedulingPeriod, Shift, ShiftId, Weekday,
            };
            Arc::new(
                Problem::builder(SchedulingPeriod::new(Weekday::Monday, 1))
                    .shift(Shift::new(ShiftId::new(0), "Early"))
                    .employee(Employee::new("A", ContractId::new(0)))
                    .demand(ShiftId::new(0), 0, 2)
                    .build()
                    .unwrap(),
            )
        };
        let mut op = FastBlockConstruction::new(problem).with_seed(5);
        op.init(vec![]).unwrap();
        let err = op.run().unwrap_err();
        assert!(matches!(err, RotaError::NoFeasibleSolution(_)));
    }

    #[test]
    fn stepping_before_init_is_rejected() {
        let problem = fixture_problem(3, 2, 1);
        let mut op = FastBlockConstruction::new(problem);
        assert!(matches!(op.step(), Err(RotaError::InvalidState(_))));
    }

    #[test]
    fn same_seed_reproduces_the_roster() {
        let problem = fixture_problem(7, 4, 2);
        let build = |seed| {
            let mut op = FastBlockConstruction::new(problem.clone()).with_seed(seed);
            op.init(vec![]).unwrap();
            op.run().unwrap();
            op.take_result().unwrap()
        };
        assert!(build(21).assignments_eq(&build(21)));
    }
}
