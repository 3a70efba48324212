//! Shared fixtures for engine tests: small problems with two exact-delta
//! constraints, and deterministically covered rosters.

use std::sync::Arc;

use rota_core::{
    Constraint, ConstraintEvaluator, Contract, ContractId, Employee, EvaluatorSet, Problem,
    Roster, SatisfactionDelta, SchedulingPeriod, Shift, ShiftId, SwapMove, Weekday,
};

/// Rank-0 cap on the number of assignments per employee.
pub struct WorkloadCap {
    pub max_per_employee: u32,
}

impl Constraint for WorkloadCap {
    fn name(&self) -> &str {
        "WorkloadCap"
    }

    fn initially_active(&self) -> bool {
        true
    }

    fn evaluator(&self, _problem: &Problem) -> Box<dyn ConstraintEvaluator> {
        Box::new(WorkloadCapEvaluator {
            max: self.max_per_employee as i64,
        })
    }
}

struct WorkloadCapEvaluator {
    max: i64,
}

impl WorkloadCapEvaluator {
    fn count(&self, roster: &Roster, employee: usize) -> i64 {
        (0..roster.day_count())
            .filter(|&d| roster.is_assigned(d, employee))
            .count() as i64
    }

    fn penalty(&self, count: i64) -> i64 {
        (count - self.max).max(0)
    }

    /// Assignment-count change of `employee` when it takes `other`'s window.
    fn window_shift(&self, roster: &Roster, mv: &SwapMove, employee: usize, other: usize) -> i64 {
        let mut delta = 0;
        for day in mv.days() {
            delta += roster.is_assigned(day, other) as i64;
            delta -= roster.is_assigned(day, employee) as i64;
        }
        delta
    }
}

impl ConstraintEvaluator for WorkloadCapEvaluator {
    fn cost(&self, roster: &Roster) -> i64 {
        (0..roster.employee_count())
            .map(|e| self.penalty(self.count(roster, e)))
            .sum()
    }

    fn swap_cost_difference(&self, roster: &Roster, mv: &SwapMove) -> i64 {
        let (e1, e2) = (mv.employee1(), mv.employee2());
        let d1 = self.window_shift(roster, mv, e1, e2);
        let c1 = self.count(roster, e1);
        let c2 = self.count(roster, e2);
        (self.penalty(c1 + d1) - self.penalty(c1)) + (self.penalty(c2 - d1) - self.penalty(c2))
    }

    fn satisfaction_difference(&self, roster: &Roster, mv: &SwapMove) -> SatisfactionDelta {
        let (e1, e2) = (mv.employee1(), mv.employee2());
        let d1 = self.window_shift(roster, mv, e1, e2);
        let mut delta = SatisfactionDelta::default();
        for (count, shift) in [(self.count(roster, e1), d1), (self.count(roster, e2), -d1)] {
            let before_ok = count <= self.max;
            let after_ok = count + shift <= self.max;
            if !before_ok && after_ok {
                delta.newly_satisfied += 1;
            } else if before_ok && !after_ok {
                delta.newly_unsatisfied += 1;
            }
        }
        delta
    }

    fn estimated_assignment_cost(
        &self,
        roster: &Roster,
        employee: usize,
        _shift: ShiftId,
        _day: usize,
    ) -> i64 {
        (self.count(roster, employee) >= self.max) as i64
    }
}

/// Rank-1 aversion: the junior half of the staff should not work nights.
pub struct JuniorNightAversion {
    pub night: ShiftId,
}

impl Constraint for JuniorNightAversion {
    fn name(&self) -> &str {
        "JuniorNightAversion"
    }

    fn evaluator(&self, problem: &Problem) -> Box<dyn ConstraintEvaluator> {
        Box::new(JuniorNightAversionEvaluator {
            night: self.night,
            junior_from: problem.employee_count().div_ceil(2),
        })
    }
}

struct JuniorNightAversionEvaluator {
    night: ShiftId,
    junior_from: usize,
}

impl JuniorNightAversionEvaluator {
    fn penalized(&self, employee: usize, assignment: Option<ShiftId>) -> bool {
        employee >= self.junior_from && assignment == Some(self.night)
    }
}

impl ConstraintEvaluator for JuniorNightAversionEvaluator {
    fn cost(&self, roster: &Roster) -> i64 {
        let mut cost = 0;
        for day in 0..roster.day_count() {
            for employee in self.junior_from..roster.employee_count() {
                cost += self.penalized(employee, roster.assignment(day, employee)) as i64;
            }
        }
        cost
    }

    fn swap_cost_difference(&self, roster: &Roster, mv: &SwapMove) -> i64 {
        let (e1, e2) = (mv.employee1(), mv.employee2());
        let mut delta = 0;
        for day in mv.days() {
            let a1 = roster.assignment(day, e1);
            let a2 = roster.assignment(day, e2);
            let before = self.penalized(e1, a1) as i64 + self.penalized(e2, a2) as i64;
            let after = self.penalized(e1, a2) as i64 + self.penalized(e2, a1) as i64;
            delta += after - before;
        }
        delta
    }

    fn satisfaction_difference(&self, roster: &Roster, mv: &SwapMove) -> SatisfactionDelta {
        let (e1, e2) = (mv.employee1(), mv.employee2());
        let mut delta = SatisfactionDelta::default();
        for day in mv.days() {
            let a1 = roster.assignment(day, e1);
            let a2 = roster.assignment(day, e2);
            for (employee, before_a, after_a) in [(e1, a1, a2), (e2, a2, a1)] {
                let before = self.penalized(employee, before_a);
                let after = self.penalized(employee, after_a);
                if before && !after {
                    delta.newly_satisfied += 1;
                } else if !before && after {
                    delta.newly_unsatisfied += 1;
                }
            }
        }
        delta
    }

    fn estimated_assignment_cost(
        &self,
        _roster: &Roster,
        employee: usize,
        shift: ShiftId,
        _day: usize,
    ) -> i64 {
        self.penalized(employee, Some(shift)) as i64
    }

    fn has_preferred_assignment(&self, _day: usize, employee: usize) -> bool {
        employee < self.junior_from
    }

    fn has_unwanted_assignment(&self, _day: usize, employee: usize) -> bool {
        employee >= self.junior_from
    }

    fn is_preferred_assignment(&self, _day: usize, employee: usize, shift: ShiftId) -> bool {
        employee < self.junior_from && shift == self.night
    }
}

/// A `days x employees` problem with `shift_count` shift types, demand 1 per
/// shift per day, and both fixture constraints.
pub fn fixture_problem(days: usize, employees: usize, shift_count: usize) -> Arc<Problem> {
    assert!(shift_count <= employees, "fixture needs enough employees");
    let mut builder = Problem::builder(SchedulingPeriod::new(Weekday::Monday, days))
        .contract(Contract::new(ContractId::new(0), "FullTime"));
    for s in 0..shift_count {
        let label = match s {
            0 => "Night".to_string(),
            n => format!("Shift{n}"),
        };
        builder = builder.shift(Shift::new(ShiftId::new(s as u32), label));
    }
    for e in 0..employees {
        builder = builder.employee(Employee::new(format!("E{e}"), ContractId::new(0)));
    }
    for s in 0..shift_count {
        builder = builder.uniform_demand(ShiftId::new(s as u32), 1);
    }
    let fair_share = ((days * shift_count) / employees).max(1) as u32;
    builder
        .constraint(
            0,
            Arc::new(WorkloadCap {
                max_per_employee: fair_share,
            }),
        )
        .constraint(
            1,
            Arc::new(JuniorNightAversion {
                night: ShiftId::new(0),
            }),
        )
        .build()
        .map(Arc::new)
        .expect("fixture problem must build")
}

pub fn fixture_evaluators(problem: &Arc<Problem>) -> Arc<EvaluatorSet> {
    EvaluatorSet::for_problem(problem)
}

/// A coverage-complete roster over [`fixture_problem`]: shift `s` on day `d`
/// goes to employee `(d + s) % employees`.
pub fn covered_roster(days: usize, employees: usize, shift_count: usize) -> Roster {
    let problem = fixture_problem(days, employees, shift_count);
    let mut roster = Roster::empty(problem);
    for day in 0..days {
        for s in 0..shift_count {
            let shift = ShiftId::new(s as u32);
            let employee = (day + s) % employees;
            assert!(roster.take_unassigned_shift(day, shift));
            roster.set_assignment(day, employee, Some(shift));
        }
    }
    debug_assert!(roster.coverage_consistent());
    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_constraint_deltas_match_recomputation() {
        let mut roster = covered_roster(7, 4, 2);
        let evaluators = fixture_evaluators(roster.problem());
        let before = evaluators.evaluation(&mut roster);
        for (e1, e2, day, block) in [(0, 1, 0, 3), (1, 3, 2, 4), (0, 3, 5, 2)] {
            let mv = SwapMove::new(e1, e2, day, block).unwrap();
            let delta = evaluators.swap_delta(&roster, &mv);
            let mut moved = roster.clone();
            mv.apply(&mut moved);
            assert_eq!(&before + &delta, evaluators.evaluate(&moved));
        }
    }

    #[test]
    fn fixture_preferences_split_seniors_and_juniors() {
        let roster = covered_roster(4, 4, 1);
        let evaluators = fixture_evaluators(roster.problem());
        // juniors are the upper half of the staff
        assert!(evaluators.has_preferred_assignment(0, 0));
        assert!(evaluators.has_unwanted_assignment(0, 3));
        assert!(evaluators.is_preferred_assignment(0, 1, ShiftId::new(0)));
        assert!(!evaluators.is_preferred_assignment(0, 3, ShiftId::new(0)));
    }
}
