//! Constraint facade and the delta-evaluation service.
//!
//! The engine never inspects concrete constraint kinds: the problem layer
//! supplies [`Constraint`] trait objects, grouped by rank, and the engine
//! consumes them through [`EvaluatorSet`]: full evaluation, incremental
//! swap deltas, satisfaction counting and the violation report.

use std::sync::Arc;

use crate::domain::ShiftId;
use crate::evaluation::Evaluation;
use crate::moves::SwapMove;
use crate::problem::Problem;
use crate::roster::Roster;

/// Count of constraint units flipped by a move: units that become satisfied
/// and units that stop being satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SatisfactionDelta {
    pub newly_satisfied: u32,
    pub newly_unsatisfied: u32,
}

impl SatisfactionDelta {
    pub fn new(newly_satisfied: u32, newly_unsatisfied: u32) -> Self {
        SatisfactionDelta {
            newly_satisfied,
            newly_unsatisfied,
        }
    }

    pub fn accumulate(&mut self, other: SatisfactionDelta) {
        self.newly_satisfied += other.newly_satisfied;
        self.newly_unsatisfied += other.newly_unsatisfied;
    }
}

/// One entry of a solution's violation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub constraint: String,
    pub rank: usize,
    pub cost: i64,
}

/// A soft or hard constraint, opaque to the engine.
pub trait Constraint: Send + Sync {
    /// Stable display name, also used in violation reports.
    fn name(&self) -> &str;

    /// Constraints that hold from the very first construction step
    /// (coverage-style structural rules). Progressive-descent construction
    /// activates all remaining constraints one at a time.
    fn initially_active(&self) -> bool {
        false
    }

    /// Materializes the evaluator used for (delta) cost queries.
    fn evaluator(&self, problem: &Problem) -> Box<dyn ConstraintEvaluator>;
}

/// Cost queries for one constraint.
///
/// The sign convention for differences: negative = improvement.
pub trait ConstraintEvaluator: Send + Sync {
    /// Full violation cost of the roster under this constraint.
    fn cost(&self, roster: &Roster) -> i64;

    /// Post-move cost minus pre-move cost for a block swap.
    fn swap_cost_difference(&self, roster: &Roster, mv: &SwapMove) -> i64;

    /// Units newly satisfied / newly unsatisfied under the move.
    fn satisfaction_difference(&self, roster: &Roster, mv: &SwapMove) -> SatisfactionDelta;

    /// Estimated cost of assigning `shift` to `employee` on `day`, used by
    /// greedy construction. Lower = prefer.
    fn estimated_assignment_cost(
        &self,
        roster: &Roster,
        employee: usize,
        shift: ShiftId,
        day: usize,
    ) -> i64;

    fn has_preferred_assignment(&self, _day: usize, _employee: usize) -> bool {
        false
    }

    fn has_unwanted_assignment(&self, _day: usize, _employee: usize) -> bool {
        false
    }

    fn is_preferred_assignment(&self, _day: usize, _employee: usize, _shift: ShiftId) -> bool {
        false
    }
}

struct RankedEvaluator {
    name: String,
    initially_active: bool,
    evaluator: Box<dyn ConstraintEvaluator>,
}

/// All constraint evaluators of a problem, grouped by rank.
///
/// Built once per search (`EvaluatorSet::for_problem`) and shared across
/// worker threads behind an `Arc`. Every evaluation service of the engine
/// goes through this type, including the debug cross-check that re-derives
/// the full evaluation after an incrementally-applied move.
pub struct EvaluatorSet {
    ranks: Vec<Vec<RankedEvaluator>>,
}

impl EvaluatorSet {
    pub fn for_problem(problem: &Problem) -> Arc<Self> {
        let ranks = (0..problem.rank_count())
            .map(|rank| {
                problem
                    .constraints(rank)
                    .iter()
                    .map(|c| RankedEvaluator {
                        name: c.name().to_string(),
                        initially_active: c.initially_active(),
                        evaluator: c.evaluator(problem),
                    })
                    .collect()
            })
            .collect();
        Arc::new(EvaluatorSet { ranks })
    }

    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn constraint_count(&self, rank: usize) -> usize {
        self.ranks[rank].len()
    }

    pub fn constraint_name(&self, rank: usize, index: usize) -> &str {
        &self.ranks[rank][index].name
    }

    pub fn is_initially_active(&self, rank: usize, index: usize) -> bool {
        self.ranks[rank][index].initially_active
    }

    pub fn evaluator(&self, rank: usize, index: usize) -> &dyn ConstraintEvaluator {
        self.ranks[rank][index].evaluator.as_ref()
    }

    /// Full evaluation by scanning every constraint.
    pub fn evaluate(&self, roster: &Roster) -> Evaluation {
        let mut evaluation = Evaluation::zero(self.rank_count());
        for (rank, evaluators) in self.ranks.iter().enumerate() {
            for e in evaluators {
                evaluation.add_at(rank, e.evaluator.cost(roster));
            }
        }
        evaluation
    }

    /// Cached evaluation: computes and stores it on the roster when absent.
    pub fn evaluation(&self, roster: &mut Roster) -> Evaluation {
        if let Some(cached) = roster.evaluation() {
            return cached.clone();
        }
        let evaluation = self.evaluate(roster);
        roster.set_evaluation(evaluation.clone());
        evaluation
    }

    /// Per-rank cost delta of a block swap, summed over all constraints.
    pub fn swap_delta(&self, roster: &Roster, mv: &SwapMove) -> Evaluation {
        let mut delta = Evaluation::zero(self.rank_count());
        for (rank, evaluators) in self.ranks.iter().enumerate() {
            for e in evaluators {
                delta.add_at(rank, e.evaluator.swap_cost_difference(roster, mv));
            }
        }
        delta
    }

    /// Evaluation the roster would have after applying `mv`, obtained by
    /// summing per-constraint deltas onto the (cached) pre-move evaluation.
    pub fn predicted_evaluation(&self, roster: &mut Roster, mv: &SwapMove) -> Evaluation {
        let base = self.evaluation(roster);
        &base + &self.swap_delta(roster, mv)
    }

    /// Applies a swap and installs the delta-predicted evaluation as the
    /// cache. In debug builds the prediction is checked against a full
    /// recomputation.
    pub fn apply_swap(&self, roster: &mut Roster, mv: &SwapMove) -> bool {
        let predicted = self.predicted_evaluation(roster, mv);
        let changed = mv.apply(roster);
        #[cfg(debug_assertions)]
        {
            let recomputed = self.evaluate(roster);
            assert_eq!(
                recomputed, predicted,
                "incremental evaluation diverged from full recomputation for {mv:?}"
            );
        }
        roster.set_evaluation(predicted);
        changed
    }

    /// Satisfaction delta of a swap, summed over every constraint.
    pub fn satisfaction_delta(&self, roster: &Roster, mv: &SwapMove) -> SatisfactionDelta {
        let mut total = SatisfactionDelta::default();
        for evaluators in &self.ranks {
            for e in evaluators {
                total.accumulate(e.evaluator.satisfaction_difference(roster, mv));
            }
        }
        total
    }

    /// Estimated cost vector of one assignment, one slot per rank.
    pub fn estimated_assignment_cost(
        &self,
        roster: &Roster,
        employee: usize,
        shift: ShiftId,
        day: usize,
    ) -> Evaluation {
        let mut cost = Evaluation::zero(self.rank_count());
        for (rank, evaluators) in self.ranks.iter().enumerate() {
            for e in evaluators {
                cost.add_at(
                    rank,
                    e.evaluator
                        .estimated_assignment_cost(roster, employee, shift, day),
                );
            }
        }
        cost
    }

    /// True if any constraint marks (day, employee) as a preferred
    /// assignment slot.
    pub fn has_preferred_assignment(&self, day: usize, employee: usize) -> bool {
        self.ranks
            .iter()
            .flatten()
            .any(|e| e.evaluator.has_preferred_assignment(day, employee))
    }

    /// True if any constraint marks (day, employee) as unwanted.
    pub fn has_unwanted_assignment(&self, day: usize, employee: usize) -> bool {
        self.ranks
            .iter()
            .flatten()
            .any(|e| e.evaluator.has_unwanted_assignment(day, employee))
    }

    /// True if any constraint prefers this exact (day, employee, shift)
    /// assignment.
    pub fn is_preferred_assignment(&self, day: usize, employee: usize, shift: ShiftId) -> bool {
        self.ranks
            .iter()
            .flatten()
            .any(|e| e.evaluator.is_preferred_assignment(day, employee, shift))
    }

    /// Fills and returns the roster's violation report.
    pub fn violations(&self, roster: &mut Roster) -> Vec<Violation> {
        if let Some(cached) = roster.violations() {
            return cached.to_vec();
        }
        let mut violations = Vec::new();
        for (rank, evaluators) in self.ranks.iter().enumerate() {
            for e in evaluators {
                let cost = e.evaluator.cost(roster);
                if cost > 0 {
                    violations.push(Violation {
                        constraint: e.name.clone(),
                        rank,
                        cost,
                    });
                }
            }
        }
        roster.set_violations(violations.clone());
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractId, Employee, SchedulingPeriod, Shift, Weekday};

    /// Penalizes every assignment held by employee 0. Exact deltas.
    struct SpareFirstEmployee;

    struct SpareFirstEmployeeEvaluator;

    impl Constraint for SpareFirstEmployee {
        fn name(&self) -> &str {
            "SpareFirstEmployee"
        }

        fn evaluator(&self, _problem: &Problem) -> Box<dyn ConstraintEvaluator> {
            Box::new(SpareFirstEmployeeEvaluator)
        }
    }

    impl ConstraintEvaluator for SpareFirstEmployeeEvaluator {
        fn cost(&self, roster: &Roster) -> i64 {
            (0..roster.day_count())
                .filter(|&d| roster.is_assigned(d, 0))
                .count() as i64
        }

        fn swap_cost_difference(&self, roster: &Roster, mv: &SwapMove) -> i64 {
            if mv.employee1() != 0 && mv.employee2() != 0 {
                return 0;
            }
            let other = if mv.employee1() == 0 {
                mv.employee2()
            } else {
                mv.employee1()
            };
            let mut delta = 0;
            for day in mv.days() {
                let before = roster.is_assigned(day, 0) as i64;
                let after = roster.is_assigned(day, other) as i64;
                delta += after - before;
            }
            delta
        }

        fn satisfaction_difference(&self, roster: &Roster, mv: &SwapMove) -> SatisfactionDelta {
            let mut delta = SatisfactionDelta::default();
            if mv.employee1() != 0 && mv.employee2() != 0 {
                return delta;
            }
            let other = if mv.employee1() == 0 {
                mv.employee2()
            } else {
                mv.employee1()
            };
            for day in mv.days() {
                let before = roster.is_assigned(day, 0);
                let after = roster.is_assigned(day, other);
                if before && !after {
                    delta.newly_satisfied += 1;
                } else if !before && after {
                    delta.newly_unsatisfied += 1;
                }
            }
            delta
        }

        fn estimated_assignment_cost(
            &self,
            _roster: &Roster,
            employee: usize,
            _shift: ShiftId,
            _day: usize,
        ) -> i64 {
            (employee == 0) as i64
        }

        fn has_unwanted_assignment(&self, _day: usize, employee: usize) -> bool {
            employee == 0
        }
    }

    fn problem() -> Arc<Problem> {
        Arc::new(
            Problem::builder(SchedulingPeriod::new(Weekday::Monday, 4))
                .shift(Shift::new(ShiftId::new(0), "Early"))
                .employee(Employee::new("A", ContractId::new(0)))
                .employee(Employee::new("B", ContractId::new(0)))
                .uniform_demand(ShiftId::new(0), 1)
                .rank_count(2)
                .constraint(1, Arc::new(SpareFirstEmployee))
                .build()
                .unwrap(),
        )
    }

    fn covered_roster(problem: Arc<Problem>) -> Roster {
        let mut roster = Roster::empty(problem);
        for day in 0..roster.day_count() {
            roster.take_unassigned_shift(day, ShiftId::new(0));
            let employee = day % 2;
            roster.set_assignment(day, employee, Some(ShiftId::new(0)));
        }
        roster
    }

    #[test]
    fn full_evaluation_sums_per_rank() {
        let evaluators = EvaluatorSet::for_problem(&problem());
        let mut roster = covered_roster(problem());
        let eval = evaluators.evaluation(&mut roster);
        // employee 0 works days 0 and 2
        assert_eq!(eval, Evaluation::from_ranks(&[0, 2]));
        assert!(roster.is_evaluated());
    }

    #[test]
    fn delta_matches_full_recomputation() {
        let evaluators = EvaluatorSet::for_problem(&problem());
        let mut roster = covered_roster(problem());
        let before = evaluators.evaluation(&mut roster);
        let mv = SwapMove::new(0, 1, 0, 2).unwrap();
        let delta = evaluators.swap_delta(&roster, &mv);
        let mut moved = roster.clone();
        mv.apply(&mut moved);
        let after = evaluators.evaluate(&moved);
        assert_eq!(&before + &delta, after);
    }

    #[test]
    fn apply_swap_installs_predicted_cache() {
        let evaluators = EvaluatorSet::for_problem(&problem());
        let mut roster = covered_roster(problem());
        let mv = SwapMove::new(0, 1, 0, 1).unwrap();
        assert!(evaluators.apply_swap(&mut roster, &mv));
        // day 0 moved from employee 0 to employee 1
        assert_eq!(
            roster.evaluation().unwrap(),
            &Evaluation::from_ranks(&[0, 1])
        );
    }

    #[test]
    fn satisfaction_counts_flipped_units() {
        let evaluators = EvaluatorSet::for_problem(&problem());
        let roster = covered_roster(problem());
        // swapping days 0..=1 frees employee 0 on day 0, burdens it on day 1
        let mv = SwapMove::new(0, 1, 0, 2).unwrap();
        let delta = evaluators.satisfaction_delta(&roster, &mv);
        assert_eq!(delta, SatisfactionDelta::new(1, 1));
    }

    #[test]
    fn violations_report_nonzero_costs() {
        let evaluators = EvaluatorSet::for_problem(&problem());
        let mut roster = covered_roster(problem());
        let violations = evaluators.violations(&mut roster);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].constraint, "SpareFirstEmployee");
        assert_eq!(violations[0].rank, 1);
        assert_eq!(violations[0].cost, 2);
        // cached on the roster
        assert!(roster.violations().is_some());
    }

    #[test]
    fn preference_queries_aggregate_over_constraints() {
        let evaluators = EvaluatorSet::for_problem(&problem());
        assert!(evaluators.has_unwanted_assignment(0, 0));
        assert!(!evaluators.has_unwanted_assignment(0, 1));
        assert!(!evaluators.has_preferred_assignment(0, 0));
    }
}
