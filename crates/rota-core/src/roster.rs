//! Roster - the mutable timetable a search thread owns.
//!
//! A roster is an assignment matrix indexed by (day, employee) plus the
//! per-day multiset of demand not yet covered. The invariant maintained by
//! every well-formed mutation: on each day, the multiset of non-absent
//! assignments unioned with the unassigned slots equals the day's demand.

use std::sync::Arc;

use crate::constraint::Violation;
use crate::domain::ShiftId;
use crate::evaluation::Evaluation;
use crate::problem::Problem;

/// A (possibly partial) timetable over a problem's scheduling period.
///
/// Cloning deep-copies the assignment state and shares the problem handle.
#[derive(Clone)]
pub struct Roster {
    problem: Arc<Problem>,
    /// assignments[day][employee]
    assignments: Vec<Vec<Option<ShiftId>>>,
    /// unassigned[day]: demand slots not yet covered
    unassigned: Vec<Vec<ShiftId>>,
    evaluation: Option<Evaluation>,
    violations: Option<Vec<Violation>>,
}

impl std::fmt::Debug for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Roster")
            .field("days", &self.day_count())
            .field("employees", &self.employee_count())
            .field("unassigned", &self.total_unassigned())
            .field("evaluation", &self.evaluation)
            .finish()
    }
}

impl Roster {
    /// Creates an empty roster: nobody assigned, all demand unassigned.
    pub fn empty(problem: Arc<Problem>) -> Self {
        let days = problem.day_count();
        let employees = problem.employee_count();
        let unassigned = (0..days).map(|d| problem.demand_slots(d)).collect();
        Roster {
            problem,
            assignments: vec![vec![None; employees]; days],
            unassigned,
            evaluation: None,
            violations: None,
        }
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub fn day_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn employee_count(&self) -> usize {
        self.problem.employee_count()
    }

    /// The assignment of one employee on one day.
    pub fn assignment(&self, day: usize, employee: usize) -> Option<ShiftId> {
        self.assignments[day][employee]
    }

    /// Sets one cell and invalidates the caches.
    pub fn set_assignment(&mut self, day: usize, employee: usize, shift: Option<ShiftId>) {
        self.assignments[day][employee] = shift;
        self.invalidate();
    }

    pub fn is_assigned(&self, day: usize, employee: usize) -> bool {
        self.assignments[day][employee].is_some()
    }

    /// One full day column, indexed by employee.
    pub fn day_assignments(&self, day: usize) -> &[Option<ShiftId>] {
        &self.assignments[day]
    }

    /// Overwrites one full day column. Used by crossover; the caller is
    /// responsible for restoring coverage afterwards.
    pub fn set_day_assignments(&mut self, day: usize, column: &[Option<ShiftId>]) {
        self.assignments[day].copy_from_slice(column);
        self.invalidate();
    }

    /// Number of employees working `shift` on `day`.
    pub fn assigned_count_on(&self, day: usize, shift: ShiftId) -> usize {
        self.assignments[day]
            .iter()
            .filter(|a| **a == Some(shift))
            .count()
    }

    /// The uncovered demand slots of one day.
    pub fn unassigned(&self, day: usize) -> &[ShiftId] {
        &self.unassigned[day]
    }

    pub fn has_unassigned(&self, day: usize) -> bool {
        !self.unassigned[day].is_empty()
    }

    pub fn total_unassigned(&self) -> usize {
        self.unassigned.iter().map(|u| u.len()).sum()
    }

    /// Removes and returns the unassigned slot at `index` on `day`.
    pub fn take_unassigned(&mut self, day: usize, index: usize) -> ShiftId {
        self.invalidate();
        self.unassigned[day].swap_remove(index)
    }

    /// Removes one unassigned slot of the given shift on `day`, if present.
    pub fn take_unassigned_shift(&mut self, day: usize, shift: ShiftId) -> bool {
        if let Some(pos) = self.unassigned[day].iter().position(|s| *s == shift) {
            self.unassigned[day].swap_remove(pos);
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Pushes a demand slot back into the unassigned multiset.
    pub fn push_unassigned(&mut self, day: usize, shift: ShiftId) {
        self.unassigned[day].push(shift);
        self.invalidate();
    }

    /// Replaces the unassigned multiset of one day.
    pub fn set_unassigned(&mut self, day: usize, slots: Vec<ShiftId>) {
        self.unassigned[day] = slots;
        self.invalidate();
    }

    /// Drops all unassigned bookkeeping (greedy construction calls this once
    /// every slot has been placed).
    pub fn clear_unassigned(&mut self) {
        for day in &mut self.unassigned {
            day.clear();
        }
    }

    /// Cached evaluation, if the roster has been evaluated since the last
    /// mutation.
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    pub fn set_evaluation(&mut self, evaluation: Evaluation) {
        self.evaluation = Some(evaluation);
    }

    pub fn violations(&self) -> Option<&[Violation]> {
        self.violations.as_deref()
    }

    pub fn set_violations(&mut self, violations: Vec<Violation>) {
        self.violations = Some(violations);
    }

    /// Clears the evaluation and violation caches.
    pub fn invalidate(&mut self) {
        self.evaluation = None;
        self.violations = None;
    }

    /// Number of cells whose assignment differs from `other`.
    pub fn distance(&self, other: &Roster) -> usize {
        debug_assert_eq!(self.day_count(), other.day_count());
        self.assignments
            .iter()
            .zip(other.assignments.iter())
            .map(|(a, b)| a.iter().zip(b.iter()).filter(|(x, y)| x != y).count())
            .sum()
    }

    /// True if every cell carries the same assignment as in `other`.
    pub fn assignments_eq(&self, other: &Roster) -> bool {
        self.assignments == other.assignments
    }

    /// Checks the coverage invariant: per day, assigned + unassigned demand
    /// equals the problem's demand, and no employee holds two shifts.
    pub fn coverage_consistent(&self) -> bool {
        for day in 0..self.day_count() {
            for shift in self.problem.shifts() {
                let assigned = self.assigned_count_on(day, shift.id());
                let open = self.unassigned[day]
                    .iter()
                    .filter(|s| **s == shift.id())
                    .count();
                if assigned + open != self.problem.demand(shift.id(), day) as usize {
                    return false;
                }
            }
        }
        true
    }
}
