//! Greedy completion by estimated assignment cost.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rota_core::{
    Evaluation, EvaluatorSet, Problem, RemoveReplaceMove, Result, Roster, RotaError, ShiftId,
};

use crate::operator::{not_initialized, optional_input, StepOperator};

/// Completes a roster by assigning every open demand slot to the free
/// employee with the lowest estimated cost.
///
/// When given an existing (possibly inconsistent) roster, `init` first
/// reconciles staffing per day and shift: over-staffed assignments are
/// dropped at random, missing ones are enumerated into the unassigned
/// multiset. Days are then processed in randomized order, one day per step;
/// ties between employees keep the first encountered. Also serves as the
/// reconstructor after ruin and after crossover.
pub struct GreedyConstruction {
    problem: Arc<Problem>,
    evaluators: Arc<EvaluatorSet>,
    rng: ChaCha8Rng,
    roster: Option<Roster>,
    day_order: Vec<usize>,
    next_day: usize,
    done: bool,
}

impl GreedyConstruction {
    pub fn new(problem: Arc<Problem>, evaluators: Arc<EvaluatorSet>) -> Self {
        GreedyConstruction {
            problem,
            evaluators,
            rng: ChaCha8Rng::from_os_rng(),
            roster: None,
            day_order: Vec::new(),
            next_day: 0,
            done: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Aligns assigned counts with demand on every day: random drops for
    /// over-staffing, open slots for under-staffing.
    fn reconcile(&mut self, roster: &mut Roster) {
        let shifts: Vec<ShiftId> = self.problem.shifts().iter().map(|s| s.id()).collect();
        for day in 0..roster.day_count() {
            let mut open = Vec::new();
            for &shift in &shifts {
                let demand = self.problem.demand(shift, day) as usize;
                let mut holders: Vec<usize> = (0..roster.employee_count())
                    .filter(|&e| roster.assignment(day, e) == Some(shift))
                    .collect();
                if holders.len() > demand {
                    holders.shuffle(&mut self.rng);
                    for &employee in holders.iter().take(holders.len() - demand) {
                        roster.set_assignment(day, employee, None);
                    }
                } else {
                    for _ in holders.len()..demand {
                        open.push(shift);
                    }
                }
            }
            roster.set_unassigned(day, open);
        }
    }

    /// Free employee minimizing the estimated cost vector for this slot.
    fn cheapest_employee(&self, roster: &Roster, shift: ShiftId, day: usize) -> Option<usize> {
        let mut best: Option<(usize, Evaluation)> = None;
        for employee in 0..roster.employee_count() {
            if roster.is_assigned(day, employee) {
                continue;
            }
            let cost = self
                .evaluators
                .estimated_assignment_cost(roster, employee, shift, day);
            let beats_best = match best.as_ref() {
                Some((_, b)) => cost < *b,
                None => true,
            };
            if beats_best {
                best = Some((employee, cost));
            }
        }
        best.map(|(employee, _)| employee)
    }
}

impl StepOperator for GreedyConstruction {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let mut roster = match optional_input(inputs, "GreedyConstruction")? {
            Some(roster) => roster,
            None => Roster::empty(self.problem.clone()),
        };
        self.reconcile(&mut roster);
        self.day_order = (0..roster.day_count()).collect();
        self.day_order.shuffle(&mut self.rng);
        self.next_day = 0;
        self.done = false;
        self.roster = Some(roster);
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let mut roster = self
            .roster
            .take()
            .ok_or_else(|| not_initialized("GreedyConstruction"))?;
        let day = self.day_order[self.next_day];
        let result = (|| -> Result<()> {
            while let Some(&shift) = roster.unassigned(day).first() {
                let employee = self.cheapest_employee(&roster, shift, day).ok_or_else(|| {
                    RotaError::NoFeasibleSolution(format!(
                        "no free employee left for {shift} on day {day}"
                    ))
                })?;
                RemoveReplaceMove::new(None, Some(employee), shift, day).apply(&mut roster)?;
            }
            Ok(())
        })();
        self.next_day += 1;
        if result.is_ok() && self.next_day == self.day_order.len() {
            roster.clear_unassigned();
            roster.invalidate();
            self.done = true;
        }
        self.roster = Some(roster);
        result?;
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
