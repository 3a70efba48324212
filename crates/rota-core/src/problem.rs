//! Problem - the immutable rostering instance.
//!
//! Holds the employee/shift/contract catalogs, the per-day demand matrix and
//! the ranked constraint catalog. Solutions keep an `Arc<Problem>`; the
//! problem never references solutions.

use std::sync::Arc;

use crate::constraint::Constraint;
use crate::domain::{Contract, Employee, SchedulingPeriod, Shift, ShiftId};
use crate::error::{Result, RotaError};

/// An immutable rostering problem instance.
///
/// Built via [`ProblemBuilder`]. Constraint ranks are indexed from 0
/// (hardest) upward; every rank index up to [`Problem::max_rank_index`]
/// exists, possibly empty.
#[derive(Clone)]
pub struct Problem {
    employees: Vec<Employee>,
    shifts: Vec<Shift>,
    contracts: Vec<Contract>,
    period: SchedulingPeriod,
    /// demand[day][shift_index]
    demand: Vec<Vec<u32>>,
    /// constraints[rank]
    constraints: Vec<Vec<Arc<dyn Constraint>>>,
}

impl std::fmt::Debug for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Problem")
            .field("employees", &self.employees.len())
            .field("shifts", &self.shifts.len())
            .field("days", &self.period.len())
            .field("ranks", &self.constraints.len())
            .finish()
    }
}

impl Problem {
    /// Starts building a problem over the given period.
    pub fn builder(period: SchedulingPeriod) -> ProblemBuilder {
        ProblemBuilder::new(period)
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn period(&self) -> &SchedulingPeriod {
        &self.period
    }

    pub fn day_count(&self) -> usize {
        self.period.len()
    }

    /// Position of a shift in the shift catalog.
    pub fn shift_index(&self, shift: ShiftId) -> Option<usize> {
        self.shifts.iter().position(|s| s.id() == shift)
    }

    /// Demand for one shift type on one day.
    pub fn demand(&self, shift: ShiftId, day: usize) -> u32 {
        match self.shift_index(shift) {
            Some(idx) => self.demand[day][idx],
            None => 0,
        }
    }

    /// The demand multiset of one day, one entry per required slot.
    pub fn demand_slots(&self, day: usize) -> Vec<ShiftId> {
        let mut slots = Vec::new();
        for (idx, shift) in self.shifts.iter().enumerate() {
            for _ in 0..self.demand[day][idx] {
                slots.push(shift.id());
            }
        }
        slots
    }

    /// Total number of demanded slots on one day.
    pub fn total_demand(&self, day: usize) -> u32 {
        self.demand[day].iter().sum()
    }

    pub fn constraints(&self, rank: usize) -> &[Arc<dyn Constraint>] {
        &self.constraints[rank]
    }

    pub fn rank_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn max_rank_index(&self) -> usize {
        self.constraints.len().saturating_sub(1)
    }
}

/// Builder for [`Problem`], validating shape on `build`.
pub struct ProblemBuilder {
    employees: Vec<Employee>,
    shifts: Vec<Shift>,
    contracts: Vec<Contract>,
    period: SchedulingPeriod,
    demand: Vec<(ShiftId, usize, u32)>,
    constraints: Vec<(usize, Arc<dyn Constraint>)>,
    rank_count: usize,
}

impl ProblemBuilder {
    pub fn new(period: SchedulingPeriod) -> Self {
        ProblemBuilder {
            employees: Vec::new(),
            shifts: Vec::new(),
            contracts: Vec::new(),
            period,
            demand: Vec::new(),
            constraints: Vec::new(),
            rank_count: 1,
        }
    }

    pub fn employee(mut self, employee: Employee) -> Self {
        self.employees.push(employee);
        self
    }

    pub fn shift(mut self, shift: Shift) -> Self {
        self.shifts.push(shift);
        self
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contracts.push(contract);
        self
    }

    /// Sets the demand for one shift on one day.
    pub fn demand(mut self, shift: ShiftId, day: usize, count: u32) -> Self {
        self.demand.push((shift, day, count));
        self
    }

    /// Sets the same demand for one shift on every day of the period.
    pub fn uniform_demand(mut self, shift: ShiftId, count: u32) -> Self {
        for day in 0..self.period.len() {
            self.demand.push((shift, day, count));
        }
        self
    }

    /// Registers a constraint at the given rank (0 = hardest).
    pub fn constraint(mut self, rank: usize, constraint: Arc<dyn Constraint>) -> Self {
        self.rank_count = self.rank_count.max(rank + 1);
        self.constraints.push((rank, constraint));
        self
    }

    /// Forces at least `count` ranks to exist, even if some stay empty.
    pub fn rank_count(mut self, count: usize) -> Self {
        self.rank_count = self.rank_count.max(count);
        self
    }

    pub fn build(self) -> Result<Problem> {
        if self.period.is_empty() {
            return Err(RotaError::InvalidArgument(
                "scheduling period must contain at least one day".into(),
            ));
        }
        if self.employees.is_empty() {
            return Err(RotaError::InvalidArgument(
                "problem requires at least one employee".into(),
            ));
        }
        if self.shifts.is_empty() {
            return Err(RotaError::InvalidArgument(
                "problem requires at least one shift type".into(),
            ));
        }
        let mut demand = vec![vec![0u32; self.shifts.len()]; self.period.len()];
        for (shift, day, count) in &self.demand {
            let shift_idx = self
                .shifts
                .iter()
                .position(|s| s.id() == *shift)
                .ok_or_else(|| {
                    RotaError::InvalidArgument(format!("demand references unknown shift {shift}"))
                })?;
            if *day >= self.period.len() {
                return Err(RotaError::InvalidArgument(format!(
                    "demand references day {day} outside the {}-day period",
                    self.period.len()
                )));
            }
            demand[*day][shift_idx] = *count;
        }
        let mut constraints: Vec<Vec<Arc<dyn Constraint>>> = vec![Vec::new(); self.rank_count];
        for (rank, constraint) in self.constraints {
            constraints[rank].push(constraint);
        }
        Ok(Problem {
            employees: self.employees,
            shifts: self.shifts,
            contracts: self.contracts,
            period: self.period,
            demand,
            constraints,
        })
    }
}
