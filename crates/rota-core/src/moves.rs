//! Move types: block swap between two employees, and remove-and-replace of a
//! single demand slot.
//!
//! Moves are plain value types; they mutate a [`Roster`] directly. A block
//! swap is its own inverse, so undo is re-apply.

use crate::domain::ShiftId;
use crate::error::{Result, RotaError};
use crate::roster::Roster;

/// Exchanges the assignments of two employees over a window of consecutive
/// days.
///
/// # Examples
///
/// ```
/// use rota_core::SwapMove;
///
/// let mv = SwapMove::new(0, 3, 2, 4).unwrap();
/// assert_eq!(mv.end_day(), 5);
/// assert_eq!(mv.days().count(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapMove {
    employee1: usize,
    employee2: usize,
    start_day: usize,
    block_size: usize,
}

impl SwapMove {
    pub fn new(
        employee1: usize,
        employee2: usize,
        start_day: usize,
        block_size: usize,
    ) -> Result<Self> {
        if block_size < 1 {
            return Err(RotaError::InvalidArgument(
                "swap block size must be at least 1".into(),
            ));
        }
        if employee1 == employee2 {
            return Err(RotaError::InvalidArgument(
                "swap requires two distinct employees".into(),
            ));
        }
        Ok(SwapMove {
            employee1,
            employee2,
            start_day,
            block_size,
        })
    }

    pub fn employee1(&self) -> usize {
        self.employee1
    }

    pub fn employee2(&self) -> usize {
        self.employee2
    }

    pub fn start_day(&self) -> usize {
        self.start_day
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Last day of the window (inclusive).
    pub fn end_day(&self) -> usize {
        self.start_day + self.block_size - 1
    }

    /// The day window as a range.
    pub fn days(&self) -> std::ops::RangeInclusive<usize> {
        self.start_day..=self.end_day()
    }

    /// True if applying the move would change at least one cell: some day in
    /// the window carries different assignments for the two employees.
    pub fn is_effective(&self, roster: &Roster) -> bool {
        self.days()
            .any(|d| roster.assignment(d, self.employee1) != roster.assignment(d, self.employee2))
    }

    /// Exchanges the two employees' assignments on every day of the window.
    ///
    /// Returns true iff at least one cell changed; the roster caches are
    /// invalidated only in that case. Applying the same move twice restores
    /// the original assignments.
    pub fn apply(&self, roster: &mut Roster) -> bool {
        let mut changed = false;
        for day in self.days() {
            let a = roster.assignment(day, self.employee1);
            let b = roster.assignment(day, self.employee2);
            if a != b {
                // set_assignment invalidates; fine to call per changed cell
                roster.set_assignment(day, self.employee1, b);
                roster.set_assignment(day, self.employee2, a);
                changed = true;
            }
        }
        changed
    }
}

/// Moves one demand slot between two holders on a day. A holder is either an
/// employee (by index) or the day's unassigned bucket (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveReplaceMove {
    origin: Option<usize>,
    target: Option<usize>,
    shift: ShiftId,
    day: usize,
}

impl RemoveReplaceMove {
    pub fn new(origin: Option<usize>, target: Option<usize>, shift: ShiftId, day: usize) -> Self {
        RemoveReplaceMove {
            origin,
            target,
            shift,
            day,
        }
    }

    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn shift(&self) -> ShiftId {
        self.shift
    }

    pub fn day(&self) -> usize {
        self.day
    }

    /// Takes the slot from the origin holder and hands it to the target.
    ///
    /// Returns `Ok(false)` when origin and target coincide. Errors when the
    /// origin does not hold the slot or the target employee already works
    /// that day.
    pub fn apply(&self, roster: &mut Roster) -> Result<bool> {
        if self.origin == self.target {
            return Ok(false);
        }
        match self.origin {
            Some(employee) => {
                if roster.assignment(self.day, employee) != Some(self.shift) {
                    return Err(RotaError::InvalidState(format!(
                        "employee {employee} does not work {} on day {}",
                        self.shift, self.day
                    )));
                }
                roster.set_assignment(self.day, employee, None);
            }
            None => {
                if !roster.take_unassigned_shift(self.day, self.shift) {
                    return Err(RotaError::InvalidState(format!(
                        "no unassigned {} slot on day {}",
                        self.shift, self.day
                    )));
                }
            }
        }
        match self.target {
            Some(employee) => {
                if roster.is_assigned(self.day, employee) {
                    // roll back the removal before reporting
                    match self.origin {
                        Some(origin) => roster.set_assignment(self.day, origin, Some(self.shift)),
                        None => roster.push_unassigned(self.day, self.shift),
                    }
                    return Err(RotaError::InvalidState(format!(
                        "employee {employee} already works on day {}",
                        self.day
                    )));
                }
                roster.set_assignment(self.day, employee, Some(self.shift));
            }
            None => roster.push_unassigned(self.day, self.shift),
        }
        Ok(true)
    }
}
