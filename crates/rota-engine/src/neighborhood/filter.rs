//! Move filters for the satisfaction neighborhood.

use rota_core::{Roster, ShiftId, SwapMove};

/// Predicate over candidate swap moves. Rejected moves are skipped during
/// enumeration; used as a lightweight tabu mechanism.
pub trait SwapMoveFilter: Send {
    fn accepts(&self, roster: &Roster, mv: &SwapMove) -> bool;
}

/// Rejects moves that would revert the involved pair to its assignments at
/// perturbation start, on any day of the move window.
pub struct NoReturnFilter {
    origin: Vec<Vec<Option<ShiftId>>>,
}

impl NoReturnFilter {
    /// Snapshots the roster's assignments as the forbidden return point.
    pub fn of(roster: &Roster) -> Self {
        NoReturnFilter {
            origin: (0..roster.day_count())
                .map(|day| roster.day_assignments(day).to_vec())
                .collect(),
        }
    }
}

impl SwapMoveFilter for NoReturnFilter {
    fn accepts(&self, roster: &Roster, mv: &SwapMove) -> bool {
        for day in mv.days() {
            let cur1 = roster.assignment(day, mv.employee1());
            let cur2 = roster.assignment(day, mv.employee2());
            if cur1 == cur2 {
                // the swap leaves this day untouched
                continue;
            }
            let reverts = cur2 == self.origin[day][mv.employee1()]
                && cur1 == self.origin[day][mv.employee2()];
            if reverts {
                return false;
            }
        }
        true
    }
}
