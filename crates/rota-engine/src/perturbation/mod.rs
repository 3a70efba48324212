//! Perturbation operators: controlled disturbance between descents.
//!
//! Each operator keeps disturbing until at least
//! `floor(strength * employees * days) + 1` cells have changed.

mod exchange;
mod guided_swap;
mod mixed;
mod ruin_recreate;

pub use exchange::ExchangePerturbation;
pub use guided_swap::GuidedSwapPerturbation;
pub use mixed::MixedPerturbationProcedure;
pub use ruin_recreate::RuinAndRecreateProcedure;

use rota_core::Roster;

/// Minimum number of cells a perturbation must change.
pub(crate) fn min_slot_exchanges(strength: f64, roster: &Roster) -> usize {
    (strength * roster.employee_count() as f64 * roster.day_count() as f64).floor() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::covered_roster;

    #[test]
    fn strength_scales_with_the_instance() {
        let roster = covered_roster(28, 8, 2);
        assert_eq!(min_slot_exchanges(0.03, &roster), 7);
        assert_eq!(min_slot_exchanges(0.0, &roster), 1);
    }
}
