//! Uniform block interleave of two parent rosters.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{Result, Roster, RotaError};

use crate::operator::{not_initialized, StepOperator};

/// Builds a child that alternates between day blocks kept from the first
/// parent and day blocks copied from the second.
///
/// Block lengths are drawn uniformly from a configured set. Copying
/// overwrites whole day columns, so the child usually violates coverage and
/// is expected to be reconstructed by greedy construction afterwards.
pub struct BlockCrossover {
    block_lengths: Vec<usize>,
    rng: ChaCha8Rng,
    child: Option<Roster>,
    second_parent: Option<Roster>,
    day: usize,
    copying: bool,
    done: bool,
}

impl BlockCrossover {
    pub fn new(block_lengths: Vec<usize>) -> Result<Self> {
        if block_lengths.is_empty() || block_lengths.iter().any(|&b| b == 0) {
            return Err(RotaError::InvalidArgument(
                "crossover block lengths must be positive".into(),
            ));
        }
        Ok(BlockCrossover {
            block_lengths,
            rng: ChaCha8Rng::from_os_rng(),
            child: None,
            second_parent: None,
            day: 0,
            copying: false,
            done: false,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }
}

impl StepOperator for BlockCrossover {
    fn init(&mut self, mut inputs: Vec<Roster>) -> Result<()> {
        if inputs.len() != 2 {
            return Err(RotaError::InvalidArgument(format!(
                "BlockCrossover requires exactly two parents, got {}",
                inputs.len()
            )));
        }
        let second = inputs.remove(1);
        let first = inputs.remove(0);
        if first.day_count() != second.day_count()
            || first.employee_count() != second.employee_count()
        {
            return Err(RotaError::InvalidArgument(
                "crossover parents must share the same shape".into(),
            ));
        }
        self.child = Some(first);
        self.second_parent = Some(second);
        self.day = 0;
        self.copying = false;
        self.done = false;
        Ok(())
    }

    /// One step processes one keep-or-copy block.
    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        let (child, second) = match (self.child.as_mut(), self.second_parent.as_ref()) {
            (Some(child), Some(second)) => (child, second),
            _ => return Err(not_initialized("BlockCrossover")),
        };
        let days = child.day_count();
        let length = self.block_lengths[self.rng.random_range(0..self.block_lengths.len())];
        if self.copying {
            for day in self.day..(self.day + length).min(days) {
                child.set_day_assignments(day, second.day_assignments(day));
            }
        }
        self.day += length;
        self.copying = !self.copying;
        if self.day >= days {
            child.invalidate();
            self.done = true;
        }
        Ok(self.done)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<Roster> {
        if self.done {
            self.second_parent = None;
            self.child.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{covered_roster, fixture_problem};
    use rota_core::Roster;

    fn cross(p1: Roster, p2: Roster, seed: u64) -> Roster {
        let mut op = BlockCrossover::new(vec![1, 5, 7]).unwrap().with_seed(seed);
        op.init(vec![p1, p2]).unwrap();
        op.run().unwrap();
        op.take_result().unwrap()
    }

    #[test]
    fn identical_parents_produce_an_equal_child() {
        let parent = covered_roster(10, 4, 2);
        let child = cross(parent.clone(), parent.clone(), 3);
        assert!(child.assignments_eq(&parent));
        assert!(!child.is_evaluated());
    }

    #[test]
    fn crossover_is_deterministic_for_a_seed() {
        let p1 = covered_roster(10, 4, 2);
        let mut p2 = p1.clone();
        // shuffle a recognizable difference into the second parent
        let mv = rota_core::SwapMove::new(0, 3, 2, 5).unwrap();
        mv.apply(&mut p2);

        let a = cross(p1.clone(), p2.clone(), 11);
        let b = cross(p1, p2, 11);
        assert!(a.assignments_eq(&b));
    }

    #[test]
    fn every_day_column_comes_from_one_parent() {
        let p1 = covered_roster(12, 4, 2);
        let mut p2 = p1.clone();
        for day in 0..12 {
            let mv = rota_core::SwapMove::new(day % 3, 3, day, 1).unwrap();
            mv.apply(&mut p2);
        }
        let child = cross(p1.clone(), p2.clone(), 29);
        for day in 0..12 {
            let from_p1 = child.day_assignments(day) == p1.day_assignments(day);
            let from_p2 = child.day_assignments(day) == p2.day_assignments(day);
            assert!(from_p1 || from_p2, "day {day} mixes both parents");
        }
    }

    #[test]
    fn wrong_parent_count_is_rejected() {
        let parent = covered_roster(4, 3, 1);
        let mut op = BlockCrossover::new(vec![1, 5, 7]).unwrap();
        assert!(matches!(
            op.init(vec![parent]),
            Err(RotaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mismatched_parents_are_rejected() {
        let p1 = covered_roster(4, 3, 1);
        let p2 = Roster::empty(fixture_problem(5, 3, 1));
        let mut op = BlockCrossover::new(vec![1, 5, 7]).unwrap();
        assert!(matches!(
            op.init(vec![p1, p2]),
            Err(RotaError::InvalidArgument(_))
        ));
    }
}
