//! Coin-flip mix of ruin-and-recreate and exchange perturbation.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Problem, Result, Roster};
use tracing::debug;

use super::{ExchangePerturbation, RuinAndRecreateProcedure};
use crate::operator::StepOperator;

enum Chosen {
    Ruin,
    Exchange,
}

/// On each `init`, picks ruin-and-recreate or exchange perturbation with
/// probability one half each and delegates the run to it.
///
/// Instances with fewer than three employees always get ruin-and-recreate,
/// since the three-way exchange cannot run there.
pub struct MixedPerturbationProcedure {
    rng: ChaCha8Rng,
    ruin: RuinAndRecreateProcedure,
    exchange: ExchangePerturbation,
    chosen: Chosen,
}

impl MixedPerturbationProcedure {
    pub fn new(
        problem: Arc<Problem>,
        evaluators: Arc<EvaluatorSet>,
        strength: f64,
    ) -> Result<Self> {
        Ok(MixedPerturbationProcedure {
            rng: ChaCha8Rng::from_os_rng(),
            ruin: RuinAndRecreateProcedure::new(problem, evaluators, strength)?,
            exchange: ExchangePerturbation::new(strength)?,
            chosen: Chosen::Ruin,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        let (ruin_seed, exchange_seed) = (self.rng.random(), self.rng.random());
        self.ruin = self.ruin.with_seed(ruin_seed);
        self.exchange = self.exchange.with_seed(exchange_seed);
        self
    }
}

impl StepOperator for MixedPerturbationProcedure {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        let exchange_possible = inputs
            .first()
            .map(|roster| roster.employee_count() >= 3)
            .unwrap_or(false);
        self.chosen = if exchange_possible && self.rng.random_bool(0.5) {
            Chosen::Exchange
        } else {
            Chosen::Ruin
        };
        match self.chosen {
            Chosen::Ruin => {
                debug!("perturbing via ruin-and-recreate");
                self.ruin.init(inputs)
            }
            Chosen::Exchange => {
                debug!("perturbing via exchange");
                self.exchange.init(inputs)
            }
        }
    }

    fn step(&mut self) -> Result<bool> {
        match self.chosen {
            Chosen::Ruin => self.ruin.step(),
            Chosen::Exchange => self.exchange.step(),
        }
    }

    fn is_done(&self) -> bool {
        match self.chosen {
            Chosen::Ruin => self.ruin.is_done(),
            Chosen::Exchange => self.exchange.is_done(),
        }
    }

    fn take_result(&mut self) -> Option<Roster> {
        match self.chosen {
            Chosen::Ruin => self.ruin.take_result(),
            Chosen::Exchange => self.exchange.take_result(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{covered_roster, fixture_evaluators};

    #[test]
    fn always_disturbs_and_restores_coverage() {
        let original = covered_roster(10, 5, 2);
        let evaluators = fixture_evaluators(original.problem());
        let mut op =
            MixedPerturbationProcedure::new(original.problem().clone(), evaluators, 0.05)
                .unwrap()
                .with_seed(47);
        // several invocations exercise both branches of the coin flip
        for _ in 0..6 {
            op.init(vec![original.clone()]).unwrap();
            op.run().unwrap();
            let perturbed = op.take_result().unwrap();
            assert!(perturbed.coverage_consistent());
        }
    }

    #[test]
    fn two_employee_instances_fall_back_to_ruin() {
        let original = covered_roster(6, 2, 1);
        let evaluators = fixture_evaluators(original.problem());
        let mut op =
            MixedPerturbationProcedure::new(original.problem().clone(), evaluators, 0.1)
                .unwrap()
                .with_seed(53);
        for _ in 0..4 {
            op.init(vec![original.clone()]).unwrap();
            op.run().unwrap();
            assert!(op.take_result().unwrap().coverage_consistent());
        }
    }
}
