//! Multistart wrapper around greedy construction.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{Evaluation, EvaluatorSet, Problem, Result, Roster, RotaError};

use super::GreedyConstruction;
use crate::operator::{optional_input, StepOperator};

/// Runs greedy construction `starts` times and keeps the best result by
/// evaluation.
pub struct MultistartGreedyConstruction {
    problem: Arc<Problem>,
    evaluators: Arc<EvaluatorSet>,
    rng: ChaCha8Rng,
    starts: usize,
    template: Option<Roster>,
    inner: GreedyConstruction,
    completed: usize,
    best: Option<(Roster, Evaluation)>,
    initialized: bool,
    done: bool,
}

impl MultistartGreedyConstruction {
    pub fn new(
        problem: Arc<Problem>,
        evaluators: Arc<EvaluatorSet>,
        starts: usize,
    ) -> Result<Self> {
        if starts < 1 {
            return Err(RotaError::InvalidArgument(
                "multistart construction requires at least one start".into(),
            ));
        }
        let inner = GreedyConstruction::new(problem.clone(), evaluators.clone());
        Ok(MultistartGreedyConstruction {
            problem,
            evaluators,
            rng: ChaCha8Rng::from_os_rng(),
            starts,
            template: None,
            inner,
            completed: 0,
            best: None,
            initialized: false,
            done: false,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    fn start_inner(&mut self) -> Result<()> {
        self.inner = GreedyConstruction::new(self.problem.clone(), self.evaluators.clone())
            .with_seed(self.rng.random());
        match self.template.clone() {
            Some(template) => self.inner.init(vec![template]),
            None => self.inner.init(vec![]),
        }
    }
}

impl StepOperator for MultistartGreedyConstruction {
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()> {
        self.template = optional_input(inputs, "MultistartGreedyConstruction")?;
        self.completed = 0;
        self.best = None;
        self.done = false;
        self.start_inner()?;
        self.initialized = true;
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        if !self.initialized {
            return Err(RotaError::InvalidState(
                "MultistartGreedyConstruction stepped before init".into(),
            ));
        }
        if self.inner.step()? {
            let mut candidate = self
                .inner
                .take_result()
                .ok_or_else(|| RotaError::Internal("finished greedy produced no result".into()))?;
            let evaluation = self.evaluators.evaluation(&mut candidate);
            let improves = match &self.best {
                Some((_, best_eval)) => evaluation < *best_eval,
                None => true,
            };
            if improves {
                self.best = Some((candidate, evaluation));
            }
            self.completed += 1;
            if self.completed == self.starts {
                self.done = true;
            } else {
                self.start_inner()?;
            }
        }
        Ok(self.done)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_result(&mut self) -> Option<Roster> {
        if self.done {
            self.best.take().map(|(roster, _)| roster)
        } else {
            None
        }
    }
}
