//! The Iterated Local Search step machine.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{Evaluation, EvaluatorSet, Problem, Result, Roster, RotaError};
use tracing::debug;

use crate::construction::{FastBlockConstruction, GreedyConstruction};
use crate::localsearch::VariableNeighborhoodDescent;
use crate::operator::StepOperator;
use crate::perturbation::MixedPerturbationProcedure;
use rota_config::SearchSettings;

/// Evaluation snapshot of one machine, taken for iteration tracing.
#[derive(Debug, Clone)]
pub struct IlsSnapshot {
    pub best_found: Evaluation,
    pub last_accepted: Option<Evaluation>,
    pub current: Option<Evaluation>,
    pub distance: usize,
}

/// Single-thread Iterated Local Search.
///
/// One `next_step` call advances the machine by one bounded unit of work so
/// a worker can poll its stop predicate in between: the first step builds
/// (or greedily reconstructs) the starting solution, later steps advance the
/// descent one step, and each completed descent runs acceptance, restart and
/// perturbation logic before re-arming the descent.
pub struct IteratedLocalSearch {
    evaluators: Arc<EvaluatorSet>,
    rng: ChaCha8Rng,
    restart_iterations: u64,
    worse_acceptance_rate: f64,
    max_iterations: Option<u64>,
    construction: FastBlockConstruction,
    reconstruction: GreedyConstruction,
    vnd: VariableNeighborhoodDescent,
    perturbation: MixedPerturbationProcedure,
    initial: Option<Roster>,
    overall_best: Option<Roster>,
    restart_best: Option<Roster>,
    restart_best_iteration: u64,
    last_accepted: Option<Roster>,
    iteration: u64,
    started: bool,
    done: bool,
}

impl IteratedLocalSearch {
    pub fn new(
        problem: Arc<Problem>,
        evaluators: Arc<EvaluatorSet>,
        settings: &SearchSettings,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let construction = FastBlockConstruction::new(problem.clone()).with_seed(rng.random());
        let reconstruction =
            GreedyConstruction::new(problem.clone(), evaluators.clone()).with_seed(rng.random());
        let vnd = VariableNeighborhoodDescent::new(
            evaluators.clone(),
            settings.block_sizes.clone(),
            settings.selection_policy,
        )?
        .with_rng(ChaCha8Rng::seed_from_u64(rng.random()));
        let perturbation = MixedPerturbationProcedure::new(
            problem,
            evaluators.clone(),
            settings.perturbation_strength,
        )?
        .with_seed(rng.random());
        Ok(IteratedLocalSearch {
            evaluators,
            rng,
            restart_iterations: settings.restart_iterations,
            worse_acceptance_rate: settings.worse_acceptance_rate,
            max_iterations: settings.max_iterations,
            construction,
            reconstruction,
            vnd,
            perturbation,
            initial: None,
            overall_best: None,
            restart_best: None,
            restart_best_iteration: 0,
            last_accepted: None,
            iteration: 0,
            started: false,
            done: false,
        })
    }

    /// Seeds the machine with an existing solution; the first step will
    /// reconstruct it greedily instead of building from scratch.
    pub fn set_initial(&mut self, initial: Roster) {
        self.initial = Some(initial);
    }

    /// Overrides the iteration budget (workers stop globally instead).
    pub fn set_max_iterations(&mut self, max_iterations: Option<u64>) {
        self.max_iterations = max_iterations;
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn best_found(&self) -> Option<&Roster> {
        self.overall_best.as_ref()
    }

    pub fn last_accepted(&self) -> Option<&Roster> {
        self.last_accepted.as_ref()
    }

    /// The solution currently being descended (or the last accepted one
    /// between descents).
    pub fn current(&self) -> Option<&Roster> {
        self.vnd.working().or(self.last_accepted.as_ref())
    }

    /// Adopts a better solution found elsewhere (best-found sharing across
    /// worker threads).
    pub fn adopt_best(&mut self, candidate: Roster) {
        let Some(candidate_eval) = candidate.evaluation().cloned() else {
            return;
        };
        if self
            .evaluation_of(&self.overall_best)
            .map(|best| candidate_eval < best)
            .unwrap_or(true)
        {
            self.overall_best = Some(candidate.clone());
        }
        if self
            .evaluation_of(&self.restart_best)
            .map(|best| candidate_eval < best)
            .unwrap_or(true)
        {
            self.restart_best = Some(candidate);
            self.restart_best_iteration = self.iteration;
        }
    }

    /// Drops the in-flight solution after an internal error; the next step
    /// rebuilds from scratch while the best-founds survive.
    pub fn recover(&mut self) {
        self.initial = None;
        self.started = false;
    }

    /// Evaluation snapshot for iteration tracing.
    pub fn snapshot(&self) -> Option<IlsSnapshot> {
        let best_found = self.evaluation_of(&self.overall_best)?;
        let last_accepted = self.evaluation_of(&self.last_accepted);
        let current = self.current().and_then(|r| r.evaluation().cloned());
        let distance = match (self.last_accepted.as_ref(), self.current()) {
            (Some(last), Some(current)) => last.distance(current),
            _ => 0,
        };
        Some(IlsSnapshot {
            best_found,
            last_accepted,
            current,
            distance,
        })
    }

    fn evaluation_of(&self, roster: &Option<Roster>) -> Option<Evaluation> {
        roster.as_ref().and_then(|r| r.evaluation().cloned())
    }

    /// Advances the machine by one step. Returns `Ok(true)` once the
    /// iteration budget is exhausted.
    pub fn next_step(&mut self) -> Result<bool> {
        if self.done {
            return Ok(true);
        }
        if !self.started {
            self.initialize()?;
            self.started = true;
            return Ok(false);
        }
        if let Some(max) = self.max_iterations {
            if self.iteration >= max {
                self.done = true;
                return Ok(true);
            }
        }
        if self.vnd.step()? {
            self.complete_iteration()?;
        }
        Ok(self.done)
    }

    /// Builds the starting solution: fast construction from scratch, or
    /// greedy reconstruction of a supplied initial solution.
    fn initialize(&mut self) -> Result<()> {
        let mut roster = match self.initial.take() {
            Some(initial) => {
                self.reconstruction.init(vec![initial])?;
                self.reconstruction.run()?;
                self.reconstruction.take_result().ok_or_else(|| {
                    RotaError::Internal("finished reconstruction produced no result".into())
                })?
            }
            None => {
                self.construction.init(vec![])?;
                self.construction.run()?;
                self.construction.take_result().ok_or_else(|| {
                    RotaError::Internal("finished construction produced no result".into())
                })?
            }
        };
        let evaluation = self.evaluators.evaluation(&mut roster);
        debug!(%evaluation, "starting solution built");
        self.update_overall_best(&roster);
        self.restart_best = Some(roster.clone());
        self.restart_best_iteration = self.iteration;
        self.last_accepted = Some(roster.clone());
        self.vnd.init(vec![roster])?;
        Ok(())
    }

    fn update_overall_best(&mut self, candidate: &Roster) {
        let candidate_eval = candidate.evaluation().cloned();
        let improved = match (candidate_eval, self.evaluation_of(&self.overall_best)) {
            (Some(candidate_eval), Some(best)) => candidate_eval < best,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if improved {
            self.overall_best = Some(candidate.clone());
        }
    }

    /// Acceptance, restart and perturbation after a completed descent.
    fn complete_iteration(&mut self) -> Result<()> {
        let mut current = self.vnd.take_result().ok_or_else(|| {
            RotaError::Internal("finished descent produced no result".into())
        })?;
        let current_eval = self.evaluators.evaluation(&mut current);
        self.iteration += 1;

        self.update_overall_best(&current);
        let restart_best_eval = self.evaluation_of(&self.restart_best);
        let improves_restart_best = match &restart_best_eval {
            Some(best) => current_eval < *best,
            None => true,
        };
        if improves_restart_best {
            self.restart_best = Some(current.clone());
            self.restart_best_iteration = self.iteration;
        }

        // restart when the current basin has been dry for too long
        if self.iteration - self.restart_best_iteration > self.restart_iterations {
            debug!(iteration = self.iteration, "restarting from scratch");
            self.construction.init(vec![])?;
            self.construction.run()?;
            let mut fresh = self.construction.take_result().ok_or_else(|| {
                RotaError::Internal("finished construction produced no result".into())
            })?;
            self.evaluators.evaluation(&mut fresh);
            self.update_overall_best(&fresh);
            self.restart_best = Some(fresh.clone());
            self.restart_best_iteration = self.iteration;
            self.last_accepted = Some(fresh.clone());
            self.vnd.init(vec![fresh])?;
            return Ok(());
        }

        let at_restart_best = improves_restart_best
            || restart_best_eval
                .map(|best| current_eval == best)
                .unwrap_or(false);
        let retained = if at_restart_best {
            current
        } else {
            // strictly worse: keep it only with the configured probability
            if self.rng.random_bool(1.0 - self.worse_acceptance_rate) {
                self.restart_best
                    .clone()
                    .ok_or_else(|| RotaError::Internal("restart best vanished".into()))?
            } else {
                debug!(%current_eval, "accepting a worse solution");
                current
            }
        };
        self.last_accepted = Some(retained.clone());

        self.perturbation.init(vec![retained])?;
        self.perturbation.run()?;
        let perturbed = self.perturbation.take_result().ok_or_else(|| {
            RotaError::Internal("finished perturbation produced no result".into())
        })?;
        self.vnd.init(vec![perturbed])?;
        Ok(())
    }
}
