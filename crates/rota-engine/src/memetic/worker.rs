//! Multi-threaded memetic worker.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{EvaluatorSet, Problem, Result, Roster, RotaError};
use tracing::{debug, info, warn};

use super::SolutionPool;
use crate::construction::{FastBlockConstruction, GreedyConstruction};
use crate::crossover::BlockCrossover;
use crate::localsearch::VariableNeighborhoodDescent;
use crate::operator::StepOperator;
use crate::perturbation::ExchangePerturbation;
use crate::worker::SearchMonitor;
use rota_config::SearchSettings;

const DRIVER_POLL: Duration = Duration::from_millis(500);

enum ThreadState {
    /// Draw an offspring from the pool, or construct from scratch.
    Acquire,
    /// Greedily restore coverage on a crossover child.
    Reconstruct,
    /// Run the exchange mutation to completion.
    Mutate,
    /// Descend with VND, then submit to the pool.
    Refine,
}

/// Memetic algorithm: a shared solution pool refined by N identical worker
/// threads.
///
/// Each thread loops through a three-stage machine: get a solution (pool
/// offspring via block crossover + greedy reconstruction, or fresh fast
/// construction while the pool is still nearly empty), mutate it, refine it
/// with VND, then submit the result to the pool and the shared best-found.
pub struct MemeticAlgorithmWorker {
    problem: Arc<Problem>,
    evaluators: Arc<EvaluatorSet>,
    settings: SearchSettings,
    monitor: Arc<SearchMonitor>,
    pool: Arc<Mutex<SolutionPool>>,
}

impl MemeticAlgorithmWorker {
    pub fn new(problem: Arc<Problem>, settings: SearchSettings) -> Result<Self> {
        settings
            .validate()
            .map_err(|e| RotaError::InvalidArgument(e.to_string()))?;
        let evaluators = EvaluatorSet::for_problem(&problem);
        let mut pool = SolutionPool::new(
            settings.population_size,
            settings.insertion_strategy,
            settings.worst_set_ratio,
        )?;
        if let Some(seed) = settings.random_seed {
            pool = pool.with_seed(seed ^ 0x706f6f6c);
        }
        Ok(MemeticAlgorithmWorker {
            problem,
            evaluators,
            settings,
            monitor: Arc::new(SearchMonitor::new()),
            pool: Arc::new(Mutex::new(pool)),
        })
    }

    pub fn monitor(&self) -> Arc<SearchMonitor> {
        self.monitor.clone()
    }

    pub fn pool(&self) -> Arc<Mutex<SolutionPool>> {
        self.pool.clone()
    }

    fn lock_pool(&self) -> MutexGuard<'_, SolutionPool> {
        match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Runs the memetic search until the budget is exhausted or the worker
    /// is cancelled.
    pub fn solve(&self) -> Result<Option<Roster>> {
        self.monitor.begin(&self.settings);
        info!(
            threads = self.settings.thread_count,
            population = self.settings.population_size,
            "starting memetic search"
        );

        thread::scope(|scope| {
            for index in 0..self.settings.thread_count {
                scope.spawn(move || self.search_thread(index));
            }
            while !self.monitor.stop_optimization() {
                thread::sleep(DRIVER_POLL);
                self.monitor.update_progress();
                self.monitor.update_trace_record();
            }
        });

        self.monitor.mark_done();
        let best = self.monitor.get_best_found();
        info!(
            iterations = self.monitor.total_iterations(),
            pool_size = self.lock_pool().len(),
            found = best.is_some(),
            "memetic search finished"
        );
        Ok(best)
    }

    fn search_thread(&self, index: usize) {
        let seed = self
            .settings
            .random_seed
            .map(|seed| seed + index as u64)
            .unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let operators = self.build_operators(&mut rng);
        let (mut crossover, mut construction, mut reconstruction, mut mutation, mut vnd) =
            match operators {
                Ok(operators) => operators,
                Err(e) => {
                    warn!(thread = index, "could not build operators: {e}");
                    return;
                }
            };

        let mut state = ThreadState::Acquire;
        while !self.monitor.stop_optimization() {
            let step = self.advance(
                &mut state,
                &mut crossover,
                &mut construction,
                &mut reconstruction,
                &mut mutation,
                &mut vnd,
            );
            if let Err(e) = step {
                warn!(thread = index, "memetic step failed, restarting: {e}");
                state = ThreadState::Acquire;
            }
        }
        debug!(thread = index, "thread exiting");
    }

    #[allow(clippy::type_complexity)]
    fn build_operators(
        &self,
        rng: &mut ChaCha8Rng,
    ) -> Result<(
        BlockCrossover,
        FastBlockConstruction,
        GreedyConstruction,
        Option<ExchangePerturbation>,
        VariableNeighborhoodDescent,
    )> {
        let crossover = BlockCrossover::new(self.settings.crossover_block_sizes.clone())?
            .with_seed(rng.random());
        let construction =
            FastBlockConstruction::new(self.problem.clone()).with_seed(rng.random());
        let reconstruction = GreedyConstruction::new(self.problem.clone(), self.evaluators.clone())
            .with_seed(rng.random());
        // the three-way exchange needs at least three employees
        let mutation = if self.problem.employee_count() >= 3 {
            Some(
                ExchangePerturbation::new(self.settings.perturbation_strength)?
                    .with_seed(rng.random()),
            )
        } else {
            None
        };
        let vnd = VariableNeighborhoodDescent::new(
            self.evaluators.clone(),
            self.settings.block_sizes.clone(),
            self.settings.selection_policy,
        )?
        .with_rng(ChaCha8Rng::seed_from_u64(rng.random()));
        Ok((crossover, construction, reconstruction, mutation, vnd))
    }

    /// One bounded unit of work of the thread's state machine.
    fn advance(
        &self,
        state: &mut ThreadState,
        crossover: &mut BlockCrossover,
        construction: &mut FastBlockConstruction,
        reconstruction: &mut GreedyConstruction,
        mutation: &mut Option<ExchangePerturbation>,
        vnd: &mut VariableNeighborhoodDescent,
    ) -> Result<()> {
        match state {
            ThreadState::Acquire => {
                let offspring = self.lock_pool().offspring(crossover)?;
                match offspring {
                    Some(child) => {
                        reconstruction.init(vec![child])?;
                        *state = ThreadState::Reconstruct;
                    }
                    None => {
                        // pool too small for crossover: construct from
                        // scratch and go straight to refinement
                        construction.init(vec![])?;
                        construction.run()?;
                        let mut roster = construction.take_result().ok_or_else(|| {
                            RotaError::Internal("finished construction produced no result".into())
                        })?;
                        self.evaluators.evaluation(&mut roster);
                        vnd.init(vec![roster])?;
                        *state = ThreadState::Refine;
                    }
                }
            }
            ThreadState::Reconstruct => {
                if reconstruction.step()? {
                    let roster = reconstruction.take_result().ok_or_else(|| {
                        RotaError::Internal("finished reconstruction produced no result".into())
                    })?;
                    match mutation.as_mut() {
                        Some(mutation) => {
                            mutation.init(vec![roster])?;
                            *state = ThreadState::Mutate;
                        }
                        None => {
                            vnd.init(vec![roster])?;
                            *state = ThreadState::Refine;
                        }
                    }
                }
            }
            ThreadState::Mutate => {
                let Some(mutation) = mutation.as_mut() else {
                    return Err(RotaError::InvalidState(
                        "mutation state without a mutation operator".into(),
                    ));
                };
                if mutation.step()? {
                    let roster = mutation.take_result().ok_or_else(|| {
                        RotaError::Internal("finished mutation produced no result".into())
                    })?;
                    vnd.init(vec![roster])?;
                    *state = ThreadState::Refine;
                }
            }
            ThreadState::Refine => {
                if vnd.step()? {
                    let mut roster = vnd.take_result().ok_or_else(|| {
                        RotaError::Internal("finished descent produced no result".into())
                    })?;
                    self.evaluators.evaluation(&mut roster);
                    self.lock_pool().select(&roster);
                    self.monitor.update_best_found(&roster);
                    self.monitor.increment_total_iterations();
                    *state = ThreadState::Acquire;
                }
            }
        }
        Ok(())
    }
}
