//! Multi-threaded Iterated Local Search worker.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rota_core::{EvaluatorSet, Problem, Result, Roster, RotaError};
use tracing::{debug, info, warn};

use super::IteratedLocalSearch;
use crate::trace::IterationRecord;
use crate::worker::SearchMonitor;
use rota_config::SearchSettings;

/// Pause between driver polls of the stop predicate and progress refresh.
const DRIVER_POLL: Duration = Duration::from_millis(500);

/// Runs N independent ILS machines in parallel against a shared best-found
/// slot and a common time/iteration budget.
///
/// Thread `i` seeds its machine with `random_seed + i`. Between machine
/// steps each thread polls the stop predicate, publishes iteration and
/// best-found updates to the [`SearchMonitor`], and (when sharing is
/// enabled) pulls a strictly better worker-wide best back into its machine.
pub struct IteratedLocalSearchWorker {
    problem: Arc<Problem>,
    evaluators: Arc<EvaluatorSet>,
    settings: SearchSettings,
    monitor: Arc<SearchMonitor>,
}

impl IteratedLocalSearchWorker {
    pub fn new(problem: Arc<Problem>, settings: SearchSettings) -> Result<Self> {
        settings
            .validate()
            .map_err(|e| RotaError::InvalidArgument(e.to_string()))?;
        let evaluators = EvaluatorSet::for_problem(&problem);
        Ok(IteratedLocalSearchWorker {
            problem,
            evaluators,
            settings,
            monitor: Arc::new(SearchMonitor::new()),
        })
    }

    /// Handle for cancellation and observation from other threads.
    pub fn monitor(&self) -> Arc<SearchMonitor> {
        self.monitor.clone()
    }

    /// Runs the search until the budget is exhausted or the worker is
    /// cancelled; returns the best solution found, if any was constructed.
    pub fn solve(&self, initial: Option<Roster>) -> Result<Option<Roster>> {
        self.monitor.begin(&self.settings);
        info!(
            threads = self.settings.thread_count,
            time_limit_secs = ?self.settings.time_limit_secs,
            max_iterations = ?self.settings.max_iterations,
            "starting iterated local search"
        );

        thread::scope(|scope| {
            for index in 0..self.settings.thread_count {
                let initial = initial.clone();
                scope.spawn(move || self.search_thread(index, initial));
            }
            // driver: poll cancellation/budgets and refresh progress
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
            elapsed_ms = self.monitor.elapsed().as_millis() as u64,
            found = best.is_some(),
            "iterated local search finished"
        );
        Ok(best)
    }

    fn search_thread(&self, index: usize, initial: Option<Roster>) {
        let seed = self
            .settings
            .random_seed
            .map(|seed| seed + index as u64)
            .unwrap_or_else(rand::random);
        let mut ils = match IteratedLocalSearch::new(
            self.problem.clone(),
            self.evaluators.clone(),
            &self.settings,
            seed,
        ) {
            Ok(ils) => ils,
            Err(e) => {
                warn!(thread = index, "could not build search machine: {e}");
                return;
            }
        };
        // stopping is governed globally by the monitor
        ils.set_max_iterations(None);
        if let Some(initial) = initial {
            ils.set_initial(initial);
        }

        while !self.monitor.stop_optimization() {
            let before = ils.iteration();
            if let Err(e) = ils.next_step() {
                warn!(thread = index, "search step failed, rebuilding: {e}");
                ils.recover();
                continue;
            }
            if ils.iteration() > before {
                self.monitor.increment_total_iterations();
                if self.monitor.iteration_trace_enabled() {
                    if let Some(snapshot) = ils.snapshot() {
                        self.monitor.add_iteration_record(IterationRecord {
                            iteration: ils.iteration(),
                            best_found: snapshot.best_found,
                            last_accepted: snapshot.last_accepted,
                            current: snapshot.current,
                            distance: snapshot.distance,
                        });
                    }
                }
            }
            if let Some(best) = ils.best_found() {
                if best.is_evaluated() {
                    self.monitor.update_best_found(best);
                }
            }
            if self.settings.share_best_found {
                self.pull_shared_best(&mut ils);
            }
        }
        debug!(thread = index, iterations = ils.iteration(), "thread exiting");
    }

    /// Feeds the worker-wide best back into this thread's machine when it is
    /// strictly better than what the thread has.
    fn pull_shared_best(&self, ils: &mut IteratedLocalSearch) {
        let Some(shared_eval) = self.monitor.best_evaluation() else {
            return;
        };
        let own_eval = ils.best_found().and_then(|r| r.evaluation().cloned());
        let strictly_better = match own_eval {
            Some(own) => shared_eval < own,
            None => true,
        };
        if strictly_better {
            if let Some(shared) = self.monitor.get_best_found() {
                ils.adopt_best(shared);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fixture_evaluators, fixture_problem};
    use std::time::Instant;

    fn settings(threads: usize, iterations: u64) -> SearchSettings {
        let mut settings = SearchSettings::default()
            .with_thread_count(threads)
            .with_max_iterations(iterations)
            .with_random_seed(99)
            .with_block_sizes(vec![1, 2]);
        settings.trace.record_best_found = true;
        settings
    }

    #[test]
    fn single_thread_run_finds_a_solution() {
        let problem = fixture_problem(7, 4, 2);
        let worker = IteratedLocalSearchWorker::new(problem, settings(1, 30)).unwrap();
        let best = worker.solve(None).unwrap().unwrap();
        assert!(best.coverage_consistent());
        assert!(best.is_evaluated());
        assert!(worker.monitor().is_done());
        assert_eq!(worker.monitor().progress(), 100);
        assert!(worker.monitor().total_iterations() >= 30);
    }

    #[test]
    fn parallel_threads_share_one_best_found() {
        let problem = fixture_problem(7, 4, 2);
        let worker = IteratedLocalSearchWorker::new(problem, settings(3, 60)).unwrap();
        let best = worker.solve(None).unwrap().unwrap();
        assert!(best.coverage_consistent());
        let monitor = worker.monitor();
        assert_eq!(
            monitor.get_best_found().unwrap().evaluation().cloned(),
            monitor.best_evaluation()
        );
    }

    #[test]
    fn best_trace_values_are_monotone() {
        let problem = fixture_problem(7, 4, 2);
        let worker = IteratedLocalSearchWorker::new(problem, settings(2, 40)).unwrap();
        worker.solve(None).unwrap();
        let trace = worker.monitor().best_trace().unwrap();
        assert!(!trace.is_empty());
        for pair in trace.records().windows(2) {
            assert!(pair[0].value >= pair[1].value);
            assert!(pair[0].elapsed <= pair[1].elapsed);
        }
    }

    #[test]
    fn cancellation_stops_the_worker_promptly() {
        let problem = fixture_problem(7, 4, 2);
        // no budgets: only cancellation can stop this run
        let mut unlimited = SearchSettings::default()
            .with_thread_count(2)
            .with_random_seed(7)
            .with_block_sizes(vec![1, 2]);
        unlimited.max_iterations = None;
        unlimited.time_limit_secs = None;
        let worker = Arc::new(IteratedLocalSearchWorker::new(problem, unlimited).unwrap());
        let monitor = worker.monitor();

        let runner = {
            let worker = worker.clone();
            thread::spawn(move || worker.solve(None))
        };
        thread::sleep(Duration::from_millis(200));
        let cancelled_at = Instant::now();
        monitor.cancel();
        let best = runner.join().expect("worker thread must not panic").unwrap();
        // one driver poll plus one operator step of slack
        assert!(cancelled_at.elapsed() < Duration::from_secs(5));
        assert!(monitor.is_done());
        // the run had time to construct something
        assert!(best.is_some());
    }

    #[test]
    fn seeded_initial_solution_is_used() {
        let problem = fixture_problem(6, 4, 2);
        let evaluators = fixture_evaluators(&problem);
        let mut initial = crate::test_utils::covered_roster(6, 4, 2);
        evaluators.evaluation(&mut initial);

        let worker = IteratedLocalSearchWorker::new(problem, settings(1, 10)).unwrap();
        let best = worker.solve(Some(initial)).unwrap().unwrap();
        assert!(best.coverage_consistent());
    }

    #[test]
    fn invalid_settings_are_rejected_up_front() {
        let problem = fixture_problem(3, 2, 1);
        let mut bad = SearchSettings::default();
        bad.thread_count = 0;
        assert!(matches!(
            IteratedLocalSearchWorker::new(problem, bad),
            Err(RotaError::InvalidArgument(_))
        ));
    }
}
