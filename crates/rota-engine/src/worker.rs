//! Shared worker state: best-found slot, iteration counter, cancellation
//! and progress.
//!
//! One `SearchMonitor` is shared between the search threads of a worker and
//! the driver thread. All solution state sits behind one mutex; solutions
//! cross the boundary only as deep copies taken inside the critical section.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rota_core::{Evaluation, Roster};
use rota_config::SearchSettings;

use crate::trace::{IterationRecord, IterationTrace, Trace};

struct MonitorState {
    best_found: Option<Roster>,
    best_evaluation: Option<Evaluation>,
    iterations: u64,
    progress: u8,
    started: Option<Instant>,
    time_limit: Option<Duration>,
    max_iterations: Option<u64>,
    best_trace: Option<Trace>,
    iteration_trace: Option<IterationTrace>,
}

/// Shared, lock-protected state of one running worker.
pub struct SearchMonitor {
    cancelled: AtomicBool,
    done: AtomicBool,
    state: Mutex<MonitorState>,
}

impl Default for SearchMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchMonitor {
    pub fn new() -> Self {
        SearchMonitor {
            cancelled: AtomicBool::new(false),
            done: AtomicBool::new(false),
            state: Mutex::new(MonitorState {
                best_found: None,
                best_evaluation: None,
                iterations: 0,
                progress: 0,
                started: None,
                time_limit: None,
                max_iterations: None,
                best_trace: None,
                iteration_trace: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // a poisoned monitor only ever holds clones; keep going
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Arms the monitor for a fresh run.
    pub(crate) fn begin(&self, settings: &SearchSettings) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.done.store(false, Ordering::SeqCst);
        let mut state = self.lock();
        state.best_found = None;
        state.best_evaluation = None;
        state.iterations = 0;
        state.progress = 0;
        state.started = Some(Instant::now());
        state.time_limit = settings.time_limit();
        state.max_iterations = settings.max_iterations;
        state.best_trace = settings.trace.record_best_found.then(|| {
            Trace::new("best_found", settings.trace.record_period())
        });
        state.iteration_trace = settings.trace.record_iterations.then(IterationTrace::new);
    }

    /// Requests cancellation; threads observe it at their next poll.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// The stop predicate polled between operator steps: cancelled, run
    /// already finished, wall-clock budget crossed, or iteration budget
    /// crossed.
    pub fn stop_optimization(&self) -> bool {
        if self.is_cancelled() || self.is_done() {
            return true;
        }
        let state = self.lock();
        if let (Some(started), Some(limit)) = (state.started, state.time_limit) {
            if started.elapsed() > limit {
                return true;
            }
        }
        if let Some(max) = state.max_iterations {
            if state.iterations >= max {
                return true;
            }
        }
        false
    }

    pub fn elapsed(&self) -> Duration {
        self.lock()
            .started
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn total_iterations(&self) -> u64 {
        self.lock().iterations
    }

    /// Progress in percent: 100 once done, otherwise the larger of time and
    /// iteration progress, clamped to 99.
    pub fn progress(&self) -> u8 {
        if self.is_done() {
            return 100;
        }
        self.lock().progress
    }

    /// Deep copy of the stored best-found solution.
    pub fn get_best_found(&self) -> Option<Roster> {
        self.lock().best_found.clone()
    }

    pub fn best_evaluation(&self) -> Option<Evaluation> {
        self.lock().best_evaluation.clone()
    }

    /// Stores a deep copy of `candidate` if it is strictly better than the
    /// current best. Returns whether the slot was replaced.
    pub(crate) fn update_best_found(&self, candidate: &Roster) -> bool {
        let Some(candidate_eval) = candidate.evaluation().cloned() else {
            debug_assert!(false, "best-found candidates must be evaluated");
            return false;
        };
        let mut state = self.lock();
        let improved = match &state.best_evaluation {
            Some(best) => candidate_eval < *best,
            None => true,
        };
        if improved {
            state.best_found = Some(candidate.clone());
            state.best_evaluation = Some(candidate_eval.clone());
            let elapsed = state
                .started
                .map(|s| s.elapsed())
                .unwrap_or(Duration::ZERO);
            if let Some(trace) = state.best_trace.as_mut() {
                trace.append(elapsed, candidate_eval, false);
            }
        }
        improved
    }

    pub(crate) fn increment_total_iterations(&self) -> u64 {
        let mut state = self.lock();
        state.iterations += 1;
        state.iterations
    }

    pub(crate) fn add_iteration_record(&self, record: IterationRecord) {
        let mut state = self.lock();
        if let Some(trace) = state.iteration_trace.as_mut() {
            trace.append(record);
        }
    }

    pub(crate) fn iteration_trace_enabled(&self) -> bool {
        self.lock().iteration_trace.is_some()
    }

    /// Re-samples the best value into the trace on the periodic driver tick.
    pub(crate) fn update_trace_record(&self) {
        let mut state = self.lock();
        let elapsed = state
            .started
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO);
        let value = state.best_evaluation.clone();
        if let (Some(trace), Some(value)) = (state.best_trace.as_mut(), value) {
            trace.append(elapsed, value, false);
        }
    }

    /// Recomputes the progress percentage from the elapsed share of the
    /// time budget and the consumed share of the iteration budget.
    pub(crate) fn update_progress(&self) {
        let mut state = self.lock();
        let time_percent = match (state.started, state.time_limit) {
            (Some(started), Some(limit)) if !limit.is_zero() => {
                (started.elapsed().as_secs_f64() / limit.as_secs_f64() * 100.0) as u8
            }
            _ => 0,
        };
        let iteration_percent = match state.max_iterations {
            Some(max) if max > 0 => ((state.iterations as f64 / max as f64) * 100.0) as u8,
            _ => 0,
        };
        state.progress = time_percent.max(iteration_percent).min(99);
    }

    /// Marks the run finished: a final forced trace sample, full progress.
    pub(crate) fn mark_done(&self) {
        {
            let mut state = self.lock();
            let elapsed = state
                .started
                .map(|s| s.elapsed())
                .unwrap_or(Duration::ZERO);
            let value = state.best_evaluation.clone();
            if let (Some(trace), Some(value)) = (state.best_trace.as_mut(), value) {
                trace.append(elapsed, value, true);
            }
            state.progress = 100;
        }
        self.done.store(true, Ordering::SeqCst);
    }

    /// Copy of the best-found trace, if recording was enabled.
    pub fn best_trace(&self) -> Option<Trace> {
        self.lock().best_trace.clone()
    }

    /// Copy of the iteration trace, if recording was enabled.
    pub fn iteration_trace(&self) -> Option<IterationTrace> {
        self.lock().iteration_trace.clone()
    }
}
