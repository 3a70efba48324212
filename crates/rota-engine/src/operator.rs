//! Stepping interface shared by construction, perturbation, crossover and
//! local-search operators.
//!
//! Workers advance operators one bounded step at a time so that a
//! cancellation predicate can be polled between steps.

use rota_core::{Result, Roster, RotaError};

/// An operator that transforms solutions in bounded steps.
///
/// Lifecycle: `init` with the operator's input solutions (arity depends on
/// the operator: construction takes 0 or 1, perturbation and descent exactly
/// 1, crossover exactly 2), then `step` until `is_done`, then `take_result`.
/// Operators are reusable: a later `init` starts a fresh run.
pub trait StepOperator {
    /// Prepares a run over the given input solutions.
    ///
    /// # Errors
    /// `InvalidArgument` when the input arity or content does not fit the
    /// operator.
    fn init(&mut self, inputs: Vec<Roster>) -> Result<()>;

    /// Advances the operator by one bounded step.
    ///
    /// Returns `Ok(true)` once the operator has finished; stepping a
    /// finished operator is a no-op that also returns `Ok(true)`.
    ///
    /// # Errors
    /// `InvalidState` when called before `init`.
    fn step(&mut self) -> Result<bool>;

    /// True once the current run has produced its result.
    fn is_done(&self) -> bool;

    /// Takes the produced solution, leaving the operator empty.
    fn take_result(&mut self) -> Option<Roster>;

    /// Steps the operator to completion.
    fn run(&mut self) -> Result<()> {
        while !self.step()? {}
        Ok(())
    }
}

/// Extracts the single input solution an operator requires.
pub(crate) fn single_input(mut inputs: Vec<Roster>, operator: &str) -> Result<Roster> {
    if inputs.len() != 1 {
        return Err(RotaError::InvalidArgument(format!(
            "{operator} requires exactly one input solution, got {}",
            inputs.len()
        )));
    }
    Ok(inputs.remove(0))
}

/// Extracts the optional input solution of a construction operator.
pub(crate) fn optional_input(mut inputs: Vec<Roster>, operator: &str) -> Result<Option<Roster>> {
    match inputs.len() {
        0 => Ok(None),
        1 => Ok(Some(inputs.remove(0))),
        n => Err(RotaError::InvalidArgument(format!(
            "{operator} accepts at most one input solution, got {n}"
        ))),
    }
}

/// The "not initialized" error shared by operator `step` implementations.
pub(crate) fn not_initialized(operator: &str) -> RotaError {
    RotaError::InvalidState(format!("{operator} stepped before init"))
}
