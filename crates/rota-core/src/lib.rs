//! Core types for the rota shift-rostering engine.
//!
//! This crate defines the data the search engine operates on:
//! - The domain model (employees, shifts, contracts, scheduling period)
//! - [`Problem`], the immutable instance description with its ranked
//!   constraint catalog
//! - [`Roster`], the mutable timetable a search thread owns
//! - [`Evaluation`], the lexicographic cost vector
//! - The constraint facade ([`Constraint`] / [`ConstraintEvaluator`]) and
//!   [`EvaluatorSet`], the delta-evaluation service built from a problem
//! - The move types ([`SwapMove`], [`RemoveReplaceMove`])

pub mod constraint;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod moves;
pub mod problem;
pub mod roster;

pub use constraint::{
    Constraint, ConstraintEvaluator, EvaluatorSet, SatisfactionDelta, Violation,
};
pub use domain::{Contract, ContractId, Employee, SchedulingPeriod, Shift, ShiftId, Weekday};
pub use error::{Result, RotaError};
pub use evaluation::Evaluation;
pub use moves::{RemoveReplaceMove, SwapMove};
pub use problem::{Problem, ProblemBuilder};
pub use roster::Roster;
