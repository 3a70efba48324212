//! Metaheuristic search engine for shift rostering.
//!
//! This crate provides the search machinery that turns a
//! [`rota_core::Problem`] into a good [`rota_core::Roster`]:
//! - Swap neighborhoods with incremental (delta) evaluation
//! - Construction, perturbation and crossover operators behind one
//!   stepping interface
//! - Variable Neighborhood Descent
//! - Iterated Local Search and its multi-threaded worker
//! - A memetic worker with a shared solution pool
//! - Trace and progress reporting

pub mod construction;
pub mod crossover;
pub mod ils;
pub mod localsearch;
pub mod memetic;
pub mod neighborhood;
pub mod operator;
pub mod perturbation;
pub mod trace;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use construction::{
    ConstructionWithProgressiveDescent, FastBlockConstruction, GreedyConstruction,
    MultistartGreedyConstruction,
};
pub use crossover::BlockCrossover;
pub use ils::{IteratedLocalSearch, IteratedLocalSearchWorker};
pub use localsearch::{BiasedVariableNeighborhoodDescent, VariableNeighborhoodDescent};
pub use memetic::{MemeticAlgorithmWorker, PoolMember, SolutionPool};
pub use neighborhood::{
    ActiveSet, BiasedSwapNeighborhood, NoReturnFilter, SwapConstraintSatisfactionNeighborhood,
    SwapMoveFilter, SwapNeighborhood,
};
pub use operator::StepOperator;
pub use perturbation::{
    ExchangePerturbation, GuidedSwapPerturbation, MixedPerturbationProcedure,
    RuinAndRecreateProcedure,
};
pub use trace::{IterationRecord, IterationTrace, Trace, TraceRecord};
pub use worker::SearchMonitor;
