//! Memetic search: evolutionary outer loop with local-search refinement.

mod pool;
mod worker;

pub use pool::{PoolMember, SolutionPool};
pub use worker::MemeticAlgorithmWorker;
