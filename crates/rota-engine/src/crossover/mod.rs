//! Crossover operators for the memetic worker.

mod block;

pub use block::BlockCrossover;
