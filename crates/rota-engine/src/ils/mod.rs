//! Iterated Local Search: the single-thread step machine and its
//! multi-threaded worker.

mod machine;
mod worker;

pub use machine::{IlsSnapshot, IteratedLocalSearch};
pub use worker::IteratedLocalSearchWorker;
