//! Swap-based neighborhoods with incremental evaluation.
//!
//! Three flavors share one enumeration core:
//! - [`SwapNeighborhood`] evaluates candidates against the full constraint
//!   catalog (complete post-move evaluation)
//! - [`BiasedSwapNeighborhood`] evaluates only a caller-supplied subset of
//!   active constraints (delta against zero)
//! - [`SwapConstraintSatisfactionNeighborhood`] counts newly satisfied and
//!   newly unsatisfied constraint units, optionally behind a move filter

mod biased;
mod filter;
mod satisfaction;
mod swap;

use std::collections::VecDeque;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rota_core::{Roster, SwapMove};

pub use biased::{ActiveSet, BiasedSwapNeighborhood};
pub use filter::{NoReturnFilter, SwapMoveFilter};
pub use satisfaction::SwapConstraintSatisfactionNeighborhood;
pub use swap::SwapNeighborhood;

/// Day-by-day move enumeration shared by the neighborhood flavors.
///
/// Keeps a queue of start days; whenever the per-day move queue runs dry the
/// next start day is drawn (at random when an RNG is attached, in order
/// otherwise) and all employee pairs `(e1, e2)` with `e1 < e2` are pushed.
pub(crate) struct MoveQueue {
    block_size: usize,
    start_days: Vec<usize>,
    moves: VecDeque<SwapMove>,
}

impl MoveQueue {
    pub(crate) fn new(block_size: usize) -> Self {
        MoveQueue {
            block_size,
            start_days: Vec::new(),
            moves: VecDeque::new(),
        }
    }

    pub(crate) fn block_size(&self) -> usize {
        self.block_size
    }

    pub(crate) fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size;
        self.start_days.clear();
        self.moves.clear();
    }

    /// Restarts enumeration over the roster's day window.
    pub(crate) fn reset(&mut self, roster: &Roster) {
        let days = roster.day_count();
        self.start_days = if self.block_size <= days {
            (0..=days - self.block_size).collect()
        } else {
            Vec::new()
        };
        self.moves.clear();
    }

    /// Next candidate move, or `None` when the neighborhood is exhausted.
    pub(crate) fn next(
        &mut self,
        roster: &Roster,
        mut rng: Option<&mut ChaCha8Rng>,
    ) -> Option<SwapMove> {
        loop {
            if let Some(mv) = self.moves.pop_front() {
                return Some(mv);
            }
            if self.start_days.is_empty() {
                return None;
            }
            let index = match rng.as_deref_mut() {
                Some(rng) => rng.random_range(0..self.start_days.len()),
                None => 0,
            };
            let day = self.start_days.remove(index);
            let employees = roster.employee_count();
            for e1 in 0..employees {
                for e2 in (e1 + 1)..employees {
                    if let Ok(mv) = SwapMove::new(e1, e2, day, self.block_size) {
                        self.moves.push_back(mv);
                    }
                }
            }
        }
    }
}
