//! Bounded solution population with duplicate rejection.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rota_core::{Evaluation, Result, Roster, RotaError};
use tracing::debug;

use crate::crossover::BlockCrossover;
use crate::operator::StepOperator;
use rota_config::InsertionStrategy;

/// One pool entry: a solution with its evaluation pinned at insertion time.
#[derive(Debug, Clone)]
pub struct PoolMember {
    pub roster: Roster,
    pub evaluation: Evaluation,
}

/// Bounded population shared by the memetic worker threads.
///
/// Every method runs under the worker's pool lock; solutions enter and
/// leave only as deep copies.
pub struct SolutionPool {
    capacity: usize,
    strategy: InsertionStrategy,
    worst_set_ratio: f64,
    rng: ChaCha8Rng,
    members: Vec<PoolMember>,
    next_replace: usize,
}

impl SolutionPool {
    pub fn new(
        capacity: usize,
        strategy: InsertionStrategy,
        worst_set_ratio: f64,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(RotaError::InvalidArgument(
                "population size must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&worst_set_ratio) {
            return Err(RotaError::InvalidArgument(format!(
                "worst set ratio must lie in [0, 1], got {worst_set_ratio}"
            )));
        }
        Ok(SolutionPool {
            capacity,
            strategy,
            worst_set_ratio,
            rng: ChaCha8Rng::from_os_rng(),
            members: Vec::new(),
            next_replace: 0,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn members(&self) -> &[PoolMember] {
        &self.members
    }

    /// Best member by evaluation.
    pub fn best(&self) -> Option<&PoolMember> {
        self.members
            .iter()
            .min_by(|a, b| a.evaluation.cmp(&b.evaluation))
    }

    /// Crossover child of two distinct random parents, or `None` while the
    /// pool holds at most one member.
    pub fn offspring(&mut self, crossover: &mut BlockCrossover) -> Result<Option<Roster>> {
        if self.members.len() <= 1 {
            return Ok(None);
        }
        let first = self.rng.random_range(0..self.members.len());
        let mut second = self.rng.random_range(0..self.members.len() - 1);
        if second >= first {
            second += 1;
        }
        crossover.init(vec![
            self.members[first].roster.clone(),
            self.members[second].roster.clone(),
        ])?;
        crossover.run()?;
        crossover
            .take_result()
            .map(Some)
            .ok_or_else(|| RotaError::Internal("finished crossover produced no result".into()))
    }

    /// Submits a candidate (deep-copied) under the configured replacement
    /// strategy. Returns whether the pool changed.
    ///
    /// Duplicates (equal evaluation and equal assignments) are rejected.
    /// While the pool is below capacity the candidate is appended.
    pub fn select(&mut self, candidate: &Roster) -> bool {
        let Some(evaluation) = candidate.evaluation().cloned() else {
            debug_assert!(false, "pool candidates must be evaluated");
            return false;
        };

        if self.members.is_empty() {
            self.members.push(PoolMember {
                roster: candidate.clone(),
                evaluation,
            });
            return true;
        }

        let mut best_so_far = true;
        let mut worst_eval = self.members[0].evaluation.clone();
        for member in &self.members {
            if evaluation >= member.evaluation {
                best_so_far = false;
            }
            if member.evaluation > worst_eval {
                worst_eval = member.evaluation.clone();
            }
        }
        let duplicate = self.members.iter().any(|member| {
            member.evaluation == evaluation && member.roster.assignments_eq(candidate)
        });
        if duplicate {
            debug!("rejecting duplicate pool candidate");
            return false;
        }
        if best_so_far {
            debug!(%evaluation, "candidate improves every pool member");
        }

        let member = PoolMember {
            roster: candidate.clone(),
            evaluation,
        };
        if self.members.len() < self.capacity {
            self.members.push(member);
            return true;
        }

        let index = match self.strategy {
            InsertionStrategy::ReplaceNext => {
                let index = self.next_replace % self.members.len();
                self.next_replace = index + 1;
                index
            }
            InsertionStrategy::ReplaceOneOfWorst => {
                let worst: Vec<usize> = (0..self.members.len())
                    .filter(|&i| self.members[i].evaluation == worst_eval)
                    .collect();
                worst[self.rng.random_range(0..worst.len())]
            }
            InsertionStrategy::ReplaceInWorstSet => {
                let mut order: Vec<usize> = (0..self.members.len()).collect();
                // shuffle first so the worst-first sort breaks ties randomly
                order.shuffle(&mut self.rng);
                order.sort_by(|&a, &b| {
                    self.members[b].evaluation.cmp(&self.members[a].evaluation)
                });
                let span = ((self.worst_set_ratio * self.members.len() as f64).floor() as usize)
                    .max(1);
                order[self.rng.random_range(0..span)]
            }
        };
        self.members[index] = member;
        true
    }
}
