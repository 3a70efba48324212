//! Evaluation - lexicographic multi-rank cost vector
//!
//! One slot per constraint rank, rank 0 being the hardest. Comparison is
//! lexicographic from rank 0 upward; lower is better. The same type carries
//! move deltas, whose components may be negative.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use smallvec::{smallvec, SmallVec};

/// A cost vector with one slot per constraint rank.
///
/// An absolute evaluation holds non-negative components; a delta produced by
/// subtracting two evaluations (or by summing per-constraint move deltas)
/// may hold negative ones. Ordering is lexicographic from rank 0.
///
/// # Examples
///
/// ```
/// use rota_core::Evaluation;
///
/// let a = Evaluation::from_ranks(&[0, 3, 10]);
/// let b = Evaluation::from_ranks(&[1, 0, 0]);
///
/// // One hard violation outweighs any amount of soft cost
/// assert!(a < b);
/// assert_eq!(&b - &a, Evaluation::from_ranks(&[1, -3, -10]));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Evaluation {
    ranks: SmallVec<[i64; 4]>,
}

impl Evaluation {
    /// Creates a zero evaluation with the given number of ranks.
    pub fn zero(rank_count: usize) -> Self {
        Evaluation {
            ranks: smallvec![0; rank_count],
        }
    }

    /// Creates an evaluation from explicit per-rank values.
    pub fn from_ranks(ranks: &[i64]) -> Self {
        Evaluation {
            ranks: SmallVec::from_slice(ranks),
        }
    }

    /// Returns the number of ranks.
    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    /// Returns the cost at the given rank.
    ///
    /// # Panics
    /// Panics if the rank is out of bounds.
    pub fn rank(&self, index: usize) -> i64 {
        self.ranks[index]
    }

    /// Returns all per-rank values as a slice.
    pub fn as_slice(&self) -> &[i64] {
        &self.ranks
    }

    /// Adds a delta onto a single rank.
    pub fn add_at(&mut self, rank: usize, delta: i64) {
        self.ranks[rank] += delta;
    }

    /// Returns true if every component is zero.
    pub fn is_zero(&self) -> bool {
        self.ranks.iter().all(|&c| c == 0)
    }

    /// Returns true if every component is non-negative.
    ///
    /// Holds for absolute evaluations; deltas may violate it.
    pub fn is_absolute(&self) -> bool {
        self.ranks.iter().all(|&c| c >= 0)
    }
}

impl Ord for Evaluation {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.ranks.len(), other.ranks.len());
        for (a, b) in self.ranks.iter().zip(other.ranks.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.ranks.len().cmp(&other.ranks.len())
    }
}

impl PartialOrd for Evaluation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for &Evaluation {
    type Output = Evaluation;

    fn add(self, other: &Evaluation) -> Evaluation {
        debug_assert_eq!(self.ranks.len(), other.ranks.len());
        Evaluation {
            ranks: self
                .ranks
                .iter()
                .zip(other.ranks.iter())
                .map(|(a, b)| a + b)
                .collect(),
        }
    }
}

impl Sub for &Evaluation {
    type Output = Evaluation;

    fn sub(self, other: &Evaluation) -> Evaluation {
        debug_assert_eq!(self.ranks.len(), other.ranks.len());
        Evaluation {
            ranks: self
                .ranks
                .iter()
                .zip(other.ranks.iter())
                .map(|(a, b)| a - b)
                .collect(),
        }
    }
}

impl AddAssign<&Evaluation> for Evaluation {
    fn add_assign(&mut self, other: &Evaluation) {
        debug_assert_eq!(self.ranks.len(), other.ranks.len());
        for (a, b) in self.ranks.iter_mut().zip(other.ranks.iter()) {
            *a += b;
        }
    }
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evaluation({:?})", self.ranks.as_slice())
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranks.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicographic_ordering_prefers_lower_hard_rank() {
        let a = Evaluation::from_ranks(&[0, 100, 100]);
        let b = Evaluation::from_ranks(&[1, 0, 0]);
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn ordering_falls_through_to_lower_ranks() {
        let a = Evaluation::from_ranks(&[2, 5, 1]);
        let b = Evaluation::from_ranks(&[2, 5, 3]);
        assert!(a < b);
    }

    #[test]
    fn equality_is_componentwise() {
        let a = Evaluation::from_ranks(&[1, 2, 3]);
        let b = Evaluation::from_ranks(&[1, 2, 3]);
        let c = Evaluation::from_ranks(&[1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Equal);
    }

    #[test]
    fn ordering_is_antisymmetric_and_transitive() {
        let a = Evaluation::from_ranks(&[0, 1]);
        let b = Evaluation::from_ranks(&[0, 2]);
        let c = Evaluation::from_ranks(&[1, 0]);
        assert!(a < b && b < c && a < c);
        assert!(!(b < a) && !(c < b) && !(c < a));
    }

    #[test]
    fn add_and_sub_are_componentwise() {
        let a = Evaluation::from_ranks(&[1, 2]);
        let b = Evaluation::from_ranks(&[3, -1]);
        assert_eq!(&a + &b, Evaluation::from_ranks(&[4, 1]));
        assert_eq!(&a - &b, Evaluation::from_ranks(&[-2, 3]));
    }

    #[test]
    fn zero_is_zero() {
        let z = Evaluation::zero(3);
        assert!(z.is_zero());
        assert_eq!(z.rank_count(), 3);
        let mut e = z.clone();
        e.add_at(1, 4);
        assert!(!e.is_zero());
        assert_eq!(e.rank(1), 4);
    }

    #[test]
    fn display_joins_ranks() {
        let e = Evaluation::from_ranks(&[1, 0, 7]);
        assert_eq!(e.to_string(), "[1/0/7]");
    }
}
