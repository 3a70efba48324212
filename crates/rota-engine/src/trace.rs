//! Time-stamped search traces.
//!
//! Two kinds of records: the best-found value over wall-clock time, and the
//! verbose per-iteration snapshot. Both are append-only with non-decreasing
//! timestamps.

use std::time::Duration;

use rota_core::Evaluation;

/// One best-found sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub elapsed: Duration,
    pub value: Evaluation,
}

/// Append-only best-found trace.
///
/// A sample is appended only if it is forced, the recording period has
/// elapsed since the last sample, or the value differs from the last
/// recorded one.
#[derive(Debug, Clone)]
pub struct Trace {
    label: String,
    period: Duration,
    records: Vec<TraceRecord>,
}

impl Trace {
    pub fn new(label: impl Into<String>, period: Duration) -> Self {
        Trace {
            label: label.into(),
            period,
            records: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends under the force/period/changed rule; returns whether the
    /// record was kept.
    pub fn append(&mut self, elapsed: Duration, value: Evaluation, force: bool) -> bool {
        let keep = force
            || match self.records.last() {
                Some(last) => {
                    elapsed.saturating_sub(last.elapsed) >= self.period || last.value != value
                }
                None => true,
            };
        if keep {
            debug_assert!(
                self.records
                    .last()
                    .map(|last| last.elapsed <= elapsed)
                    .unwrap_or(true),
                "trace timestamps must be non-decreasing"
            );
            self.records.push(TraceRecord { elapsed, value });
        }
        keep
    }

    /// Latest recorded value at or before `at`.
    pub fn value_at(&self, at: Duration) -> Option<&Evaluation> {
        self.records
            .iter()
            .take_while(|r| r.elapsed <= at)
            .last()
            .map(|r| &r.value)
    }
}

/// One per-iteration snapshot of a search thread.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub iteration: u64,
    pub best_found: Evaluation,
    pub last_accepted: Option<Evaluation>,
    pub current: Option<Evaluation>,
    /// Cells differing between the last accepted and the current solution.
    pub distance: usize,
}

/// Append-only iteration trace.
#[derive(Debug, Clone, Default)]
pub struct IterationTrace {
    records: Vec<IterationRecord>,
}

impl IterationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(v: i64) -> Evaluation {
        Evaluation::from_ranks(&[v])
    }

    #[test]
    fn first_record_is_always_kept() {
        let mut trace = Trace::new("best", Duration::from_secs(1));
        assert!(trace.append(Duration::ZERO, eval(5), false));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn unchanged_value_within_period_is_dropped() {
        let mut trace = Trace::new("best", Duration::from_secs(1));
        trace.append(Duration::ZERO, eval(5), false);
        assert!(!trace.append(Duration::from_millis(10), eval(5), false));
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn changed_value_is_kept_immediately() {
        let mut trace = Trace::new("best", Duration::from_secs(1));
        trace.append(Duration::ZERO, eval(5), false);
        assert!(trace.append(Duration::from_millis(10), eval(4), false));
    }

    #[test]
    fn period_expiry_keeps_even_unchanged_values() {
        let mut trace = Trace::new("best", Duration::from_millis(100));
        trace.append(Duration::ZERO, eval(5), false);
        assert!(trace.append(Duration::from_millis(150), eval(5), false));
    }

    #[test]
    fn force_flag_overrides_the_rules() {
        let mut trace = Trace::new("best", Duration::from_secs(10));
        trace.append(Duration::ZERO, eval(5), false);
        assert!(trace.append(Duration::from_millis(1), eval(5), true));
    }

    #[test]
    fn value_at_scans_up_to_the_bound() {
        let mut trace = Trace::new("best", Duration::ZERO);
        trace.append(Duration::from_millis(10), eval(9), false);
        trace.append(Duration::from_millis(20), eval(7), false);
        trace.append(Duration::from_millis(30), eval(4), false);
        assert_eq!(trace.value_at(Duration::from_millis(5)), None);
        assert_eq!(trace.value_at(Duration::from_millis(20)), Some(&eval(7)));
        assert_eq!(trace.value_at(Duration::from_millis(99)), Some(&eval(4)));
    }
}
