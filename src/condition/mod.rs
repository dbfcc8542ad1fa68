//! Conditions: time windows over which a predicate on one mnemonic holds
//!
//! Every sample of the source series is classified as a *true-mark* or a
//! *false-mark*. The marks are merged into maximal, disjoint, ascending
//! intervals:
//!
//! ```text
//! samples   OFF@0   ON@5   OFF@10          ON@20
//! marks      F       T      F               T
//! intervals         [5 ........ 10)        (20 .... open
//! ```
//!
//! A true-mark that no later false-mark closes starts an open interval:
//! the predicate is presumed to keep holding until the run shows otherwise.
//!
//! Each [`Condition`] owns its interval list. Composites only borrow
//! conditions (see [`composite`]).

pub mod composite;

pub use composite::CompositeCondition;

use serde::{Deserialize, Serialize};

use crate::series::{MnemonicSeries, Value};
use crate::{Error, Result};

/// Typed predicate over a sample value, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    /// Label equals the reference label
    EqualsLabel(String),
    /// Label differs from the reference label
    NotEqualsLabel(String),
    /// Number equals the reference number
    EqualsNumber(f64),
    /// Number strictly greater than the threshold
    GreaterThan(f64),
    /// Number strictly less than the threshold
    LessThan(f64),
}

impl Predicate {
    /// Value kind this predicate consumes.
    #[must_use]
    pub const fn expected_kind(&self) -> &'static str {
        match self {
            Self::EqualsLabel(_) | Self::NotEqualsLabel(_) => "label",
            Self::EqualsNumber(_) | Self::GreaterThan(_) | Self::LessThan(_) => "number",
        }
    }

    /// Evaluate against a value; `None` when the value has the wrong kind.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, value: &Value) -> Option<bool> {
        match self {
            Self::EqualsLabel(reference) => value.as_label().map(|l| l == reference),
            Self::NotEqualsLabel(reference) => value.as_label().map(|l| l != reference),
            Self::EqualsNumber(reference) => value.as_number().map(|n| n == *reference),
            Self::GreaterThan(threshold) => value.as_number().map(|n| n > *threshold),
            Self::LessThan(threshold) => value.as_number().map(|n| n < *threshold),
        }
    }
}

/// End of a [`TimeInterval`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IntervalEnd {
    /// Closed at this (exclusive) time
    At(f64),
    /// Still true at the latest known time of the run
    Open,
}

/// Span of time over which a condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    start: f64,
    end: IntervalEnd,
}

impl TimeInterval {
    /// Closed interval `[start, end)`.
    #[must_use]
    pub const fn closed(start: f64, end: f64) -> Self {
        Self {
            start,
            end: IntervalEnd::At(end),
        }
    }

    /// Open interval starting at `start`.
    #[must_use]
    pub const fn open(start: f64) -> Self {
        Self {
            start,
            end: IntervalEnd::Open,
        }
    }

    /// Interval start.
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// Interval end.
    #[must_use]
    pub const fn end(&self) -> IntervalEnd {
        self.end
    }

    /// End time, `None` for open intervals.
    #[must_use]
    pub const fn end_time(&self) -> Option<f64> {
        match self.end {
            IntervalEnd::At(end) => Some(end),
            IntervalEnd::Open => None,
        }
    }

    /// Check if the interval is open-ended.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.end, IntervalEnd::Open)
    }

    /// Point containment: `start <= t < end` when closed, `t > start` when open.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        match self.end {
            IntervalEnd::At(end) => self.start <= t && t < end,
            IntervalEnd::Open => t > self.start,
        }
    }
}

/// Merge true/false marks into maximal disjoint intervals.
///
/// Marks need not be sorted; duplicates are ignored. An empty result means
/// the predicate never holds.
#[must_use]
pub fn merge_marks(mut true_marks: Vec<f64>, mut false_marks: Vec<f64>) -> Vec<TimeInterval> {
    true_marks.sort_by(f64::total_cmp);
    true_marks.dedup();
    false_marks.sort_by(f64::total_cmp);
    false_marks.dedup();

    let Some(&first_true) = true_marks.first() else {
        return Vec::new();
    };

    if false_marks.is_empty() {
        return vec![TimeInterval::open(first_true)];
    }

    let mut intervals = Vec::new();
    let mut time_hook: Option<f64> = None;

    for &start in &true_marks {
        // already inside the previous interval
        if time_hook.is_some_and(|hook| start <= hook) {
            continue;
        }

        let next_false = false_marks.partition_point(|&f| f <= start);
        match false_marks.get(next_false) {
            Some(&end) => {
                intervals.push(TimeInterval::closed(start, end));
                time_hook = Some(end);
            }
            None => {
                // true after the last false-mark
                intervals.push(TimeInterval::open(start));
                break;
            }
        }
    }

    intervals
}

/// Validity windows of one predicate over one mnemonic.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    mnemonic: String,
    predicate: Predicate,
    intervals: Vec<TimeInterval>,
}

impl Condition {
    /// Derive the condition's intervals from a series.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedValue`] if a sample's value has the wrong
    /// kind for the predicate.
    pub fn new(series: &MnemonicSeries, predicate: Predicate) -> Result<Self> {
        let mut true_marks = Vec::new();
        let mut false_marks = Vec::new();

        for sample in series.samples() {
            let holds = predicate
                .evaluate(sample.value())
                .ok_or_else(|| Error::MalformedValue {
                    mnemonic: series.mnemonic().to_string(),
                    timestamp: sample.time(),
                    expected: predicate.expected_kind(),
                    found: sample.value().to_string(),
                })?;
            if holds {
                true_marks.push(sample.time());
            } else {
                false_marks.push(sample.time());
            }
        }

        let intervals = merge_marks(true_marks, false_marks);
        if intervals.is_empty() {
            tracing::info!(mnemonic = series.mnemonic(), ?predicate, "condition never holds");
        } else {
            tracing::debug!(
                mnemonic = series.mnemonic(),
                ?predicate,
                intervals = intervals.len(),
                "condition derived"
            );
        }

        Ok(Self {
            mnemonic: series.mnemonic().to_string(),
            predicate,
            intervals,
        })
    }

    /// Source mnemonic.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Predicate the intervals were derived from.
    #[must_use]
    pub const fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Sorted, disjoint intervals (empty when the predicate never holds).
    #[must_use]
    pub fn intervals(&self) -> &[TimeInterval] {
        &self.intervals
    }

    /// Check if the predicate never holds during the run.
    #[must_use]
    pub fn is_never(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Interval containing `t`, if any.
    #[must_use]
    pub fn interval_at(&self, t: f64) -> Option<&TimeInterval> {
        let idx = self.intervals.partition_point(|iv| iv.start <= t);
        idx.checked_sub(1)
            .map(|i| &self.intervals[i])
            .filter(|iv| iv.contains(t))
    }

    /// Check if the predicate holds at `t`.
    #[must_use]
    pub fn holds_at(&self, t: f64) -> bool {
        self.interval_at(t).is_some()
    }
}
