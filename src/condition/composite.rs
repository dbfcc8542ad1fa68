//! Conjunction of conditions
//!
//! A composite borrows its own subconditions and nothing else, so two
//! composites built from different conditions can never see each other's
//! intervals.

use super::{Condition, IntervalEnd, TimeInterval};
use crate::{Error, Result};

/// AND of one or more [`Condition`]s.
#[derive(Debug, Clone)]
pub struct CompositeCondition<'a> {
    conditions: Vec<&'a Condition>,
}

impl<'a> CompositeCondition<'a> {
    /// Build a composite from its immediate subconditions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty list.
    pub fn new(conditions: Vec<&'a Condition>) -> Result<Self> {
        if conditions.is_empty() {
            return Err(Error::InvalidInput(
                "composite condition needs at least one subcondition".to_string(),
            ));
        }
        Ok(Self { conditions })
    }

    /// Subconditions in construction order.
    #[must_use]
    pub fn conditions(&self) -> &[&'a Condition] {
        &self.conditions
    }

    /// True iff every subcondition holds at `t`.
    #[must_use]
    pub fn holds_at(&self, t: f64) -> bool {
        self.conditions.iter().all(|c| c.holds_at(t))
    }

    /// Intersection of the subcondition intervals containing `t`.
    ///
    /// `None` when the composite does not hold at `t`.
    #[must_use]
    pub fn window_at(&self, t: f64) -> Option<TimeInterval> {
        let mut start = f64::NEG_INFINITY;
        let mut end = IntervalEnd::Open;

        for condition in &self.conditions {
            let interval = condition.interval_at(t)?;
            start = start.max(interval.start());
            end = match (end, interval.end()) {
                (IntervalEnd::At(a), IntervalEnd::At(b)) => IntervalEnd::At(a.min(b)),
                (IntervalEnd::At(a), IntervalEnd::Open) | (IntervalEnd::Open, IntervalEnd::At(a)) => {
                    IntervalEnd::At(a)
                }
                (IntervalEnd::Open, IntervalEnd::Open) => IntervalEnd::Open,
            };
        }

        Some(match end {
            IntervalEnd::At(e) => TimeInterval::closed(start, e),
            IntervalEnd::Open => TimeInterval::open(start),
        })
    }
}
