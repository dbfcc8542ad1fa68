//! Statistics reduction for the trending store
//!
//! A value list becomes one [`AggregateRecord`]:
//! - two or more values: mean and sample standard deviation (n - 1)
//! - one value: that value, deviation 0
//! - no values: no record

use serde::{Deserialize, Serialize};

/// Reduced statistics for one mnemonic over one time span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    start: f64,
    end: f64,
    count: usize,
    mean: f64,
    stdev: f64,
}

impl AggregateRecord {
    /// Reduce `values` observed between `start` and `end`.
    ///
    /// Returns `None` for an empty list; the caller reports "no data".
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(start: f64, end: f64, values: &[f64]) -> Option<Self> {
        let (mean, stdev) = match values {
            [] => return None,
            [single] => (*single, 0.0),
            _ => {
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
                (mean, (sum_sq / (n - 1.0)).sqrt())
            }
        };

        Some(Self {
            start,
            end,
            count: values.len(),
            mean,
            stdev,
        })
    }

    /// Start of the covered span (store key).
    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    /// End of the covered span.
    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    /// Number of values reduced.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation.
    #[must_use]
    pub const fn stdev(&self) -> f64 {
        self.stdev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        let record = AggregateRecord::from_values(1.0, 2.0, &[1.0]).unwrap();
        assert_eq!(record.count(), 1);
        assert!((record.mean() - 1.0).abs() < f64::EPSILON);
        assert!(record.stdev().abs() < f64::EPSILON);
        assert!((record.start() - 1.0).abs() < f64::EPSILON);
        assert!((record.end() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_yields_nothing() {
        assert!(AggregateRecord::from_values(1.0, 2.0, &[]).is_none());
    }

    #[test]
    fn test_sample_standard_deviation() {
        // mean 5, squared deviations sum to 32, n - 1 = 7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let record = AggregateRecord::from_values(0.0, 1.0, &values).unwrap();
        assert_eq!(record.count(), 8);
        assert!((record.mean() - 5.0).abs() < 1e-12);
        assert!((record.stdev() - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_two_values() {
        let record = AggregateRecord::from_values(0.0, 1.0, &[1.0, 3.0]).unwrap();
        assert!((record.mean() - 2.0).abs() < 1e-12);
        assert!((record.stdev() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_reduction_is_deterministic() {
        let values = [0.1, 0.7, 0.3, 1e-3, 42.0];
        assert_eq!(
            AggregateRecord::from_values(3.0, 4.0, &values),
            AggregateRecord::from_values(3.0, 4.0, &values)
        );
    }

    #[test]
    fn test_record_serialization() {
        let record = AggregateRecord::from_values(1.0, 2.0, &[1.0, 2.0]).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: AggregateRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.count(), 2);
        assert!((back.mean() - record.mean()).abs() < 1e-12);
        assert!((back.stdev() - record.stdev()).abs() < 1e-12);
    }
}
