//! Mnemonic series: ordered telemetry samples for one identifier
//!
//! A [`SeriesSet`] is the input of one trending run. It is built once from
//! the ingestion collaborator (see [`crate::ingest`]) and is read-only for
//! the rest of the run.
//!
//! ## Example
//!
//! ```rust
//! use telemetry_trending::series::{MnemonicSeries, Sample, Value};
//!
//! # fn main() -> telemetry_trending::Result<()> {
//! let series = MnemonicSeries::new(
//!     "INRSH_LAMP_SEL",
//!     vec![
//!         Sample::new(1.0, Value::label("NO_LAMP")),
//!         Sample::new(2.0, Value::label("LINE1")),
//!     ],
//! )?;
//!
//! let latest = series.latest_at_or_before(1.5).map(|s| s.value().to_string());
//! assert_eq!(latest.as_deref(), Some("NO_LAMP"));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Telemetry value: a decimal engineering value or an enumerated label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Engineering value
    Number(f64),
    /// Enumerated state ("ON", "SUCCESS", "F110W", ...)
    Label(String),
}

impl Value {
    /// Create a label value.
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Numeric reading from a typed source: non-finite readings become the
    /// same labels [`Value::parse`] gives their text.
    #[must_use]
    pub fn from_reading(reading: f64) -> Self {
        if reading.is_finite() {
            Self::Number(reading)
        } else {
            Self::Label(reading.to_string())
        }
    }

    /// Parse a raw ingested string: decimal if it parses to a finite
    /// number, label otherwise ("NAN" and "INF" stay labels).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map_or_else(|| Self::Label(trimmed.to_string()), Self::Number)
    }

    /// Numeric view, `None` for labels.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Label(_) => None,
        }
    }

    /// Label view, `None` for numbers.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Label(l) => Some(l),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(l) => f.write_str(l),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(l: &str) -> Self {
        Self::Label(l.to_string())
    }
}

/// One (timestamp, value) observation.
///
/// Timestamps are fractional day numbers (MJD); only their ordering matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    time: f64,
    value: Value,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(time: f64, value: impl Into<Value>) -> Self {
        Self {
            time,
            value: value.into(),
        }
    }

    /// Sample timestamp.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Sample value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

/// Ordered samples of one mnemonic.
#[derive(Debug, Clone, PartialEq)]
pub struct MnemonicSeries {
    mnemonic: String,
    samples: Vec<Sample>,
}

impl MnemonicSeries {
    /// Create a series, checking that timestamps are weakly increasing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnorderedSeries`] if a sample precedes its
    /// predecessor, or [`Error::InvalidInput`] for a NaN or infinite
    /// timestamp.
    pub fn new(mnemonic: impl Into<String>, samples: Vec<Sample>) -> Result<Self> {
        let mnemonic = mnemonic.into();

        if let Some(bad) = samples.iter().find(|s| !s.time.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "Non-finite timestamp {} in {mnemonic} (value {})",
                bad.time, bad.value
            )));
        }

        if let Some(pair) = samples.windows(2).find(|w| w[1].time < w[0].time) {
            return Err(Error::UnorderedSeries {
                mnemonic,
                previous: pair[0].time,
                next: pair[1].time,
            });
        }

        Ok(Self { mnemonic, samples })
    }

    /// Mnemonic identifier.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// All samples in time order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the series has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first sample.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<f64> {
        self.samples.first().map(Sample::time)
    }

    /// Timestamp of the last sample.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.last().map(Sample::time)
    }

    /// Latest sample with `time <= t`.
    ///
    /// With duplicate timestamps the last of them wins.
    #[must_use]
    pub fn latest_at_or_before(&self, t: f64) -> Option<&Sample> {
        let idx = self.samples.partition_point(|s| s.time <= t);
        idx.checked_sub(1).map(|i| &self.samples[i])
    }

    /// Samples with `start <= time < end`.
    #[must_use]
    pub fn range(&self, start: f64, end: f64) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.time < start);
        let hi = self.samples.partition_point(|s| s.time < end);
        &self.samples[lo..hi.max(lo)]
    }

    /// Samples with `time >= start`.
    #[must_use]
    pub fn from_time(&self, start: f64) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.time < start);
        &self.samples[lo..]
    }

    /// Numeric value of a sample, or [`Error::MalformedValue`].
    ///
    /// # Errors
    ///
    /// Fails if the sample holds a label.
    pub fn number_of(&self, sample: &Sample) -> Result<f64> {
        sample.value.as_number().ok_or_else(|| Error::MalformedValue {
            mnemonic: self.mnemonic.clone(),
            timestamp: sample.time,
            expected: "number",
            found: sample.value.to_string(),
        })
    }

    /// Label value of a sample, or [`Error::MalformedValue`].
    ///
    /// # Errors
    ///
    /// Fails if the sample holds a number.
    pub fn label_of<'s>(&self, sample: &'s Sample) -> Result<&'s str> {
        sample.value.as_label().ok_or_else(|| Error::MalformedValue {
            mnemonic: self.mnemonic.clone(),
            timestamp: sample.time,
            expected: "label",
            found: sample.value.to_string(),
        })
    }

    /// All values as numbers.
    ///
    /// # Errors
    ///
    /// Fails on the first label value.
    pub fn numbers(&self) -> Result<Vec<f64>> {
        self.samples.iter().map(|s| self.number_of(s)).collect()
    }
}

/// All series of one run, keyed by mnemonic.
#[derive(Debug, Clone, Default)]
pub struct SeriesSet {
    series: BTreeMap<String, MnemonicSeries>,
}

impl SeriesSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a series.
    pub fn insert(&mut self, series: MnemonicSeries) {
        self.series.insert(series.mnemonic.clone(), series);
    }

    /// Look up a series.
    #[must_use]
    pub fn get(&self, mnemonic: &str) -> Option<&MnemonicSeries> {
        self.series.get(mnemonic)
    }

    /// Look up a series that the run cannot do without.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMnemonic`] if absent.
    pub fn require(&self, mnemonic: &str) -> Result<&MnemonicSeries> {
        self.get(mnemonic)
            .ok_or_else(|| Error::MissingMnemonic(mnemonic.to_string()))
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Iterate over series in mnemonic order.
    pub fn iter(&self) -> impl Iterator<Item = &MnemonicSeries> {
        self.series.values()
    }
}

impl FromIterator<MnemonicSeries> for SeriesSet {
    fn from_iter<I: IntoIterator<Item = MnemonicSeries>>(iter: I) -> Self {
        let mut set = Self::new();
        for series in iter {
            set.insert(series);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(f64, &str)]) -> MnemonicSeries {
        MnemonicSeries::new(
            "TEST",
            points.iter().map(|&(t, v)| Sample::new(t, Value::parse(v))).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse("3.25"), Value::Number(3.25));
        assert_eq!(Value::parse(" ON "), Value::label("ON"));
        assert_eq!(Value::parse("F110W"), Value::label("F110W"));
        assert_eq!(Value::parse("INF"), Value::label("INF"));
    }

    #[test]
    fn test_series_metadata() {
        let s = series(&[(1.0, "1"), (2.0, "2"), (2.0, "3"), (4.0, "4")]);
        assert_eq!(s.len(), 4);
        assert_eq!(s.first_timestamp(), Some(1.0));
        assert_eq!(s.last_timestamp(), Some(4.0));
    }

    #[test]
    fn test_series_rejects_unordered() {
        let err = MnemonicSeries::new(
            "BAD",
            vec![Sample::new(2.0, 1.0), Sample::new(1.0, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnorderedSeries { .. }));
    }

    #[test]
    fn test_series_rejects_nan_time() {
        let err = MnemonicSeries::new("BAD", vec![Sample::new(f64::NAN, 1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_series_rejects_infinite_time() {
        for time in [f64::NEG_INFINITY, f64::INFINITY] {
            let err = MnemonicSeries::new("BAD", vec![Sample::new(time, "ON")]).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("Non-finite")));
        }
    }

    #[test]
    fn test_from_reading_agrees_with_parse() {
        assert_eq!(Value::from_reading(2.5), Value::Number(2.5));
        assert_eq!(Value::from_reading(f64::NAN), Value::parse("NaN"));
        assert_eq!(Value::from_reading(f64::NEG_INFINITY), Value::parse("-inf"));
    }

    #[test]
    fn test_latest_at_or_before() {
        let s = series(&[(1.0, "A"), (3.0, "B"), (3.0, "C"), (5.0, "D")]);
        assert!(s.latest_at_or_before(0.5).is_none());
        assert_eq!(s.latest_at_or_before(1.0).unwrap().value(), &Value::label("A"));
        assert_eq!(s.latest_at_or_before(3.0).unwrap().value(), &Value::label("C"));
        assert_eq!(s.latest_at_or_before(4.9).unwrap().value(), &Value::label("C"));
        assert_eq!(s.latest_at_or_before(9.0).unwrap().value(), &Value::label("D"));
    }

    #[test]
    fn test_range_is_half_open() {
        let s = series(&[(1.0, "1"), (2.0, "2"), (3.0, "3"), (4.0, "4")]);
        let times: Vec<f64> = s.range(2.0, 4.0).iter().map(Sample::time).collect();
        assert_eq!(times, vec![2.0, 3.0]);
        assert!(s.range(4.0, 2.0).is_empty());
        assert_eq!(s.from_time(3.0).len(), 2);
    }

    #[test]
    fn test_numbers_malformed() {
        let s = series(&[(1.0, "1.5"), (2.0, "OFF")]);
        let err = s.numbers().unwrap_err();
        assert!(matches!(err, Error::MalformedValue { expected: "number", .. }));
    }

    #[test]
    fn test_series_set_require() {
        let set: SeriesSet = vec![series(&[(1.0, "1")])].into_iter().collect();
        assert!(set.require("TEST").is_ok());
        assert!(matches!(set.require("NOPE"), Err(Error::MissingMnemonic(m)) if m == "NOPE"));
    }
}
