//! Data extraction: target samples inside a composite's validity windows

use serde::{Deserialize, Serialize};

use crate::condition::CompositeCondition;
use crate::series::MnemonicSeries;
use crate::Result;

/// Numeric sample that passed a composite condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPoint {
    /// Sample timestamp
    pub time: f64,
    /// Engineering value
    pub value: f64,
}

/// Result of filtering one target series.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// At least one sample fell inside the windows (time order preserved)
    Matched(Vec<ExtractedPoint>),
    /// No sample of the target fell inside the windows
    NoData,
}

impl Extraction {
    /// Matched values, empty for [`Extraction::NoData`].
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::Matched(points) => points.iter().map(|p| p.value).collect(),
            Self::NoData => Vec::new(),
        }
    }

    /// Matched points, `None` for [`Extraction::NoData`].
    #[must_use]
    pub fn points(&self) -> Option<&[ExtractedPoint]> {
        match self {
            Self::Matched(points) => Some(points),
            Self::NoData => None,
        }
    }

    /// Check if nothing matched.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Filter `target` down to the samples where `condition` holds.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedValue`] if a matching sample is not
/// numeric.
pub fn extract(condition: &CompositeCondition<'_>, target: &MnemonicSeries) -> Result<Extraction> {
    let mut points = Vec::new();

    for sample in target.samples() {
        if condition.holds_at(sample.time()) {
            points.push(ExtractedPoint {
                time: sample.time(),
                value: target.number_of(sample)?,
            });
        }
    }

    if points.is_empty() {
        tracing::info!(mnemonic = target.mnemonic(), "no data inside condition windows");
        Ok(Extraction::NoData)
    } else {
        tracing::debug!(
            mnemonic = target.mnemonic(),
            matched = points.len(),
            total = target.len(),
            "extracted"
        );
        Ok(Extraction::Matched(points))
    }
}
