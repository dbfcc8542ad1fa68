//! Discrete-position join (filter and grating wheels)

use std::collections::BTreeMap;

use super::PositionSample;
use crate::condition::CompositeCondition;
use crate::series::MnemonicSeries;
use crate::Result;

/// Ratio readbacks keyed by position label.
pub type PositionBuckets = BTreeMap<String, Vec<PositionSample>>;

/// First acceptance half-width around a nominal.
pub const INITIAL_TOLERANCE: f64 = 1.0;

/// Widening step of the acceptance half-width.
pub const TOLERANCE_STEP: f64 = 2.0;

/// Largest acceptance half-width tried.
pub const MAX_TOLERANCE: f64 = 10.0;

/// Pair every completion event with the latest position label and the
/// latest ratio readback at or before it.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedValue`] for non-label events/labels or
/// a non-numeric ratio.
#[tracing::instrument(skip_all, fields(ratio = ratios.mnemonic(), attributed))]
pub fn correlate_positions(
    events: &MnemonicSeries,
    completion_state: &str,
    labels: &MnemonicSeries,
    ratios: &MnemonicSeries,
    ignored: &[String],
) -> Result<PositionBuckets> {
    let mut buckets = PositionBuckets::new();
    let mut attributed = 0_usize;

    for event in events.samples() {
        if events.label_of(event)? != completion_state {
            continue;
        }
        let t = event.time();

        let Some(position) = labels.latest_at_or_before(t) else {
            tracing::debug!(t, "move completed before any position sample");
            continue;
        };
        let label = labels.label_of(position)?;
        if ignored.iter().any(|i| i == label) {
            continue;
        }

        let Some(ratio) = ratios.latest_at_or_before(t) else {
            tracing::debug!(t, label, "move completed before any ratio sample");
            continue;
        };
        let sample = PositionSample {
            time: ratio.time(),
            value: ratios.number_of(ratio)?,
        };

        tracing::trace!(label, time = sample.time, value = sample.value, "position attributed");
        buckets.entry(label.to_string()).or_default().push(sample);
        attributed += 1;
    }

    tracing::Span::current().record("attributed", attributed);
    Ok(buckets)
}

/// Attribute ratio readbacks to positions by matching them against each
/// position's nominal value.
///
/// For every position sample (while `validity` holds, when given), the
/// candidate readbacks are those from the position time up to the next
/// position sample or the end of the validity window, whichever is
/// earlier. The first candidate within the acceptance half-width is
/// kept; the half-width widens from [`INITIAL_TOLERANCE`] in steps of
/// [`TOLERANCE_STEP`] up to [`MAX_TOLERANCE`]. Positions with no matching
/// readback are discarded.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedValue`] for a non-label position or a
/// non-numeric candidate readback.
#[tracing::instrument(skip_all, fields(ratio = ratios.mnemonic(), attributed, discarded))]
pub fn correlate_nominal(
    labels: &MnemonicSeries,
    ratios: &MnemonicSeries,
    validity: Option<&CompositeCondition<'_>>,
    nominals: &BTreeMap<String, f64>,
    ignored: &[String],
) -> Result<PositionBuckets> {
    let mut buckets = PositionBuckets::new();
    let mut attributed = 0_usize;
    let mut discarded = 0_usize;
    let positions = labels.samples();

    for (idx, position) in positions.iter().enumerate() {
        let label = labels.label_of(position)?;
        if ignored.iter().any(|i| i == label) {
            tracing::warn!(mnemonic = labels.mnemonic(), label, time = position.time(), "position not usable");
            continue;
        }
        let Some(&nominal) = nominals.get(label) else {
            tracing::warn!(mnemonic = labels.mnemonic(), label, "no nominal for position");
            continue;
        };

        let start = position.time();
        let mut end = positions.get(idx + 1).map(|next| next.time());
        if let Some(validity) = validity {
            let Some(window) = validity.window_at(start) else {
                continue;
            };
            end = match (end, window.end_time()) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        let candidates = match end {
            Some(end) => ratios.range(start, end),
            None => ratios.from_time(start),
        }
        .iter()
        .map(|s| Ok((s.time(), ratios.number_of(s)?)))
        .collect::<Result<Vec<_>>>()?;

        match match_nominal(&candidates, nominal) {
            Some((time, value)) => {
                buckets
                    .entry(label.to_string())
                    .or_default()
                    .push(PositionSample { time, value });
                attributed += 1;
            }
            None => {
                tracing::warn!(
                    mnemonic = ratios.mnemonic(),
                    label,
                    nominal,
                    candidates = candidates.len(),
                    "no readback within tolerance, discarded"
                );
                discarded += 1;
            }
        }
    }

    let span = tracing::Span::current();
    span.record("attributed", attributed);
    span.record("discarded", discarded);
    Ok(buckets)
}

/// First candidate within the smallest acceptance half-width that has one.
fn match_nominal(candidates: &[(f64, f64)], nominal: f64) -> Option<(f64, f64)> {
    let mut tolerance = INITIAL_TOLERANCE;
    while tolerance <= MAX_TOLERANCE {
        if let Some(&hit) = candidates
            .iter()
            .find(|&&(_, value)| (value - nominal).abs() < tolerance)
        {
            return Some(hit);
        }
        tolerance += TOLERANCE_STEP;
    }
    None
}
