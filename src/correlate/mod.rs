//! Event correlation: attributing analog readbacks to named mechanism states
//!
//! Two joins are provided:
//!
//! - [`lamp`]: transition-to-label join. Each "flag became ON" event is
//!   attributed to the label (lamp) selected at that instant, and the
//!   analog channels sampled while the flag stays on are reduced to one
//!   [`AggregateRecord`](crate::stats::AggregateRecord) per channel.
//! - [`wheel`]: discrete-position join. Each "move completed" event pairs
//!   the latest position label with the latest ratio readback. A
//!   nominal-matching variant checks the readback against the expected
//!   value of the position instead.
//!
//! All lookups are "latest sample at or before t" over sorted series.

pub mod lamp;
pub mod wheel;

pub use lamp::{correlate_transitions, ActivationWindow, AnalogChannel, ChannelAggregate, TransitionStates};
pub use wheel::{correlate_nominal, correlate_positions, PositionBuckets};

use serde::{Deserialize, Serialize};

/// Ratio readback attributed to a mechanism position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Readback timestamp
    pub time: f64,
    /// Readback value
    pub value: f64,
}

/// Latest timestamp over several series (the run end as far as they know).
pub(crate) fn latest_timestamp<'a>(
    series: impl IntoIterator<Item = &'a crate::series::MnemonicSeries>,
) -> Option<f64> {
    series
        .into_iter()
        .filter_map(crate::series::MnemonicSeries::last_timestamp)
        .reduce(f64::max)
}
