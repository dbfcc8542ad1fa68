//! Transition-to-label join (calibration lamps)
//!
//! ```text
//! flag      OFF  ON ............... OFF          ON ......... (run end)
//! selection      LINE1                           NO_LAMP  -> skipped
//! current        |  x  x  x  x  x |
//!                [start,        end)
//! ```

use std::collections::BTreeMap;

use super::latest_timestamp;
use crate::series::{MnemonicSeries, Sample};
use crate::stats::AggregateRecord;
use crate::Result;

/// Flag states delimiting an activation.
#[derive(Debug, Clone, Copy)]
pub struct TransitionStates<'a> {
    /// State that opens an activation window ("ON")
    pub on: &'a str,
    /// State that closes it ("OFF")
    pub off: &'a str,
}

/// Analog stream reduced per activation, with the name used in table keys.
#[derive(Debug, Clone, Copy)]
pub struct AnalogChannel<'a> {
    /// Short channel name ("CURR", "VOLT")
    pub name: &'a str,
    /// Source series
    pub series: &'a MnemonicSeries,
}

/// Statistics of one channel during one activation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAggregate {
    /// Channel name
    pub channel: String,
    /// Reduced samples
    pub record: AggregateRecord,
}

/// One activation attributed to a label.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationWindow {
    /// Time the flag switched on
    pub start: f64,
    /// Time the flag switched off, or the run end
    pub end: f64,
    /// Per-channel statistics (channels without samples are absent)
    pub channels: Vec<ChannelAggregate>,
}

/// Attribute analog channel statistics to the label active at each
/// off→on transition of `events`.
///
/// Events with no preceding label sample, or whose label is in `ignored`,
/// are skipped.
///
/// # Errors
///
/// Returns [`crate::Error::MalformedValue`] if an event or label sample is
/// not a label, or a channel sample inside a window is not numeric.
#[tracing::instrument(skip_all, fields(events = events.mnemonic(), labels = labels.mnemonic(), windows))]
pub fn correlate_transitions(
    events: &MnemonicSeries,
    states: TransitionStates<'_>,
    labels: &MnemonicSeries,
    channels: &[AnalogChannel<'_>],
    ignored: &[String],
) -> Result<BTreeMap<String, Vec<ActivationWindow>>> {
    let flags = events
        .samples()
        .iter()
        .map(|s| Ok((s.time(), events.label_of(s)?)))
        .collect::<Result<Vec<_>>>()?;

    let run_end = latest_timestamp(
        std::iter::once(events)
            .chain(std::iter::once(labels))
            .chain(channels.iter().map(|c| c.series)),
    );

    let mut buckets: BTreeMap<String, Vec<ActivationWindow>> = BTreeMap::new();
    let mut previous: Option<&str> = None;

    for (idx, &(start, state)) in flags.iter().enumerate() {
        let became_on = state == states.on && previous != Some(states.on);
        previous = Some(state);
        if !became_on {
            continue;
        }

        let Some(selection) = labels.latest_at_or_before(start) else {
            tracing::debug!(start, "activation before any label sample");
            continue;
        };
        let label = labels.label_of(selection)?;
        if ignored.iter().any(|i| i == label) {
            continue;
        }

        let off_time = flags[idx + 1..]
            .iter()
            .find(|&&(_, s)| s == states.off)
            .map(|&(t, _)| t);

        let mut window = ActivationWindow {
            start,
            end: off_time.or(run_end).unwrap_or(start),
            channels: Vec::with_capacity(channels.len()),
        };

        for channel in channels {
            let in_window: &[Sample] = match off_time {
                Some(end) => channel.series.range(start, end),
                None => channel.series.from_time(start),
            };
            let values = in_window
                .iter()
                .map(|s| channel.series.number_of(s))
                .collect::<Result<Vec<_>>>()?;

            match AggregateRecord::from_values(window.start, window.end, &values) {
                Some(record) => window.channels.push(ChannelAggregate {
                    channel: channel.name.to_string(),
                    record,
                }),
                None => tracing::debug!(label, channel = channel.name, start, "no channel samples in activation"),
            }
        }

        if !window.channels.is_empty() {
            buckets.entry(label.to_string()).or_default().push(window);
        }
    }

    tracing::Span::current().record("windows", buckets.values().map(Vec::len).sum::<usize>());
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Value;
    use crate::Error;

    const STATES: TransitionStates<'static> = TransitionStates { on: "ON", off: "OFF" };

    fn labels(name: &str, points: &[(f64, &str)]) -> MnemonicSeries {
        MnemonicSeries::new(
            name,
            points.iter().map(|&(t, v)| Sample::new(t, Value::label(v))).collect(),
        )
        .unwrap()
    }

    fn analog(name: &str, points: &[(f64, f64)]) -> MnemonicSeries {
        MnemonicSeries::new(name, points.iter().map(|&(t, v)| Sample::new(t, v)).collect()).unwrap()
    }

    fn ignored() -> Vec<String> {
        vec!["NO_LAMP".to_string(), "DUMMY".to_string()]
    }

    #[test]
    fn test_activation_attributed_to_selected_lamp() {
        let flag = labels("FLAG", &[(0.0, "OFF"), (10.0, "ON"), (20.0, "OFF")]);
        let sel = labels("SEL", &[(5.0, "LINE1")]);
        let curr = analog("CURR", &[(9.0, 100.0), (10.0, 1.0), (15.0, 3.0), (20.0, 100.0)]);
        let volt = analog("VOLT", &[(12.0, 5.0)]);

        let buckets = correlate_transitions(
            &flag,
            STATES,
            &sel,
            &[
                AnalogChannel { name: "CURR", series: &curr },
                AnalogChannel { name: "VOLT", series: &volt },
            ],
            &ignored(),
        )
        .unwrap();

        let windows = &buckets["LINE1"];
        assert_eq!(windows.len(), 1);
        assert!((windows[0].start - 10.0).abs() < f64::EPSILON);
        assert!((windows[0].end - 20.0).abs() < f64::EPSILON);

        let curr = &windows[0].channels[0];
        assert_eq!(curr.channel, "CURR");
        assert_eq!(curr.record.count(), 2);
        assert!((curr.record.mean() - 2.0).abs() < 1e-12);

        let volt = &windows[0].channels[1];
        assert_eq!(volt.record.count(), 1);
        assert!(volt.record.stdev().abs() < f64::EPSILON);
    }

    #[test]
    fn test_ignored_lamps_are_skipped() {
        let flag = labels("FLAG", &[(10.0, "ON"), (20.0, "OFF")]);
        let sel = labels("SEL", &[(5.0, "NO_LAMP")]);
        let curr = analog("CURR", &[(15.0, 3.0)]);

        let buckets = correlate_transitions(
            &flag,
            STATES,
            &sel,
            &[AnalogChannel { name: "CURR", series: &curr }],
            &ignored(),
        )
        .unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_unterminated_activation_runs_to_end() {
        let flag = labels("FLAG", &[(10.0, "ON")]);
        let sel = labels("SEL", &[(5.0, "LINE2")]);
        let curr = analog("CURR", &[(12.0, 2.0), (30.0, 4.0)]);

        let buckets = correlate_transitions(
            &flag,
            STATES,
            &sel,
            &[AnalogChannel { name: "CURR", series: &curr }],
            &ignored(),
        )
        .unwrap();

        let window = &buckets["LINE2"][0];
        assert!((window.end - 30.0).abs() < f64::EPSILON);
        assert_eq!(window.channels[0].record.count(), 2);
    }

    #[test]
    fn test_repeated_on_is_not_a_new_transition() {
        let flag = labels("FLAG", &[(10.0, "ON"), (12.0, "ON"), (20.0, "OFF"), (30.0, "ON"), (40.0, "OFF")]);
        let sel = labels("SEL", &[(5.0, "LINE1"), (25.0, "LINE3")]);
        let curr = analog("CURR", &[(11.0, 1.0), (13.0, 1.0), (35.0, 2.0)]);

        let buckets = correlate_transitions(
            &flag,
            STATES,
            &sel,
            &[AnalogChannel { name: "CURR", series: &curr }],
            &ignored(),
        )
        .unwrap();

        assert_eq!(buckets["LINE1"].len(), 1);
        assert_eq!(buckets["LINE1"][0].channels[0].record.count(), 2);
        assert_eq!(buckets["LINE3"].len(), 1);
    }

    #[test]
    fn test_activation_without_samples_is_dropped() {
        let flag = labels("FLAG", &[(10.0, "ON"), (20.0, "OFF")]);
        let sel = labels("SEL", &[(5.0, "LINE1")]);
        let curr = analog("CURR", &[(25.0, 1.0)]);

        let buckets = correlate_transitions(
            &flag,
            STATES,
            &sel,
            &[AnalogChannel { name: "CURR", series: &curr }],
            &ignored(),
        )
        .unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_numeric_flag_is_malformed() {
        let flag = analog("FLAG", &[(10.0, 1.0)]);
        let sel = labels("SEL", &[(5.0, "LINE1")]);

        let err = correlate_transitions(&flag, STATES, &sel, &[], &ignored()).unwrap_err();
        assert!(matches!(err, Error::MalformedValue { expected: "label", .. }));
    }
}
