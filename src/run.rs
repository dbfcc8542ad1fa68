//! One trending run: a configuration applied to one ingested batch
//!
//! Phases run in a fixed order: condition groups, unconditioned
//! mnemonics, lamp correlations, completion-event wheels, then
//! nominal-matching wheels. A mnemonic absent from the batch is warned
//! about and whatever depends on it is skipped; a malformed value aborts
//! the run.
//!
//! ```rust
//! use telemetry_trending::config::presets;
//! use telemetry_trending::run::TrendingRun;
//! use telemetry_trending::series::{MnemonicSeries, Sample, SeriesSet};
//! use telemetry_trending::store::MemoryStatsStore;
//!
//! # fn main() -> telemetry_trending::Result<()> {
//! let config = presets::nirspec_fifteen_minute()?;
//! let batch: SeriesSet = [MnemonicSeries::new(
//!     "GP_ZPSVOLT",
//!     vec![Sample::new(1.0, 30.1), Sample::new(1.01, 30.3)],
//! )?]
//! .into_iter()
//! .collect();
//!
//! let store = MemoryStatsStore::new();
//! let report = TrendingRun::new(&config, &batch).execute(&store)?;
//! assert_eq!(report.inserted, 1);
//! assert!(!report.missing_mnemonics.is_empty());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::condition::{CompositeCondition, Condition};
use crate::config::{ConditionGroup, ConditionSpec, LampSpec, NominalWheelSpec, TrendingConfig, WheelSpec};
use crate::correlate::{
    correlate_nominal, correlate_positions, correlate_transitions, AnalogChannel, PositionBuckets,
    TransitionStates,
};
use crate::extract::{extract, Extraction};
use crate::series::{MnemonicSeries, SeriesSet};
use crate::stats::AggregateRecord;
use crate::store::{lamp_table, position_table, StatsStore, WriteOutcome};
use crate::{Error, Result};

/// Outcome counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Rows written
    pub inserted: usize,
    /// Rows already present in the store
    pub duplicates: usize,
    /// Mnemonics the configuration needed but the batch lacked (sorted, unique)
    pub missing_mnemonics: Vec<String>,
    /// Mnemonics or correlations that produced nothing to store
    pub no_data: Vec<String>,
}

impl RunReport {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Inserted => self.inserted += 1,
            WriteOutcome::Duplicate => self.duplicates += 1,
        }
    }

    /// Fail if any configured mnemonic was absent from the batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMnemonic`] listing every absent mnemonic.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.missing_mnemonics.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingMnemonic(self.missing_mnemonics.join(", ")))
        }
    }

    fn missing(&mut self, mnemonic: &str) {
        if let Err(pos) = self.missing_mnemonics.binary_search_by(|m| m.as_str().cmp(mnemonic)) {
            self.missing_mnemonics.insert(pos, mnemonic.to_string());
        }
    }
}

/// A configuration bound to one batch of series.
#[derive(Debug, Clone, Copy)]
pub struct TrendingRun<'a> {
    config: &'a TrendingConfig,
    series: &'a SeriesSet,
}

impl<'a> TrendingRun<'a> {
    /// Bind a configuration to a batch.
    #[must_use]
    pub const fn new(config: &'a TrendingConfig, series: &'a SeriesSet) -> Self {
        Self { config, series }
    }

    /// Evaluate every phase and write the results to `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedValue`] if a sample has the wrong kind for
    /// the predicate or reduction applied to it, or any error the store
    /// reports.
    #[tracing::instrument(
        skip_all,
        fields(cadence = %self.config.cadence, series = self.series.len(), inserted, duplicates)
    )]
    pub fn execute<S: StatsStore + ?Sized>(&self, store: &S) -> Result<RunReport> {
        let mut report = RunReport::default();

        for group in &self.config.groups {
            self.run_group(group, store, &mut report)?;
        }
        for mnemonic in &self.config.unconditioned {
            self.run_unconditioned(mnemonic, store, &mut report)?;
        }
        for lamp in &self.config.lamps {
            self.run_lamp(lamp, store, &mut report)?;
        }
        for wheel in &self.config.wheels {
            self.run_wheel(wheel, store, &mut report)?;
        }
        for wheel in &self.config.nominal_wheels {
            self.run_nominal_wheel(wheel, store, &mut report)?;
        }

        let span = tracing::Span::current();
        span.record("inserted", report.inserted);
        span.record("duplicates", report.duplicates);
        tracing::info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            missing = report.missing_mnemonics.len(),
            no_data = report.no_data.len(),
            "trending run finished"
        );

        Ok(report)
    }

    fn lookup(&self, mnemonic: &str, report: &mut RunReport) -> Option<&'a MnemonicSeries> {
        match self.series.require(mnemonic) {
            Ok(series) => Some(series),
            Err(err) => {
                tracing::warn!(%err, "skipping");
                report.missing(mnemonic);
                None
            }
        }
    }

    fn conditions(&self, specs: &[ConditionSpec], report: &mut RunReport) -> Result<Option<Vec<Condition>>> {
        let found: Vec<_> = specs
            .iter()
            .map(|spec| self.lookup(&spec.mnemonic, report).map(|series| (series, spec)))
            .collect();
        let Some(found) = found.into_iter().collect::<Option<Vec<_>>>() else {
            return Ok(None);
        };
        found
            .into_iter()
            .map(|(series, spec)| Condition::new(series, spec.predicate.clone()))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    #[tracing::instrument(skip_all, fields(group = %group.name))]
    fn run_group<S: StatsStore + ?Sized>(
        &self,
        group: &ConditionGroup,
        store: &S,
        report: &mut RunReport,
    ) -> Result<()> {
        let Some(conditions) = self.conditions(&group.conditions, report)? else {
            return Ok(());
        };
        let composite = CompositeCondition::new(conditions.iter().collect())?;

        for target in &group.targets {
            let Some(series) = self.lookup(target, report) else {
                continue;
            };
            let values = match extract(&composite, series)? {
                Extraction::Matched(points) => points.iter().map(|p| p.value).collect::<Vec<_>>(),
                Extraction::NoData => {
                    report.no_data.push(target.clone());
                    continue;
                }
            };
            store_continuous(group.table_for(target), series, &values, store, report)?;
        }
        Ok(())
    }

    fn run_unconditioned<S: StatsStore + ?Sized>(
        &self,
        mnemonic: &str,
        store: &S,
        report: &mut RunReport,
    ) -> Result<()> {
        let Some(series) = self.lookup(mnemonic, report) else {
            return Ok(());
        };
        let values = series.numbers()?;
        if values.is_empty() {
            tracing::info!(mnemonic, "no samples in batch");
            report.no_data.push(mnemonic.to_string());
            return Ok(());
        }
        store_continuous(mnemonic, series, &values, store, report)
    }

    #[tracing::instrument(skip_all, fields(event = %lamp.event))]
    fn run_lamp<S: StatsStore + ?Sized>(&self, lamp: &LampSpec, store: &S, report: &mut RunReport) -> Result<()> {
        let (Some(events), Some(labels)) = (self.lookup(&lamp.event, report), self.lookup(&lamp.label, report))
        else {
            return Ok(());
        };
        let channels: Vec<AnalogChannel<'_>> = lamp
            .channels
            .iter()
            .filter_map(|c| {
                self.lookup(&c.mnemonic, report).map(|series| AnalogChannel {
                    name: &c.name,
                    series,
                })
            })
            .collect();
        if channels.is_empty() {
            return Ok(());
        }

        let states = TransitionStates {
            on: &lamp.on_state,
            off: &lamp.off_state,
        };
        let activations = correlate_transitions(events, states, labels, &channels, &lamp.ignored_labels)?;
        if activations.is_empty() {
            tracing::info!(event = %lamp.event, "no lamp activations in batch");
            report.no_data.push(lamp.event.clone());
        }

        for (label, windows) in &activations {
            for channel in windows.iter().flat_map(|w| &w.channels) {
                let table = lamp_table(&lamp.table_prefix, label, &channel.channel);
                report.record(store.insert_aggregate(&table, channel.record)?);
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(ratio = %wheel.ratio))]
    fn run_wheel<S: StatsStore + ?Sized>(&self, wheel: &WheelSpec, store: &S, report: &mut RunReport) -> Result<()> {
        let (Some(events), Some(labels), Some(ratios)) = (
            self.lookup(&wheel.event, report),
            self.lookup(&wheel.label, report),
            self.lookup(&wheel.ratio, report),
        ) else {
            return Ok(());
        };

        let buckets = correlate_positions(events, &wheel.completion_state, labels, ratios, &wheel.ignored_labels)?;
        store_positions(&wheel.ratio, &buckets, store, report)
    }

    #[tracing::instrument(skip_all, fields(ratio = %wheel.ratio))]
    fn run_nominal_wheel<S: StatsStore + ?Sized>(
        &self,
        wheel: &NominalWheelSpec,
        store: &S,
        report: &mut RunReport,
    ) -> Result<()> {
        let (Some(labels), Some(ratios)) = (self.lookup(&wheel.label, report), self.lookup(&wheel.ratio, report))
        else {
            return Ok(());
        };
        let Some(conditions) = self.conditions(&wheel.validity, report)? else {
            return Ok(());
        };

        let validity = if conditions.is_empty() {
            None
        } else {
            Some(CompositeCondition::new(conditions.iter().collect())?)
        };
        let buckets = correlate_nominal(
            labels,
            ratios,
            validity.as_ref(),
            &wheel.nominals,
            &wheel.ignored_labels,
        )?;
        store_positions(&wheel.ratio, &buckets, store, report)
    }
}

/// Reduce `values` of `series` into one record in `table`, keyed by the
/// series' first timestamp.
fn store_continuous<S: StatsStore + ?Sized>(
    table: &str,
    series: &MnemonicSeries,
    values: &[f64],
    store: &S,
    report: &mut RunReport,
) -> Result<()> {
    let (Some(start), Some(end)) = (series.first_timestamp(), series.last_timestamp()) else {
        return Ok(());
    };
    let Some(record) = AggregateRecord::from_values(start, end, values) else {
        return Ok(());
    };
    tracing::debug!(
        mnemonic = series.mnemonic(),
        table,
        count = record.count(),
        mean = record.mean(),
        "aggregate reduced"
    );
    report.record(store.insert_aggregate(table, record)?);
    Ok(())
}

fn store_positions<S: StatsStore + ?Sized>(
    ratio: &str,
    buckets: &PositionBuckets,
    store: &S,
    report: &mut RunReport,
) -> Result<()> {
    if buckets.is_empty() {
        tracing::info!(ratio, "no positions attributed in batch");
        report.no_data.push(ratio.to_string());
    }
    for (label, samples) in buckets {
        for outcome in store.batch_insert_position_samples(&position_table(ratio, label), samples)? {
            report.record(outcome);
        }
    }
    Ok(())
}
