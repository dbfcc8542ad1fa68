//! # telemetry-trending: condition and correlation engine for instrument trending
//!
//! **Version**: 0.1.0
//!
//! Turns batches of engineering telemetry (time-ordered samples per
//! mnemonic) into long-term trending records:
//!
//! - **Conditions**: a predicate over one mnemonic becomes a set of
//!   half-open validity intervals ([`condition::Condition`]); conditions
//!   combine by conjunction ([`condition::CompositeCondition`]).
//! - **Extraction**: target samples falling inside the validity windows
//!   ([`extract::extract`]) are reduced to count, mean and sample standard
//!   deviation ([`stats::AggregateRecord`]).
//! - **Correlation**: lamp activations and mechanism moves attribute analog
//!   readbacks to named states ([`correlate`]).
//! - **Persistence**: idempotent writes keyed by table and timestamp
//!   ([`store::StatsStore`]).
//!
//! A [`run::TrendingRun`] drives all of it from a [`config::TrendingConfig`].
//!
//! ## Example Usage
//!
//! ```rust
//! use telemetry_trending::condition::{CompositeCondition, Condition, Predicate};
//! use telemetry_trending::extract::extract;
//! use telemetry_trending::series::{MnemonicSeries, Sample};
//! use telemetry_trending::stats::AggregateRecord;
//!
//! # fn main() -> telemetry_trending::Result<()> {
//! let loop_state = MnemonicSeries::new(
//!     "IMIR_HK_POM_LOOP",
//!     vec![Sample::new(0.0, "OFF"), Sample::new(10.0, "ON")],
//! )?;
//! let temperature = MnemonicSeries::new(
//!     "IGDP_MIR_ICE_INTER_TEMP",
//!     vec![Sample::new(2.0, 7.1), Sample::new(4.0, 7.3), Sample::new(12.0, 9.0)],
//! )?;
//!
//! let idle = Condition::new(&loop_state, Predicate::EqualsLabel("OFF".into()))?;
//! let composite = CompositeCondition::new(vec![&idle])?;
//!
//! let values = extract(&composite, &temperature)?.values();
//! let record = AggregateRecord::from_values(2.0, 12.0, &values).unwrap();
//! assert_eq!(record.count(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod condition;
pub mod config;
pub mod correlate;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod run;
pub mod series;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
