//! Statistics store: the persistence boundary of a trending run
//!
//! Two kinds of rows are written:
//! - continuous mnemonics: [`AggregateRecord`]s, unique per (table, start)
//! - per-position wheel data: [`PositionSample`]s, unique per (table, time)
//!
//! Writing a row that already exists is a successful no-op reported as
//! [`WriteOutcome::Duplicate`]. Implementations must make the existence
//! check and the insert one atomic step, so concurrent runs over
//! overlapping windows cannot produce duplicate rows.
//!
//! # Example
//!
//! ```rust
//! use telemetry_trending::stats::AggregateRecord;
//! use telemetry_trending::store::{MemoryStatsStore, StatsStore, WriteOutcome};
//!
//! # fn main() -> telemetry_trending::Result<()> {
//! let store = MemoryStatsStore::new();
//! let record = AggregateRecord::from_values(1.0, 2.0, &[3.0, 4.0]).unwrap();
//!
//! assert_eq!(store.insert_aggregate("SE_ZBUSVLT", record)?, WriteOutcome::Inserted);
//! assert_eq!(store.insert_aggregate("SE_ZBUSVLT", record)?, WriteOutcome::Duplicate);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::{MemoryStatsStore, StoredAggregate, StoredPosition};

use crate::correlate::PositionSample;
use crate::stats::AggregateRecord;
use crate::Result;

/// Result of a single idempotent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Row was new and has been stored
    Inserted,
    /// A row with the same key already existed; nothing changed
    Duplicate,
}

/// Statistics store trait.
///
/// Tables are created on first write. Table names follow the trending
/// conventions: the mnemonic for continuous data, `{mnemonic}_{label}` for
/// per-position data and `LAMP_{label}_{channel}` for lamp data.
pub trait StatsStore: Send + Sync {
    /// Insert an aggregate unless one with the same start exists.
    fn insert_aggregate(&self, table: &str, record: AggregateRecord) -> Result<WriteOutcome>;

    /// Insert a position sample unless one with the same time exists.
    fn insert_position_sample(&self, table: &str, sample: PositionSample) -> Result<WriteOutcome>;

    /// Insert several aggregates into one table.
    ///
    /// Returns outcomes in input order.
    fn batch_insert_aggregates(
        &self,
        table: &str,
        records: &[AggregateRecord],
    ) -> Result<Vec<WriteOutcome>> {
        records
            .iter()
            .map(|record| self.insert_aggregate(table, *record))
            .collect()
    }

    /// Insert several position samples into one table.
    fn batch_insert_position_samples(
        &self,
        table: &str,
        samples: &[PositionSample],
    ) -> Result<Vec<WriteOutcome>> {
        samples
            .iter()
            .map(|sample| self.insert_position_sample(table, *sample))
            .collect()
    }
}

/// Table for per-position wheel data.
#[must_use]
pub fn position_table(mnemonic: &str, label: &str) -> String {
    format!("{mnemonic}_{label}")
}

/// Table for one lamp channel.
#[must_use]
pub fn lamp_table(prefix: &str, label: &str, channel: &str) -> String {
    format!("{prefix}_{label}_{channel}")
}
