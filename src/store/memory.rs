//! In-memory statistics store using `DashMap`.
//!
//! Data is lost on process restart; it backs tests, demos and single-process
//! deployments that export a snapshot at the end of a run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{StatsStore, WriteOutcome};
use crate::correlate::PositionSample;
use crate::stats::AggregateRecord;
use crate::Result;

/// Stored aggregate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAggregate {
    /// The reduced statistics
    pub record: AggregateRecord,
    /// When the row was written
    pub performed_at: DateTime<Utc>,
}

/// Stored per-position row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPosition {
    /// The attributed readback
    pub sample: PositionSample,
    /// When the row was written
    pub performed_at: DateTime<Utc>,
}

/// Row key: table name plus the bit pattern of the key timestamp.
type RowKey = (String, u64);

fn row_key(table: &str, time: f64) -> RowKey {
    // -0.0 and 0.0 are the same instant
    let time = if time == 0.0 { 0.0 } else { time };
    (table.to_string(), time.to_bits())
}

/// In-memory statistics store.
///
/// Thread-safe: the check-then-insert of every write happens under the
/// shard lock of `DashMap`'s entry API.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    aggregates: DashMap<RowKey, StoredAggregate>,
    positions: DashMap<RowKey, StoredPosition>,
}

impl MemoryStatsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aggregates.len() + self.positions.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty() && self.positions.is_empty()
    }

    /// Remove all rows.
    pub fn clear(&self) {
        self.aggregates.clear();
        self.positions.clear();
    }

    /// Names of all tables holding at least one row, sorted.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self
            .aggregates
            .iter()
            .map(|e| e.key().0.clone())
            .chain(self.positions.iter().map(|e| e.key().0.clone()))
            .collect();
        tables.sort();
        tables.dedup();
        tables
    }

    /// Aggregate rows of a table, ordered by start.
    #[must_use]
    pub fn aggregates(&self, table: &str) -> Vec<StoredAggregate> {
        let mut rows: Vec<StoredAggregate> = self
            .aggregates
            .iter()
            .filter(|e| e.key().0 == table)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| a.record.start().total_cmp(&b.record.start()));
        rows
    }

    /// Position rows of a table, ordered by time.
    #[must_use]
    pub fn position_samples(&self, table: &str) -> Vec<StoredPosition> {
        let mut rows: Vec<StoredPosition> = self
            .positions
            .iter()
            .filter(|e| e.key().0 == table)
            .map(|e| e.value().clone())
            .collect();
        rows.sort_by(|a, b| a.sample.time.total_cmp(&b.sample.time));
        rows
    }

    /// Serialize every table to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn snapshot_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Snapshot {
            aggregates: BTreeMap<String, Vec<StoredAggregate>>,
            positions: BTreeMap<String, Vec<StoredPosition>>,
        }

        let mut snapshot = Snapshot {
            aggregates: BTreeMap::new(),
            positions: BTreeMap::new(),
        };
        for table in self.tables() {
            let aggregates = self.aggregates(&table);
            if !aggregates.is_empty() {
                snapshot.aggregates.insert(table.clone(), aggregates);
            }
            let positions = self.position_samples(&table);
            if !positions.is_empty() {
                snapshot.positions.insert(table, positions);
            }
        }

        Ok(serde_json::to_string_pretty(&snapshot)?)
    }
}

impl StatsStore for MemoryStatsStore {
    fn insert_aggregate(&self, table: &str, record: AggregateRecord) -> Result<WriteOutcome> {
        match self.aggregates.entry(row_key(table, record.start())) {
            Entry::Occupied(_) => {
                tracing::debug!(table, start = record.start(), "aggregate already stored");
                Ok(WriteOutcome::Duplicate)
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredAggregate {
                    record,
                    performed_at: Utc::now(),
                });
                Ok(WriteOutcome::Inserted)
            }
        }
    }

    fn insert_position_sample(&self, table: &str, sample: PositionSample) -> Result<WriteOutcome> {
        match self.positions.entry(row_key(table, sample.time)) {
            Entry::Occupied(_) => {
                tracing::debug!(table, time = sample.time, "position sample already stored");
                Ok(WriteOutcome::Duplicate)
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredPosition {
                    sample,
                    performed_at: Utc::now(),
                });
                Ok(WriteOutcome::Inserted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_default() {
        let store = MemoryStatsStore::default();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.tables().is_empty());
    }

    #[test]
    fn test_aggregates_sorted_by_start() {
        let store = MemoryStatsStore::new();
        for start in [3.0, 1.0, 2.0] {
            let record = AggregateRecord::from_values(start, start, &[start]).unwrap();
            store.insert_aggregate("T", record).unwrap();
        }

        let starts: Vec<f64> = store.aggregates("T").iter().map(|r| r.record.start()).collect();
        assert_eq!(starts, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_negative_zero_is_same_key() {
        let store = MemoryStatsStore::new();
        let a = AggregateRecord::from_values(0.0, 1.0, &[1.0]).unwrap();
        let b = AggregateRecord::from_values(-0.0, 1.0, &[1.0]).unwrap();
        assert_eq!(store.insert_aggregate("T", a).unwrap(), WriteOutcome::Inserted);
        assert_eq!(store.insert_aggregate("T", b).unwrap(), WriteOutcome::Duplicate);
    }

    #[test]
    fn test_clear() {
        let store = MemoryStatsStore::new();
        store
            .insert_position_sample("P", PositionSample { time: 1.0, value: 1.0 })
            .unwrap();
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_json() {
        let store = MemoryStatsStore::new();
        store
            .insert_aggregate("SE_ZBUSVLT", AggregateRecord::from_values(1.0, 2.0, &[30.0]).unwrap())
            .unwrap();
        store
            .insert_position_sample("FW_F560W", PositionSample { time: 1.5, value: 218.0 })
            .unwrap();

        let json = store.snapshot_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["aggregates"]["SE_ZBUSVLT"][0]["record"]["count"], 1);
        assert_eq!(parsed["positions"]["FW_F560W"][0]["sample"]["value"], 218.0);
    }
}
