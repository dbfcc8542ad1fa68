//! Ingestion adapter: columnar sample tables → [`SeriesSet`]
//!
//! The archive exporter delivers long-format tables, one row per sample:
//!
//! | column     | type                | meaning                         |
//! |------------|---------------------|---------------------------------|
//! | `mnemonic` | Utf8                | telemetry identifier            |
//! | `time`     | Float64             | fractional day number (MJD)     |
//! | `value`    | Utf8 or Float64     | engineering value or state name |
//!
//! Rows of different mnemonics may be interleaved and need not be time
//! ordered; each mnemonic's samples are stably sorted by time. Rows with a
//! null value are dropped.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::series::{MnemonicSeries, Sample, SeriesSet, Value};
use crate::{Error, Result};

/// Name of the identifier column
pub const MNEMONIC_COLUMN: &str = "mnemonic";

/// Name of the timestamp column
pub const TIME_COLUMN: &str = "time";

/// Name of the value column
pub const VALUE_COLUMN: &str = "value";

/// Batch of ingested telemetry rows
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    batches: Vec<RecordBatch>,
}

impl SampleTable {
    /// Wrap existing record batches
    #[must_use]
    pub fn from_batches(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Load a sample table from a Parquet file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::fs::File;

        let file = File::open(path.as_ref())?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::info!(
            path = %path.as_ref().display(),
            batches = batches.len(),
            rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            "sample table loaded"
        );

        Ok(Self { batches })
    }

    /// Record batches in load order
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Group rows by mnemonic into time-ordered series
    ///
    /// # Errors
    /// Returns [`Error::StorageError`] if a required column is missing or has
    /// the wrong type, or a mnemonic/time cell is null
    pub fn into_series_set(self) -> Result<SeriesSet> {
        let mut order: Vec<String> = Vec::new();
        let mut grouped: FxHashMap<String, Vec<Sample>> = FxHashMap::default();

        for batch in &self.batches {
            let mnemonics = string_column(batch, MNEMONIC_COLUMN)?;
            let times = float_column(batch, TIME_COLUMN)?;
            let values = ValueColumn::try_from_batch(batch)?;

            for row in 0..batch.num_rows() {
                if mnemonics.is_null(row) || times.is_null(row) {
                    return Err(Error::StorageError(format!(
                        "Null mnemonic or time in row {row}"
                    )));
                }
                let Some(value) = values.get(row) else {
                    continue;
                };

                let mnemonic = mnemonics.value(row);
                let samples = grouped.entry(mnemonic.to_string()).or_insert_with(|| {
                    order.push(mnemonic.to_string());
                    Vec::new()
                });
                samples.push(Sample::new(times.value(row), value));
            }
        }

        let mut set = SeriesSet::new();
        for mnemonic in order {
            let mut samples = grouped.remove(&mnemonic).unwrap_or_default();
            samples.sort_by(|a, b| a.time().total_cmp(&b.time()));
            tracing::debug!(mnemonic, samples = samples.len(), "series ingested");
            set.insert(MnemonicSeries::new(mnemonic, samples)?);
        }

        Ok(set)
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::StorageError(format!("Missing column '{name}'")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::StorageError(format!("Column '{name}' must be Utf8")))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::StorageError(format!("Column '{name}' must be Float64")))
}

/// Value column in either of its accepted encodings
enum ValueColumn<'a> {
    Raw(&'a StringArray),
    Numeric(&'a Float64Array),
}

impl<'a> ValueColumn<'a> {
    fn try_from_batch(batch: &'a RecordBatch) -> Result<Self> {
        let array = column(batch, VALUE_COLUMN)?;
        if let Some(raw) = array.as_any().downcast_ref::<StringArray>() {
            return Ok(Self::Raw(raw));
        }
        if let Some(numeric) = array.as_any().downcast_ref::<Float64Array>() {
            return Ok(Self::Numeric(numeric));
        }
        Err(Error::StorageError(format!(
            "Column '{VALUE_COLUMN}' must be Utf8 or Float64, got {:?}",
            array.data_type()
        )))
    }

    fn get(&self, row: usize) -> Option<Value> {
        match self {
            Self::Raw(a) => (!a.is_null(row)).then(|| Value::parse(a.value(row))),
            Self::Numeric(a) => (!a.is_null(row)).then(|| Value::from_reading(a.value(row))),
        }
    }
}

/// Build a long-format batch from `(mnemonic, time, raw value)` rows
///
/// # Errors
/// Returns [`Error::Arrow`] if the batch cannot be assembled
pub fn rows_to_batch(rows: &[(&str, f64, &str)]) -> Result<RecordBatch> {
    use arrow::datatypes::{DataType, Field, Schema};

    let schema = Arc::new(Schema::new(vec![
        Field::new(MNEMONIC_COLUMN, DataType::Utf8, false),
        Field::new(TIME_COLUMN, DataType::Float64, false),
        Field::new(VALUE_COLUMN, DataType::Utf8, true),
    ]));

    let mnemonics: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0)));
    let times: ArrayRef = Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.1)));
    let values: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.2)));

    Ok(RecordBatch::try_new(schema, vec![mnemonics, times, values])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn test_rows_grouped_and_sorted() {
        let batch = rows_to_batch(&[
            ("INRSH_LAMP_SEL", 2.0, "LINE1"),
            ("SE_ZBUSVLT", 3.0, "30.5"),
            ("INRSH_LAMP_SEL", 1.0, "NO_LAMP"),
            ("SE_ZBUSVLT", 1.0, "30.1"),
        ])
        .unwrap();

        let set = SampleTable::from_batches(vec![batch]).into_series_set().unwrap();
        assert_eq!(set.len(), 2);

        let lamp = set.get("INRSH_LAMP_SEL").unwrap();
        assert_eq!(lamp.first_timestamp(), Some(1.0));
        assert_eq!(lamp.samples()[0].value(), &Value::label("NO_LAMP"));

        let volt = set.get("SE_ZBUSVLT").unwrap();
        assert_eq!(volt.numbers().unwrap(), vec![30.1, 30.5]);
    }

    #[test]
    fn test_missing_column() {
        let schema = Arc::new(Schema::new(vec![Field::new("time", DataType::Float64, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Float64Array::from(vec![1.0])) as ArrayRef],
        )
        .unwrap();

        let err = SampleTable::from_batches(vec![batch]).into_series_set().unwrap_err();
        assert!(matches!(err, Error::StorageError(msg) if msg.contains("mnemonic")));
    }

    #[test]
    fn test_numeric_value_column_and_nulls() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(MNEMONIC_COLUMN, DataType::Utf8, false),
            Field::new(TIME_COLUMN, DataType::Float64, false),
            Field::new(VALUE_COLUMN, DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["A", "A", "A"])) as ArrayRef,
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
                Arc::new(Float64Array::from(vec![Some(1.5), None, Some(2.5)])),
            ],
        )
        .unwrap();

        let table = SampleTable::from_batches(vec![batch]);
        assert_eq!(table.num_rows(), 3);
        let set = table.into_series_set().unwrap();
        assert_eq!(set.get("A").unwrap().numbers().unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_non_finite_numeric_values_match_raw_encoding() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(MNEMONIC_COLUMN, DataType::Utf8, false),
            Field::new(TIME_COLUMN, DataType::Float64, false),
            Field::new(VALUE_COLUMN, DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["A", "A", "A"])) as ArrayRef,
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])),
                Arc::new(Float64Array::from(vec![f64::NAN, f64::INFINITY, 2.5])),
            ],
        )
        .unwrap();
        let numeric = SampleTable::from_batches(vec![batch]).into_series_set().unwrap();

        let raw_rows = [("A", 1.0, "NaN"), ("A", 2.0, "inf"), ("A", 3.0, "2.5")];
        let raw = SampleTable::from_batches(vec![rows_to_batch(&raw_rows).unwrap()])
            .into_series_set()
            .unwrap();

        let values = |set: &SeriesSet| -> Vec<Value> {
            set.get("A").unwrap().samples().iter().map(|s| s.value().clone()).collect()
        };
        assert_eq!(values(&numeric), values(&raw));
        assert_eq!(values(&numeric)[0], Value::label("NaN"));
        assert_eq!(values(&numeric)[2], Value::Number(2.5));
    }

    #[test]
    fn test_load_parquet() {
        use parquet::arrow::ArrowWriter;

        let batch = rows_to_batch(&[("IMIR_HK_FW_CUR_POS", 1.0, "F560W")]).unwrap();
        let path = std::env::temp_dir().join(format!(
            "telemetry-trending-ingest-{}.parquet",
            std::process::id()
        ));

        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = SampleTable::load_parquet(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(table.num_rows(), 1);
        let set = table.into_series_set().unwrap();
        assert_eq!(
            set.get("IMIR_HK_FW_CUR_POS").unwrap().samples()[0].value(),
            &Value::label("F560W")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = SampleTable::load_parquet("/nonexistent/telemetry.parquet").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
