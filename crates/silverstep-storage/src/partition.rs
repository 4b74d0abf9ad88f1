//! Hive-style partition layout
//!
//! Rows are grouped by the value of the partition column and each group
//! is stored under `{column}={escaped value}/`.

use arrow::array::{Array, RecordBatch, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::error::ArrowError;
use arrow::util::display::array_value_to_string;
use std::collections::BTreeMap;

/// Directory value used for null partition keys.
pub const DEFAULT_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

/// Rows of one partition, with the directory they belong in
#[derive(Debug, Clone)]
pub struct PartitionSlice {
    /// Relative directory, e.g. `COUNTYFP=01001/`. Empty for unpartitioned tables.
    pub dir: String,
    pub batch: RecordBatch,
}

/// Group `batch` rows by the value of `column`.
///
/// Slices come back ordered by directory name. The caller checks that
/// `column` exists; a missing column surfaces as an `ArrowError`.
pub fn split_by_partition(
    batch: &RecordBatch,
    column: &str,
) -> Result<Vec<PartitionSlice>, ArrowError> {
    let values = batch
        .column_by_name(column)
        .ok_or_else(|| ArrowError::SchemaError(format!("partition column '{}' missing", column)))?;

    let mut groups: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let value = if values.is_null(row) {
            DEFAULT_PARTITION_VALUE.to_string()
        } else {
            escape_partition_value(&array_value_to_string(values, row)?)
        };
        let row = u32::try_from(row)
            .map_err(|_| ArrowError::ComputeError("batch exceeds u32 rows".to_string()))?;
        groups.entry(value).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(value, rows)| {
            let indices = UInt32Array::from(rows);
            Ok(PartitionSlice {
                dir: format!("{}={}/", column, value),
                batch: take_record_batch(batch, &indices)?,
            })
        })
        .collect()
}

/// Escape a partition value for use as a path segment.
///
/// ASCII alphanumerics and `-_.` are kept; every other byte becomes `%XX`.
/// Empty strings share the null directory. A value spelled exactly like
/// [`DEFAULT_PARTITION_VALUE`] has its leading `_` escaped so it gets a
/// directory of its own.
pub fn escape_partition_value(value: &str) -> String {
    if value.is_empty() {
        return DEFAULT_PARTITION_VALUE.to_string();
    }

    let literal_sentinel = value == DEFAULT_PARTITION_VALUE;
    let mut escaped = String::with_capacity(value.len() + 2);
    for (i, byte) in value.bytes().enumerate() {
        let reserved = literal_sentinel && i == 0;
        if !reserved && (byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')) {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}
