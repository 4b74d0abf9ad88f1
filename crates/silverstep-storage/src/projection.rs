//! Fixed, ordered column projection applied before writing.

use crate::error::{Result, StorageError};
use arrow::array::RecordBatch;

/// Select `columns` from `batch`, in the given order.
///
/// Columns not named are dropped. A named column the batch lacks is a
/// `SchemaMismatch`.
pub fn project(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();

    let indices = columns
        .iter()
        .map(|column| {
            schema.index_of(column).map_err(|_| {
                StorageError::schema_mismatch(
                    *column,
                    schema.fields().iter().map(|f| f.name().as_str()),
                )
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    batch
        .project(&indices)
        .map_err(|_| {
            StorageError::schema_mismatch(
                columns.join(", "),
                schema.fields().iter().map(|f| f.name().as_str()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("EXTRA", DataType::Utf8, false),
            Field::new("NEVER", DataType::Float64, false),
            Field::new("COUNTYFP", DataType::Utf8, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["x"])),
                Arc::new(Float64Array::from(vec![0.1])),
                Arc::new(StringArray::from(vec!["01001"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reorders_and_drops_extra_columns() {
        let projected = project(&batch(), &["COUNTYFP", "NEVER"]).unwrap();
        let names: Vec<&str> = projected
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["COUNTYFP", "NEVER"]);
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let err = project(&batch(), &["COUNTYFP", "ALWAYS"]).unwrap_err();
        match err {
            StorageError::SchemaMismatch { column, available, .. } => {
                assert_eq!(column, "ALWAYS");
                assert_eq!(available, "EXTRA, NEVER, COUNTYFP");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
