//! Table writes under append or dynamic partition-overwrite semantics.
//!
//! Under dynamic partition overwrite, each partition present in the incoming
//! batch gets a new file and then loses every older file. Partitions absent
//! from the batch are never listed or touched.

use crate::catalog::read_marker;
use crate::encoding::encode_parquet;
use crate::error::{Result, StorageError};
use crate::partition::{split_by_partition, PartitionSlice};
use crate::warehouse::Warehouse;
use arrow::array::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use silverstep_config::WriteMode;
use uuid::Uuid;

/// Outcome of a table write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub table: String,
    pub rows_written: usize,
    /// Partition directories written, e.g. `COUNTYFP=01001`.
    pub partitions: Vec<String>,
    pub files_written: Vec<String>,
    pub files_removed: usize,
}

/// Persists a batch into an existing physical table
#[async_trait]
pub trait TableWriter: Send + Sync {
    async fn write(
        &self,
        batch: &RecordBatch,
        physical_name: &str,
        mode: WriteMode,
    ) -> Result<WriteSummary>;
}

#[async_trait]
impl TableWriter for Warehouse {
    async fn write(
        &self,
        batch: &RecordBatch,
        physical_name: &str,
        mode: WriteMode,
    ) -> Result<WriteSummary> {
        let metadata = read_marker(self, physical_name).await?.ok_or_else(|| {
            StorageError::write_failure(
                physical_name,
                "table does not exist; create it before writing",
            )
        })?;
        let root = self.table_root(physical_name)?;

        let slices = match metadata.partition_by.as_deref() {
            Some(column) => {
                if batch.schema().index_of(column).is_err() {
                    return Err(StorageError::write_failure(
                        physical_name,
                        format!("partition column '{}' missing from relation", column),
                    ));
                }
                split_by_partition(batch, column)
                    .map_err(|e| StorageError::write_failure(physical_name, e.to_string()))?
            }
            None if batch.num_rows() == 0 => Vec::new(),
            None => vec![PartitionSlice {
                dir: String::new(),
                batch: batch.clone(),
            }],
        };

        let file_name = format!(
            "part-{}-{}.parquet",
            Utc::now().timestamp_micros(),
            Uuid::new_v4().simple()
        );

        let mut summary = WriteSummary {
            table: physical_name.to_string(),
            ..WriteSummary::default()
        };

        for slice in slices {
            let dir = format!("{}{}", root, slice.dir);
            let path = format!("{}{}", dir, file_name);

            let bytes = encode_parquet(&slice.batch).map_err(|e| {
                StorageError::write_failure(
                    physical_name,
                    format!("failed to encode Parquet for '{}': {}", path, e),
                )
            })?;
            let bytes_written = bytes.len();

            self.operator().write(&path, bytes).await.map_err(|e| {
                StorageError::write_failure(
                    physical_name,
                    format!("failed to write '{}': {}", path, e),
                )
            })?;

            if mode == WriteMode::DynamicPartitionOverwrite {
                summary.files_removed += self.remove_stale(physical_name, &dir, &path).await?;
            }

            tracing::debug!(
                "Wrote {} rows to '{}' ({} bytes)",
                slice.batch.num_rows(),
                path,
                bytes_written
            );

            summary.rows_written += slice.batch.num_rows();
            summary
                .partitions
                .push(slice.dir.trim_end_matches('/').to_string());
            summary.files_written.push(path);
        }

        tracing::info!(
            table = physical_name,
            mode = %mode,
            rows = summary.rows_written,
            partitions = summary.partitions.len(),
            files_removed = summary.files_removed,
            "Write complete"
        );

        Ok(summary)
    }
}

impl Warehouse {
    /// Delete every Parquet file directly under `dir` except `keep`.
    async fn remove_stale(&self, physical_name: &str, dir: &str, keep: &str) -> Result<usize> {
        let existing = self.list_parquet(dir, false).await.map_err(|e| {
            StorageError::write_failure(
                physical_name,
                format!("failed to list '{}': {}", dir, e),
            )
        })?;

        let mut removed = 0;
        for stale in existing.iter().filter(|path| path.as_str() != keep) {
            self.operator().delete(stale).await.map_err(|e| {
                StorageError::write_failure(
                    physical_name,
                    format!("failed to remove '{}': {}", stale, e),
                )
            })?;
            removed += 1;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TableManager, WarehouseTableManager};
    use crate::reader::TableReader;
    use arrow::array::{Array, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use opendal::{services, Operator};
    use silverstep_config::{TableDefinition, TablesConfig};
    use std::sync::Arc;

    fn batch(rows: Vec<(&str, f64)>) -> RecordBatch {
        let (counties, values): (Vec<&str>, Vec<f64>) = rows.into_iter().unzip();
        let schema = Arc::new(Schema::new(vec![
            Field::new("COUNTYFP", DataType::Utf8, false),
            Field::new("ALWAYS", DataType::Float64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(counties)),
                Arc::new(Float64Array::from(values)),
            ],
        )
        .unwrap()
    }

    async fn setup(partition_by: Option<&str>) -> Warehouse {
        let op = Operator::new(services::Memory::default()).unwrap().finish();
        let warehouse = Warehouse::new(op, None);

        let mut tables = TablesConfig::default();
        tables.definitions.insert(
            "silver.t".to_string(),
            TableDefinition {
                partition_by: partition_by.map(str::to_string),
            },
        );
        WarehouseTableManager::new(warehouse.clone(), tables)
            .create("silver.t")
            .await
            .unwrap();
        warehouse
    }

    fn always_for(batch: &RecordBatch, county: &str) -> Vec<f64> {
        let counties = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let always = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        (0..batch.num_rows())
            .filter(|&i| counties.value(i) == county)
            .map(|i| always.value(i))
            .collect()
    }

    #[tokio::test]
    async fn write_requires_existing_table() {
        let op = Operator::new(services::Memory::default()).unwrap().finish();
        let warehouse = Warehouse::new(op, None);
        let err = warehouse
            .write(&batch(vec![("01001", 0.1)]), "silver.t", WriteMode::Append)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E003");
    }

    #[tokio::test]
    async fn missing_partition_column_is_write_failure() {
        let warehouse = setup(Some("REPORT_DATE")).await;
        let err = warehouse
            .write(
                &batch(vec![("01001", 0.1)]),
                "silver.t",
                WriteMode::DynamicPartitionOverwrite,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E003");
        assert!(err.to_string().contains("REPORT_DATE"));
    }

    #[tokio::test]
    async fn dynamic_overwrite_replaces_only_incoming_partitions() {
        let warehouse = setup(Some("COUNTYFP")).await;
        let mode = WriteMode::DynamicPartitionOverwrite;

        let first = warehouse
            .write(&batch(vec![("01001", 0.1), ("01003", 0.3)]), "silver.t", mode)
            .await
            .unwrap();
        assert_eq!(first.partitions, vec!["COUNTYFP=01001", "COUNTYFP=01003"]);
        assert_eq!(first.files_removed, 0);

        let untouched_dir = "silver/t/COUNTYFP=01003/";
        let before = warehouse.list_parquet(untouched_dir, false).await.unwrap();
        let before_bytes = warehouse.operator().read(&before[0]).await.unwrap().to_vec();

        let second = warehouse
            .write(&batch(vec![("01001", 0.9)]), "silver.t", mode)
            .await
            .unwrap();
        assert_eq!(second.partitions, vec!["COUNTYFP=01001"]);
        assert_eq!(second.files_removed, 1);

        let after = warehouse.list_parquet(untouched_dir, false).await.unwrap();
        assert_eq!(before, after);
        let after_bytes = warehouse.operator().read(&after[0]).await.unwrap().to_vec();
        assert_eq!(before_bytes, after_bytes);

        let table = warehouse.read("silver.t").await.unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(always_for(&table, "01001"), vec![0.9]);
        assert_eq!(always_for(&table, "01003"), vec![0.3]);
    }

    #[tokio::test]
    async fn append_keeps_existing_rows() {
        let warehouse = setup(Some("COUNTYFP")).await;

        for value in [0.1, 0.2] {
            warehouse
                .write(&batch(vec![("01001", value)]), "silver.t", WriteMode::Append)
                .await
                .unwrap();
        }

        let table = warehouse.read("silver.t").await.unwrap();
        let mut values = always_for(&table, "01001");
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn unpartitioned_dynamic_overwrite_replaces_table() {
        let warehouse = setup(None).await;
        let mode = WriteMode::DynamicPartitionOverwrite;

        warehouse
            .write(&batch(vec![("01001", 0.1), ("01003", 0.3)]), "silver.t", mode)
            .await
            .unwrap();
        let summary = warehouse
            .write(&batch(vec![("01005", 0.5)]), "silver.t", mode)
            .await
            .unwrap();
        assert_eq!(summary.partitions, vec![""]);
        assert_eq!(summary.files_removed, 1);

        let table = warehouse.read("silver.t").await.unwrap();
        assert_eq!(table.num_rows(), 1);

        // The table marker survives the overwrite.
        assert!(warehouse
            .path_exists("silver/t/_table.json")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let warehouse = setup(Some("COUNTYFP")).await;
        let mode = WriteMode::DynamicPartitionOverwrite;

        warehouse
            .write(&batch(vec![("01001", 0.1)]), "silver.t", mode)
            .await
            .unwrap();
        let summary = warehouse
            .write(&batch(vec![]), "silver.t", mode)
            .await
            .unwrap();
        assert_eq!(summary.rows_written, 0);
        assert!(summary.files_written.is_empty());

        assert_eq!(warehouse.read("silver.t").await.unwrap().num_rows(), 1);
    }
}
