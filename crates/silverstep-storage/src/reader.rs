//! Table reads: every Parquet file under the table root, concatenated.

use crate::catalog::read_marker;
use crate::encoding::decode_parquet;
use crate::error::{Result, StorageError};
use crate::warehouse::Warehouse;
use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use async_trait::async_trait;

/// Loads a physical table into memory
#[async_trait]
pub trait TableReader: Send + Sync {
    async fn read(&self, physical_name: &str) -> Result<RecordBatch>;
}

#[async_trait]
impl TableReader for Warehouse {
    async fn read(&self, physical_name: &str) -> Result<RecordBatch> {
        let root = self
            .table_root(physical_name)
            .map_err(|e| StorageError::source_not_found(physical_name, e.to_string()))?;

        let files = self
            .list_parquet(&root, true)
            .await
            .map_err(|e| StorageError::table_operation(physical_name, e.to_string()))?;

        if files.is_empty() {
            let reason = match read_marker(self, physical_name).await? {
                Some(_) => "table has no data files",
                None => "table does not exist",
            };
            return Err(StorageError::source_not_found(physical_name, reason));
        }

        let mut schema = None;
        let mut batches = Vec::new();

        for path in &files {
            let data = self.operator().read(path).await.map_err(|e| {
                StorageError::table_operation(
                    physical_name,
                    format!("failed to read '{}': {}", path, e),
                )
            })?;

            let (file_schema, file_batches) = decode_parquet(data.to_bytes()).map_err(|e| {
                StorageError::table_operation(
                    physical_name,
                    format!("failed to decode '{}': {}", path, e),
                )
            })?;

            let expected = schema.get_or_insert_with(|| file_schema.clone());
            if expected.fields() != file_schema.fields() {
                return Err(StorageError::table_operation(
                    physical_name,
                    format!("'{}' does not match the schema of earlier files", path),
                ));
            }

            batches.extend(file_batches);
        }

        let schema = schema.ok_or_else(|| {
            StorageError::source_not_found(physical_name, "table has no data files")
        })?;

        let relation = concat_batches(&schema, &batches)
            .map_err(|e| StorageError::table_operation(physical_name, e.to_string()))?;

        tracing::debug!(
            table = physical_name,
            files = files.len(),
            rows = relation.num_rows(),
            "Read table"
        );

        Ok(relation)
    }
}
