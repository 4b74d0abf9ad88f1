//! Immutable tabular relation passed between stages

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{Field, FieldRef, Schema, SchemaRef};
use arrow::error::ArrowError;
use silverstep_storage::project;
use std::sync::Arc;

/// Columnar, schema-bearing dataset handle.
///
/// Every operation returns a new `Relation`; the wrapped batch is never
/// mutated. Cloning is cheap since Arrow arrays are reference counted.
#[derive(Debug, Clone)]
pub struct Relation {
    batch: RecordBatch,
}

impl Relation {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Add `values` as column `field`.
    ///
    /// A column with the same name is replaced in place; otherwise the new
    /// column is appended last.
    pub fn with_column(&self, field: Field, values: ArrayRef) -> Result<Self, ArrowError> {
        let schema = self.batch.schema_ref();
        let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
        let mut columns = self.batch.columns().to_vec();

        match schema.index_of(field.name()) {
            Ok(index) => {
                fields[index] = Arc::new(field);
                columns[index] = values;
            }
            Err(_) => {
                fields.push(Arc::new(field));
                columns.push(values);
            }
        }

        let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
        RecordBatch::try_new(Arc::new(schema), columns).map(Self::new)
    }

    /// Ordered projection; see [`silverstep_storage::project`].
    pub fn select(&self, columns: &[&str]) -> silverstep_storage::Result<Self> {
        project(&self.batch, columns).map(Self::new)
    }
}

impl From<RecordBatch> for Relation {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}
