// Shared fixtures for unit tests

use crate::context::StepContext;
use crate::relation::Relation;
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use opendal::{services, Operator};
use silverstep_config::{Parameters, TablesConfig};
use silverstep_storage::{Warehouse, WarehouseTableManager};
use std::sync::Arc;

pub(crate) struct ContextParts {
    pub warehouse: Warehouse,
    pub tables: WarehouseTableManager,
    pub parameters: Parameters,
}

impl ContextParts {
    pub fn context(&self) -> StepContext<'_> {
        StepContext::new(
            &self.tables,
            &self.warehouse,
            &self.warehouse,
            &self.parameters,
        )
    }
}

pub(crate) fn context_parts() -> ContextParts {
    let op = Operator::new(services::Memory::default()).unwrap().finish();
    let warehouse = Warehouse::new(op, None);
    ContextParts {
        tables: WarehouseTableManager::new(warehouse.clone(), TablesConfig::default()),
        warehouse,
        parameters: Parameters::default(),
    }
}

/// Bronze-shaped relation with one row per county.
pub(crate) fn relation(counties: &[&str]) -> Relation {
    let measure = |v: f64| -> ArrayRef { Arc::new(Float64Array::from(vec![v; counties.len()])) };
    let schema = Arc::new(Schema::new(vec![
        Field::new("COUNTYFP", DataType::Utf8, false),
        Field::new("NEVER", DataType::Float64, false),
        Field::new("RARELY", DataType::Float64, false),
        Field::new("SOMETIMES", DataType::Float64, false),
        Field::new("FREQUENTLY", DataType::Float64, false),
        Field::new("ALWAYS", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(counties.to_vec())),
            measure(0.1),
            measure(0.2),
            measure(0.3),
            measure(0.2),
            measure(0.2),
        ],
    )
    .unwrap();
    Relation::new(batch)
}
