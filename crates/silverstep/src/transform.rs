//! Column-level transformation stages

use crate::context::StepContext;
use crate::error::StepError;
use crate::relation::Relation;
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, TimeUnit};
use silverstep_config::{ConfigError, ParameterResolver, ParameterValue};
use std::sync::Arc;

/// Column holding the run's wall-clock time.
pub const EXECUTE_DATETIME: &str = "EXECUTE_DATETIME";
/// Column holding the configuration-derived literal.
pub const CONFIG_YAML_PARAMETER: &str = "CONFIG_YAML_PARAMETER";

/// A pure `Relation -> Relation` stage.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, relation: Relation, ctx: &StepContext<'_>) -> Result<Relation, StepError>;
}

/// Stamps every row with the run's execution time
#[derive(Debug, Clone, Copy, Default)]
pub struct AddExecutionDatetime;

impl Transform for AddExecutionDatetime {
    fn name(&self) -> &str {
        "add_execution_datetime"
    }

    fn apply(&self, relation: Relation, ctx: &StepContext<'_>) -> Result<Relation, StepError> {
        let micros = ctx.executed_at.timestamp_micros();
        let values =
            TimestampMicrosecondArray::from_value(micros, relation.num_rows()).with_timezone("UTC");
        let field = Field::new(
            EXECUTE_DATETIME,
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        );

        relation
            .with_column(field, Arc::new(values))
            .map_err(|e| StepError::transform(self.name(), e))
    }
}

/// Broadcasts a configuration parameter to every row
#[derive(Debug, Clone)]
pub struct AddParameterFromConfig {
    value: ParameterValue,
}

impl AddParameterFromConfig {
    pub fn new(value: impl Into<ParameterValue>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Resolve `raw` (a `%key%` placeholder or a literal) up front.
    pub fn resolve(raw: &str, resolver: &dyn ParameterResolver) -> Result<Self, ConfigError> {
        resolver.resolve_placeholder(raw).map(Self::new)
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }
}

impl Transform for AddParameterFromConfig {
    fn name(&self) -> &str {
        "add_parameter_from_config"
    }

    fn apply(&self, relation: Relation, _ctx: &StepContext<'_>) -> Result<Relation, StepError> {
        tracing::info!("{}: {}", CONFIG_YAML_PARAMETER, self.value);

        let rows = relation.num_rows();
        let (data_type, values): (DataType, ArrayRef) = match &self.value {
            ParameterValue::String(s) => (
                DataType::Utf8,
                Arc::new(StringArray::from_iter_values(std::iter::repeat(s).take(rows))),
            ),
            ParameterValue::Integer(i) => (DataType::Int64, Arc::new(Int64Array::from_value(*i, rows))),
            ParameterValue::Float(v) => (DataType::Float64, Arc::new(Float64Array::from_value(*v, rows))),
            ParameterValue::Boolean(b) => (DataType::Boolean, Arc::new(BooleanArray::from(vec![*b; rows]))),
        };

        relation
            .with_column(Field::new(CONFIG_YAML_PARAMETER, data_type, false), values)
            .map_err(|e| StepError::transform(self.name(), e))
    }
}
