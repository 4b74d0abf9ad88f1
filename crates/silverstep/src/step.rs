//! The bronze-to-silver step: read, stamp, parameterize, write.

use crate::context::StepContext;
use crate::error::StepError;
use crate::pipeline::Pipeline;
use crate::relation::Relation;
use crate::transform::{AddExecutionDatetime, AddParameterFromConfig, CONFIG_YAML_PARAMETER, EXECUTE_DATETIME};
use chrono::{DateTime, Utc};
use silverstep_config::{StepConfig, WriteMode};
use silverstep_storage::{StorageError, TableMetadata, WriteSummary};
use tracing::info;

/// Columns written to the silver table, in order.
pub const OUTPUT_COLUMNS: [&str; 8] = [
    "COUNTYFP",
    "NEVER",
    "RARELY",
    "SOMETIMES",
    "FREQUENTLY",
    "ALWAYS",
    EXECUTE_DATETIME,
    CONFIG_YAML_PARAMETER,
];

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct StepSummary {
    pub source: String,
    pub destination: String,
    pub rows_read: usize,
    /// Whether this run created the destination table.
    pub created_destination: bool,
    pub executed_at: DateTime<Utc>,
    pub write: WriteSummary,
}

#[derive(Debug, Clone)]
pub struct BronzeToSilverStep {
    source: String,
    destination: String,
    parameter: String,
    write_mode: WriteMode,
    preview_rows: usize,
}

impl BronzeToSilverStep {
    pub fn from_config(config: &StepConfig) -> Self {
        Self {
            source: config.source.clone(),
            destination: config.destination.clone(),
            parameter: config.parameter.clone(),
            write_mode: config.write_mode,
            preview_rows: config.preview_rows,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Build the transformation chain, resolving the parameter before any row is seen.
    pub fn pipeline(&self, ctx: &StepContext<'_>) -> Result<Pipeline, StepError> {
        let parameter = AddParameterFromConfig::resolve(&self.parameter, ctx.parameters)?;

        Ok(Pipeline::new()
            .with_preview_rows(self.preview_rows)
            .stage(AddExecutionDatetime)
            .displayed_stage(parameter))
    }

    pub async fn run(&self, ctx: &StepContext<'_>) -> Result<StepSummary, StepError> {
        let pipeline = self.pipeline(ctx)?;

        let source = ctx.tables.get_name(&self.source)?;
        info!("Reading table: {}", source);
        let input = Relation::new(ctx.reader.read(&source).await?);
        let rows_read = input.num_rows();

        let output = pipeline.run(input, ctx)?;

        let (destination, created_destination, write) = self.save(output, ctx).await?;

        Ok(StepSummary {
            source,
            destination,
            rows_read,
            created_destination,
            executed_at: ctx.executed_at,
            write,
        })
    }

    async fn save(
        &self,
        relation: Relation,
        ctx: &StepContext<'_>,
    ) -> Result<(String, bool, WriteSummary), StepError> {
        let destination = ctx.tables.get_name(&self.destination)?;

        let (metadata, created) = if ctx.tables.exists(&self.destination).await? {
            info!("Table {} exists. Appending...", destination);
            let metadata = ctx.tables.metadata(&self.destination).await?.ok_or_else(|| {
                StorageError::table_operation(&destination, "table metadata disappeared")
            })?;
            (metadata, false)
        } else {
            (ctx.tables.create(&self.destination).await?, true)
        };

        let columns = output_columns(&metadata);
        let selected = relation.select(&columns)?;

        info!("Saving data to table: {}", destination);
        let summary = ctx
            .writer
            .write(selected.batch(), &destination, self.write_mode)
            .await?;

        Ok((destination, created, summary))
    }
}

/// Fixed projection plus the partition column when it is not already part of it.
fn output_columns(metadata: &TableMetadata) -> Vec<&str> {
    let mut columns = OUTPUT_COLUMNS.to_vec();
    if let Some(partition) = metadata.partition_by.as_deref() {
        if !columns.contains(&partition) {
            columns.push(partition);
        }
    }
    columns
}
