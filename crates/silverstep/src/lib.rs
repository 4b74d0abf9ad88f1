// silverstep - bronze-to-silver table transformation step
//
// Reads a bronze table, stamps every row with the execution time and a
// configuration-derived literal, and writes the result into a silver table
// under dynamic partition overwrite.

use anyhow::{Context, Result};
use silverstep_config::RuntimeConfig;
use silverstep_storage::{set_parquet_row_group_size, TableManager};
use tracing::info;

mod context;
mod error;
mod init;
mod pipeline;
mod relation;
mod step;
mod transform;

#[cfg(test)]
mod testing;

pub use context::StepContext;
pub use error::StepError;
pub use init::init_tracing;
pub use pipeline::Pipeline;
pub use relation::Relation;
pub use step::{BronzeToSilverStep, StepSummary, OUTPUT_COLUMNS};
pub use transform::{
    AddExecutionDatetime, AddParameterFromConfig, Transform, CONFIG_YAML_PARAMETER,
    EXECUTE_DATETIME,
};

// Re-export commonly used types for convenience
pub use silverstep_config;
pub use silverstep_storage;

/// Existence check result for one configured table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub role: &'static str,
    pub logical_name: String,
    pub physical_name: String,
    pub exists: bool,
}

/// Run the step once against the configured warehouse.
pub async fn run_with_config(config: RuntimeConfig) -> Result<StepSummary> {
    // Configure Parquet writer properties before first use
    set_parquet_row_group_size(config.storage.parquet_row_group_size);

    let (warehouse, tables) = init::init_storage(&config)?;
    let parameters = config.parameters();
    let ctx = StepContext::new(&tables, &warehouse, &warehouse, &parameters);

    let step = BronzeToSilverStep::from_config(&config.step);
    let summary = step
        .run(&ctx)
        .await
        .with_context(|| format!("Step {} -> {} failed", step.source(), step.destination()))?;

    info!(
        source = %summary.source,
        destination = %summary.destination,
        rows_read = summary.rows_read,
        rows_written = summary.write.rows_written,
        partitions = summary.write.partitions.len(),
        created = summary.created_destination,
        "Step complete"
    );

    Ok(summary)
}

/// Resolve and check the source and destination tables without running the step.
pub async fn describe_tables(config: &RuntimeConfig) -> Result<Vec<TableStatus>> {
    let (_, tables) = init::init_storage(config)?;

    let mut statuses = Vec::with_capacity(2);
    for (role, logical_name) in [
        ("source", &config.step.source),
        ("destination", &config.step.destination),
    ] {
        statuses.push(TableStatus {
            role,
            logical_name: logical_name.clone(),
            physical_name: tables.get_name(logical_name)?,
            exists: tables.exists(logical_name).await?,
        });
    }

    Ok(statuses)
}
