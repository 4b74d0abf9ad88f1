//! Errors surfaced by a step run

use arrow::error::ArrowError;
use silverstep_config::ConfigError;
use silverstep_storage::StorageError;
use thiserror::Error;

/// Any failure that terminates a run. Nothing here is retried.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transformation stage could not build its output relation
    #[error("Stage '{stage}' failed: {source}")]
    Transform {
        stage: String,
        #[source]
        source: ArrowError,
    },
}

impl StepError {
    pub(crate) fn transform(stage: impl Into<String>, source: ArrowError) -> Self {
        Self::Transform {
            stage: stage.into(),
            source,
        }
    }
}
