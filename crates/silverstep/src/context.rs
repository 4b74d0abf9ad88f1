//! Explicit collaborators handed to every stage of a run

use chrono::{DateTime, SubsecRound, Utc};
use silverstep_config::ParameterResolver;
use silverstep_storage::{TableManager, TableReader, TableWriter};

/// Everything a step run needs from the outside world.
pub struct StepContext<'a> {
    pub tables: &'a dyn TableManager,
    pub reader: &'a dyn TableReader,
    pub writer: &'a dyn TableWriter,
    pub parameters: &'a dyn ParameterResolver,
    /// Wall-clock time of this run, truncated to microseconds.
    pub executed_at: DateTime<Utc>,
}

impl<'a> StepContext<'a> {
    /// Context for a run starting now.
    pub fn new(
        tables: &'a dyn TableManager,
        reader: &'a dyn TableReader,
        writer: &'a dyn TableWriter,
        parameters: &'a dyn ParameterResolver,
    ) -> Self {
        Self {
            tables,
            reader,
            writer,
            parameters,
            executed_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Pin the run time, e.g. for reproducible tests.
    pub fn with_executed_at(mut self, executed_at: DateTime<Utc>) -> Self {
        self.executed_at = executed_at.trunc_subsecs(6);
        self
    }
}
