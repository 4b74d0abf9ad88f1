//! Sequential executor for transformation stages

use crate::context::StepContext;
use crate::error::StepError;
use crate::relation::Relation;
use crate::transform::Transform;
use arrow::util::pretty::pretty_format_batches;
use tracing::{debug, info, warn};

struct Stage {
    transform: Box<dyn Transform>,
    display: bool,
}

/// Ordered list of stages, each consuming the previous stage's output
pub struct Pipeline {
    stages: Vec<Stage>,
    preview_rows: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            preview_rows: 20,
        }
    }

    /// Rows logged after displayed stages. Zero disables previews.
    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    pub fn stage(self, transform: impl Transform + 'static) -> Self {
        self.push(Box::new(transform), false)
    }

    /// Add a stage whose output is previewed in the log.
    pub fn displayed_stage(self, transform: impl Transform + 'static) -> Self {
        self.push(Box::new(transform), true)
    }

    fn push(mut self, transform: Box<dyn Transform>, display: bool) -> Self {
        self.stages.push(Stage { transform, display });
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.transform.name()).collect()
    }

    pub fn run(&self, input: Relation, ctx: &StepContext<'_>) -> Result<Relation, StepError> {
        let mut relation = input;

        for stage in &self.stages {
            let name = stage.transform.name();
            debug!("Running stage {}", name);
            relation = stage.transform.apply(relation, ctx)?;

            if stage.display && self.preview_rows > 0 {
                self.preview(name, &relation);
            }
        }

        Ok(relation)
    }

    fn preview(&self, name: &str, relation: &Relation) {
        let rows = relation.num_rows().min(self.preview_rows);
        let head = relation.batch().slice(0, rows);

        match pretty_format_batches(&[head]) {
            Ok(table) => info!(
                "{} ({} of {} rows):\n{}",
                name,
                rows,
                relation.num_rows(),
                table
            ),
            Err(e) => warn!("Could not render preview of {}: {}", name, e),
        }
    }
}
