//! Stream executor: pushes the leading filters to the row source and
//! replays the rest in memory.

use super::cursor::ScopedCursor;
use super::residual::replay;
use super::source::{RowSource, SourceQuery};
use crate::ast::Entity;
use crate::context::ExecutorConfig;
use crate::optimizer::{PushPlan, PushdownOptimizer};
use crate::pipeline::{Element, ElementIter, Pipeline};
use tracing::{debug, warn};
use weir_core::{Error, Result};

/// Executes pipelines against a row source.
pub struct StreamExecutor<'s, R: RowSource> {
    source: &'s R,
    config: ExecutorConfig,
}

impl<'s, R: RowSource> StreamExecutor<'s, R> {
    pub fn new(source: &'s R, config: ExecutorConfig) -> Self {
        Self { source, config }
    }

    /// Splits `pipeline` without executing anything.
    pub fn plan(&self, pipeline: &Pipeline<R::Row>) -> PushPlan {
        PushdownOptimizer::new(&self.config).split(pipeline, self.source.accepts_expressions())
    }

    /// Runs one round trip to the row source and returns the lazily
    /// replayed result.
    ///
    /// The source's cursor is released when the returned iterator is
    /// dropped. A failing source is reported as a query execution error.
    pub fn execute(&self, pipeline: &Pipeline<R::Row>) -> Result<ElementIter<'s>> {
        let plan = self.plan(pipeline);
        let entity = <R::Row as Entity>::NAME;
        let query = SourceQuery::new(entity, plan.expression(), plan.parameters());

        debug!(
            entity,
            expression = query.expression().unwrap_or("<all>"),
            parameters = query.parameters().len(),
            residual = plan.residual().len(),
            "executing stream"
        );

        let cursor = self.source.execute(&query).map_err(|e| {
            warn!(entity, error = %e, "row source execution failed");
            Error::query_execution(entity, e)
        })?;

        let rows = ScopedCursor::new(cursor, entity).map(|row| Box::new(row) as Element);
        Ok(replay(Box::new(rows), plan.residual()))
    }
}
