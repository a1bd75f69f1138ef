//! Pushdown optimizer.
//!
//! Splits a pipeline into a pushed prefix and a residual suffix. Only a
//! leading, contiguous run of renderable filters is pushed: any other
//! operation in front of a filter may change what a row is, or which rows
//! take part, so the scan stops at the first operation that is not a
//! renderable filter.
//!
//! ```text
//! filter(p1), filter(p2), map(f), filter(p3)
//! └──── pushed: (p1 AND p2) ───┘ └─ residual ─┘
//! ```

use crate::context::ExecutorConfig;
use crate::pipeline::{Operation, Pipeline};
use crate::render::Rendered;
use core::fmt;
use std::rc::Rc;
use tracing::debug;
use weir_core::Value;

/// Result of splitting a pipeline.
#[derive(Clone, Debug)]
pub struct PushPlan {
    pushed: Vec<Rendered>,
    residual: Vec<Rc<Operation>>,
}

impl PushPlan {
    /// A plan that pushes nothing.
    pub fn residual_only(residual: Vec<Rc<Operation>>) -> Self {
        Self {
            pushed: Vec::new(),
            residual,
        }
    }

    /// Rendered fragments of the pushed filters, in pipeline order.
    pub fn pushed(&self) -> &[Rendered] {
        &self.pushed
    }

    /// Operations to replay in memory, in pipeline order.
    pub fn residual(&self) -> &[Rc<Operation>] {
        &self.residual
    }

    /// Returns the combined expression to send to the row source.
    ///
    /// A single fragment is returned as-is; several are joined with AND.
    pub fn expression(&self) -> Option<String> {
        match self.pushed.len() {
            0 => None,
            1 => Some(self.pushed[0].sql.clone()),
            _ => Some(Rendered::join("AND", self.pushed.clone()).sql),
        }
    }

    /// Returns the bound parameters for `expression()`, in slot order.
    pub fn parameters(&self) -> Vec<Value> {
        self.pushed
            .iter()
            .flat_map(|r| r.params.iter().cloned())
            .collect()
    }

    pub fn has_pushdown(&self) -> bool {
        !self.pushed.is_empty()
    }
}

impl fmt::Display for PushPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expression() {
            Some(expr) => {
                write!(f, "pushed: {expr}")?;
                let params = self.parameters();
                if !params.is_empty() {
                    f.write_str(" [")?;
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{p}")?;
                    }
                    f.write_str("]")?;
                }
            }
            None => f.write_str("pushed: none")?,
        }
        f.write_str("\nresidual: [")?;
        for (i, op) in self.residual.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{op}")?;
        }
        f.write_str("]")
    }
}

/// Splits pipelines according to an executor configuration.
pub struct PushdownOptimizer<'a> {
    config: &'a ExecutorConfig,
}

impl<'a> PushdownOptimizer<'a> {
    pub fn new(config: &'a ExecutorConfig) -> Self {
        Self { config }
    }

    /// Splits `pipeline` over a source of `S`.
    ///
    /// `accepts_expressions` is false for sources that cannot filter
    /// server-side, in which case nothing is pushed.
    pub fn split<S: 'static>(&self, pipeline: &Pipeline<S>, accepts_expressions: bool) -> PushPlan {
        let operations = pipeline.operations();
        if !self.config.pushdown || !accepts_expressions {
            return PushPlan::residual_only(operations);
        }

        let mut pushed = Vec::new();
        for op in &operations {
            let rendered = op
                .as_filter()
                .and_then(|filter| filter.predicate::<S>())
                .and_then(|predicate| self.config.renderers.render(predicate));
            match rendered {
                Some(r) => pushed.push(r),
                None => break,
            }
        }

        let split_at = pushed.len();
        let residual = operations[split_at..].to_vec();
        debug!(
            pushed = split_at,
            residual = residual.len(),
            "split pipeline for pushdown"
        );
        PushPlan { pushed, residual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Entity, Field, Predicate};
    use crate::render::RendererRegistry;

    #[derive(Clone)]
    struct Person {
        name: String,
        age: i32,
    }

    impl Entity for Person {
        const NAME: &'static str = "person";
    }

    fn age() -> Field<Person, i32> {
        Field::new("age", |p: &Person| p.age).unwrap()
    }

    fn name() -> Field<Person, String> {
        Field::new("name", |p: &Person| p.name.clone()).unwrap()
    }

    fn split(pipeline: &Pipeline<Person>) -> PushPlan {
        let config = ExecutorConfig::default();
        PushdownOptimizer::new(&config).split(pipeline, true)
    }

    #[test]
    fn test_single_filter() {
        let p = Pipeline::new().append(Operation::filter(age().greater_or_equal(18)));
        let plan = split(&p);
        assert_eq!(plan.expression().as_deref(), Some("age >= ?"));
        assert_eq!(plan.parameters(), vec![Value::Int32(18)]);
        assert!(plan.residual().is_empty());
    }

    #[test]
    fn test_prefix_maximality() {
        let p = Pipeline::new()
            .append(Operation::filter(age().greater_than(10)))
            .append(Operation::filter(name().starts_with("L")))
            .append(Operation::map(|p: Person| p.age))
            .append(Operation::filter(Predicate::from_fn(|a: &i32| *a < 40)));
        let plan = split(&p);
        assert_eq!(plan.expression().as_deref(), Some("(age > ? AND name LIKE ?)"));
        assert_eq!(
            plan.parameters(),
            vec![Value::Int32(10), Value::String("L%".into())]
        );
        let residual: Vec<String> = plan.residual().iter().map(|o| o.to_string()).collect();
        assert_eq!(residual, vec!["map", "filter(<opaque>)"]);
    }

    #[test]
    fn test_unrenderable_filter_stops_scan() {
        let p = Pipeline::new()
            .append(Operation::filter(age().greater_than(10)))
            .append(Operation::filter(Predicate::from_fn(|p: &Person| p.age % 2 == 0)))
            .append(Operation::filter(age().less_than(50)));
        let plan = split(&p);
        assert_eq!(plan.expression().as_deref(), Some("age > ?"));
        assert_eq!(plan.residual().len(), 2);
    }

    #[test]
    fn test_leading_non_filter_blocks_pushdown() {
        let p = Pipeline::new()
            .append(Operation::Limit(5))
            .append(Operation::filter(age().greater_than(10)));
        let plan = split(&p);
        assert!(!plan.has_pushdown());
        assert_eq!(plan.residual().len(), 2);

        let p = Pipeline::new()
            .append(Operation::distinct::<i32>())
            .append(Operation::filter(age().greater_than(10)));
        assert!(!split(&p).has_pushdown());
    }

    #[test]
    fn test_disabled_pushdown() {
        let p: Pipeline<Person> = Pipeline::new().append(Operation::filter(age().greater_than(10)));
        let config = ExecutorConfig::in_memory();
        let plan = PushdownOptimizer::new(&config).split(&p, true);
        assert!(!plan.has_pushdown());

        let config = ExecutorConfig::default();
        let plan = PushdownOptimizer::new(&config).split(&p, false);
        assert!(!plan.has_pushdown());

        let config = ExecutorConfig::default().with_renderers(RendererRegistry::empty());
        let plan = PushdownOptimizer::new(&config).split(&p, true);
        assert!(!plan.has_pushdown());
        assert_eq!(plan.expression(), None);
    }

    #[test]
    fn test_display() {
        let p = Pipeline::new()
            .append(Operation::filter(age().greater_or_equal(18)))
            .append(Operation::Limit(2));
        assert_eq!(split(&p).to_string(), "pushed: age >= ? [18]\nresidual: [limit(2)]");
    }
}
