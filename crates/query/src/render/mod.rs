//! Rendering predicates into parameterized query fragments.
//!
//! A renderer handles one operator family over one data type. The
//! registry dispatches leaf predicates to the matching renderer and
//! renders combinators recursively. Failure to render is not an error: it
//! returns `None` and the caller keeps the predicate in memory.

mod standard;

pub use standard::{comparison, null_check, sign, string_match};

use crate::ast::{ColumnRef, Operator, OperatorFamily, Predicate};
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::trace;
use weir_core::{DataType, Value};

/// A query fragment with positional `?` parameters.
///
/// The n-th `?` in `sql`, left to right, binds `params[n]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Rendered {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Joins fragments as `(a KEYWORD b ...)`, concatenating parameters in
    /// order.
    pub fn join(keyword: &str, parts: Vec<Rendered>) -> Rendered {
        let mut sql = String::from("(");
        let mut params = Vec::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(keyword);
                sql.push(' ');
            }
            sql.push_str(&part.sql);
            params.extend(part.params);
        }
        sql.push(')');
        Rendered { sql, params }
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        if !self.params.is_empty() {
            f.write_str(" [")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{p}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// Translates one leaf predicate into a fragment.
pub trait PredicateRenderer {
    /// Returns `None` if this renderer cannot express the predicate.
    fn render(&self, column: &ColumnRef, operator: Operator, operand: Option<&Value>)
        -> Option<Rendered>;
}

impl<F> PredicateRenderer for F
where
    F: Fn(&ColumnRef, Operator, Option<&Value>) -> Option<Rendered>,
{
    fn render(
        &self,
        column: &ColumnRef,
        operator: Operator,
        operand: Option<&Value>,
    ) -> Option<Rendered> {
        self(column, operator, operand)
    }
}

/// Renderers keyed by operator family and data type.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<(OperatorFamily, DataType), Rc<dyn PredicateRenderer>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl RendererRegistry {
    /// Creates a registry that renders nothing.
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Creates a registry with the standard renderers for every family over
    /// the data types it applies to.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for dt in DataType::ALL {
            registry.insert(OperatorFamily::Comparison, dt, Rc::new(comparison));
            registry.insert(OperatorFamily::NullCheck, dt, Rc::new(null_check));
            if dt.is_numeric() {
                registry.insert(OperatorFamily::Sign, dt, Rc::new(sign));
            }
        }
        registry.insert(
            OperatorFamily::StringMatch,
            DataType::String,
            Rc::new(string_match),
        );
        registry
    }

    fn insert(&mut self, family: OperatorFamily, dt: DataType, r: Rc<dyn PredicateRenderer>) {
        self.renderers.insert((family, dt), r);
    }

    /// Returns the registry with `renderer` handling `family` over `data_type`,
    /// replacing any previous renderer for that pair.
    pub fn register(
        mut self,
        family: OperatorFamily,
        data_type: DataType,
        renderer: impl PredicateRenderer + 'static,
    ) -> Self {
        self.insert(family, data_type, Rc::new(renderer));
        self
    }

    /// Returns the registry without a renderer for `family` over `data_type`.
    pub fn without(mut self, family: OperatorFamily, data_type: DataType) -> Self {
        self.renderers.remove(&(family, data_type));
        self
    }

    /// Returns true if a renderer is registered for the pair.
    pub fn supports(&self, family: OperatorFamily, data_type: DataType) -> bool {
        self.renderers.contains_key(&(family, data_type))
    }

    /// Renders a predicate tree.
    ///
    /// A combinator renders only if every child does, and an empty
    /// combinator or opaque predicate never renders.
    pub fn render<E>(&self, predicate: &Predicate<E>) -> Option<Rendered> {
        match predicate {
            Predicate::Field(leaf) => {
                let column = leaf.column();
                let key = (leaf.operator().family(), column.data_type());
                let rendered = self
                    .renderers
                    .get(&key)
                    .and_then(|r| r.render(column, leaf.operator(), leaf.operand()));
                if rendered.is_none() {
                    trace!(predicate = %leaf, "renderer declined predicate");
                }
                rendered
            }
            Predicate::Combined(node) => {
                if node.children().is_empty() {
                    return None;
                }
                let parts = node
                    .children()
                    .iter()
                    .map(|child| self.render(child))
                    .collect::<Option<Vec<_>>>()?;
                Some(Rendered::join(node.kind().keyword(), parts))
            }
            Predicate::Opaque(_) => {
                trace!("opaque predicate cannot be rendered");
                None
            }
        }
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("renderers", &self.renderers.len())
            .finish()
    }
}
