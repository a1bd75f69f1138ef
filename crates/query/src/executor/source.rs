//! The row-source contract.

use crate::ast::Entity;
use weir_core::{SourceError, Value};

/// A sequence of rows returned by a row source.
///
/// `release` is called exactly once when the executor is done with the
/// cursor, whether iteration finished, stopped early or unwound.
pub trait RowCursor: Iterator {
    /// Releases the underlying resource (open cursor, connection handle).
    fn release(&mut self) {}
}

impl<T> RowCursor for std::vec::IntoIter<T> {}

/// A request to a row source: an optional filter expression with
/// positional `?` parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceQuery {
    entity: &'static str,
    expression: Option<String>,
    parameters: Vec<Value>,
}

impl SourceQuery {
    pub fn new(entity: &'static str, expression: Option<String>, parameters: Vec<Value>) -> Self {
        Self {
            entity,
            expression,
            parameters,
        }
    }

    /// Creates a query for every row of an entity.
    pub fn all(entity: &'static str) -> Self {
        Self::new(entity, None, Vec::new())
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Returns the filter expression, or `None` to fetch every row.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Returns the parameters, one per `?` slot in left-to-right order.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

/// A backing store that can return rows matching an expression.
pub trait RowSource {
    /// Row type produced by this source.
    type Row: Entity;

    /// Cursor over the rows of one execution.
    type Cursor<'a>: RowCursor<Item = Self::Row> + 'a
    where
        Self: 'a;

    /// Executes a query. Rows come back in store-defined order.
    fn execute<'a>(&'a self, query: &SourceQuery) -> Result<Self::Cursor<'a>, SourceError>;

    /// Returns false if the source cannot evaluate expressions, in which
    /// case every filter runs in memory.
    fn accepts_expressions(&self) -> bool {
        true
    }
}
