//! In-memory row source that evaluates rendered fragments itself.

use super::fragment::Fragment;
use crate::ast::Entity;
use crate::executor::{RowCursor, RowSource, SourceQuery};
use crate::schema::EntitySchema;
use core::cell::{Cell, RefCell};
use core::fmt;
use weir_core::{SourceError, Value};

/// Rows held in memory, filtered by parsing and evaluating the pushed
/// expression with store semantics.
///
/// Rows are returned in insertion order. Executions and cursor releases
/// are counted so callers can observe round trips.
pub struct InMemoryRowSource<E> {
    schema: EntitySchema<E>,
    rows: Vec<E>,
    accepts_expressions: bool,
    executions: Cell<usize>,
    releases: Cell<usize>,
    last_query: RefCell<Option<SourceQuery>>,
}

impl<E: Entity + Clone> InMemoryRowSource<E> {
    pub fn new(schema: EntitySchema<E>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            accepts_expressions: true,
            executions: Cell::new(0),
            releases: Cell::new(0),
            last_query: RefCell::new(None),
        }
    }

    /// Adds rows.
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = E>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Makes the source decline expressions, so every filter runs in
    /// memory after a full fetch.
    pub fn without_expressions(mut self) -> Self {
        self.accepts_expressions = false;
        self
    }

    pub fn push(&mut self, row: E) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn schema(&self) -> &EntitySchema<E> {
        &self.schema
    }

    /// Number of `execute` calls so far.
    pub fn executions(&self) -> usize {
        self.executions.get()
    }

    /// Number of cursors released so far.
    pub fn releases(&self) -> usize {
        self.releases.get()
    }

    /// Returns the most recent query received.
    pub fn last_query(&self) -> Option<SourceQuery> {
        self.last_query.borrow().clone()
    }

    /// Returns the expression of the most recent query.
    pub fn last_expression(&self) -> Option<String> {
        self.last_query
            .borrow()
            .as_ref()
            .and_then(|q| q.expression().map(str::to_string))
    }

    /// Returns the parameters of the most recent query.
    pub fn last_parameters(&self) -> Vec<Value> {
        self.last_query
            .borrow()
            .as_ref()
            .map(|q| q.parameters().to_vec())
            .unwrap_or_default()
    }
}

impl<E: Entity + Clone> RowSource for InMemoryRowSource<E> {
    type Row = E;
    type Cursor<'a> = MemoryCursor<'a, E> where Self: 'a;

    fn execute<'a>(&'a self, query: &SourceQuery) -> Result<MemoryCursor<'a, E>, SourceError> {
        self.executions.set(self.executions.get() + 1);
        *self.last_query.borrow_mut() = Some(query.clone());

        let fragment = match query.expression() {
            Some(expression) => {
                if !self.accepts_expressions {
                    return Err(format!("{} does not accept expressions", E::NAME).into());
                }
                let fragment = Fragment::parse(expression)?;
                fragment.bind(&self.schema, query.parameters())?;
                Some(fragment)
            }
            None => None,
        };

        Ok(MemoryCursor {
            rows: self.rows.iter(),
            schema: &self.schema,
            fragment,
            params: query.parameters().to_vec(),
            releases: &self.releases,
        })
    }

    fn accepts_expressions(&self) -> bool {
        self.accepts_expressions
    }
}

impl<E> fmt::Debug for InMemoryRowSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRowSource")
            .field("rows", &self.rows.len())
            .field("schema", &self.schema)
            .field("executions", &self.executions.get())
            .finish()
    }
}

/// Lazily filtered cursor over an `InMemoryRowSource`.
pub struct MemoryCursor<'a, E> {
    rows: core::slice::Iter<'a, E>,
    schema: &'a EntitySchema<E>,
    fragment: Option<Fragment>,
    params: Vec<Value>,
    releases: &'a Cell<usize>,
}

impl<E: Entity + Clone> Iterator for MemoryCursor<'_, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        let schema = self.schema;
        let params = &self.params;
        match &self.fragment {
            Some(fragment) => self
                .rows
                .find(|row| fragment.matches(*row, schema, params))
                .cloned(),
            None => self.rows.next().cloned(),
        }
    }
}

impl<E: Entity + Clone> RowCursor for MemoryCursor<'_, E> {
    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }
}
