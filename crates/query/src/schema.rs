//! Column lookup by name.
//!
//! An `EntitySchema` maps store-side column names back to the fields that
//! read them, so a row source can evaluate a rendered fragment against
//! in-process entities.

use crate::ast::{ColumnRef, Entity, Field, FieldValue};
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;
use weir_core::Value;

struct ColumnReader<E> {
    column: ColumnRef,
    read: Rc<dyn Fn(&E) -> Value>,
}

/// Named columns of entity `E`.
pub struct EntitySchema<E> {
    columns: HashMap<String, ColumnReader<E>>,
}

impl<E: Entity> Default for EntitySchema<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntitySchema<E> {
    pub fn new() -> Self {
        Self {
            columns: HashMap::new(),
        }
    }

    /// Adds a field. A later field with the same column name replaces an
    /// earlier one.
    pub fn with<V: FieldValue>(mut self, field: &Field<E, V>) -> Self {
        let reader = field.clone();
        self.columns.insert(
            field.name().to_string(),
            ColumnReader {
                column: field.column().clone(),
                read: Rc::new(move |entity: &E| reader.value_of(entity)),
            },
        );
        self
    }

    /// Returns the column with the given name.
    pub fn column(&self, name: &str) -> Option<&ColumnRef> {
        self.columns.get(name).map(|c| &c.column)
    }

    /// Reads a column's value from an entity.
    pub fn value(&self, entity: &E, name: &str) -> Option<Value> {
        self.columns.get(name).map(|c| (c.read)(entity))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<E> fmt::Debug for EntitySchema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.columns.keys().collect();
        names.sort();
        f.debug_struct("EntitySchema").field("columns", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_core::DataType;

    struct Person {
        age: i32,
        email: Option<String>,
    }

    impl Entity for Person {
        const NAME: &'static str = "person";
    }

    #[test]
    fn test_schema_reads_columns() {
        let age = Field::new("age", |p: &Person| p.age).unwrap();
        let email = Field::new("email", |p: &Person| p.email.clone()).unwrap();
        let schema = EntitySchema::new().with(&age).with(&email);

        let p = Person {
            age: 30,
            email: None,
        };
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.value(&p, "age"), Some(Value::Int32(30)));
        assert_eq!(schema.value(&p, "email"), Some(Value::Null));
        assert_eq!(schema.value(&p, "name"), None);
        assert_eq!(schema.column("age").unwrap().data_type(), DataType::Int32);
        assert!(schema.column("email").unwrap().is_nullable());
        assert!(!schema.contains("name"));
    }
}
