//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use weir_core::SourceError;
use weir_query::ast::{Entity, Field};
use weir_query::executor::{RowCursor, RowSource, SourceQuery};
use weir_query::schema::EntitySchema;
use weir_query::source::InMemoryRowSource;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
}

impl Entity for Person {
    const NAME: &'static str = "person";
}

pub fn person(name: &str, age: i32) -> Person {
    Person {
        name: name.into(),
        age,
        email: None,
    }
}

pub fn age() -> Field<Person, i32> {
    Field::new("age", |p: &Person| p.age).unwrap()
}

pub fn name() -> Field<Person, String> {
    Field::new("name", |p: &Person| p.name.clone()).unwrap()
}

pub fn email() -> Field<Person, Option<String>> {
    Field::new("email", |p: &Person| p.email.clone()).unwrap()
}

pub fn schema() -> EntitySchema<Person> {
    EntitySchema::new().with(&age()).with(&name()).with(&email())
}

pub fn people(rows: impl IntoIterator<Item = Person>) -> InMemoryRowSource<Person> {
    InMemoryRowSource::new(schema()).with_rows(rows)
}

/// A row source whose execute call always fails.
pub struct FailingSource {
    pub attempts: Cell<usize>,
}

impl FailingSource {
    pub fn new() -> Self {
        Self {
            attempts: Cell::new(0),
        }
    }
}

impl RowSource for FailingSource {
    type Row = Person;
    type Cursor<'a> = std::vec::IntoIter<Person>;

    fn execute<'a>(&'a self, _query: &SourceQuery) -> Result<Self::Cursor<'a>, SourceError> {
        self.attempts.set(self.attempts.get() + 1);
        Err("connection refused".into())
    }
}

/// A row source that declines expressions and counts cursor releases.
pub struct CountingSource {
    pub rows: Vec<Person>,
    pub releases: Cell<usize>,
}

pub struct CountingCursor<'a> {
    rows: std::slice::Iter<'a, Person>,
    releases: &'a Cell<usize>,
}

impl Iterator for CountingCursor<'_> {
    type Item = Person;

    fn next(&mut self) -> Option<Person> {
        self.rows.next().cloned()
    }
}

impl RowCursor for CountingCursor<'_> {
    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }
}

impl RowSource for CountingSource {
    type Row = Person;
    type Cursor<'a> = CountingCursor<'a>;

    fn execute<'a>(&'a self, _query: &SourceQuery) -> Result<Self::Cursor<'a>, SourceError> {
        Ok(CountingCursor {
            rows: self.rows.iter(),
            releases: &self.releases,
        })
    }

    fn accepts_expressions(&self) -> bool {
        false
    }
}
