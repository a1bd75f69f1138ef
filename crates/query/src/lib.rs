//! Weir Query - typed entity streams with filter pushdown.
//!
//! This crate provides:
//!
//! - `ast`: Typed fields, operators and predicate trees
//! - `pipeline`: Persistent, lazily evaluated operation pipelines
//! - `render`: Per-operator rendering of predicates into query fragments
//! - `optimizer`: Splitting a pipeline into a pushed prefix and a residual
//! - `executor`: The row-source contract and residual replay
//! - `stream`: The fluent `Stream` API
//! - `source`: Reference row sources (in-memory, key index)
//!
//! # Example
//!
//! ```rust
//! use weir_query::ast::{Entity, Field};
//! use weir_query::schema::EntitySchema;
//! use weir_query::source::InMemoryRowSource;
//! use weir_query::stream::StreamSource;
//!
//! #[derive(Clone)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Entity for Person {
//!     const NAME: &'static str = "person";
//! }
//!
//! let age = Field::new("age", |p: &Person| p.age)?;
//! let name = Field::new("name", |p: &Person| p.name.clone())?;
//! let people = InMemoryRowSource::new(EntitySchema::new().with(&age).with(&name)).with_rows([
//!     Person { name: "Ada".into(), age: 17 },
//!     Person { name: "Logan".into(), age: 30 },
//! ]);
//!
//! let stream = people.stream().filter(age.greater_or_equal(18));
//! assert_eq!(stream.explain().expression().as_deref(), Some("age >= ?"));
//!
//! let names = stream.map(|p| p.name).to_vec()?;
//! assert_eq!(names, vec!["Logan"]);
//! # Ok::<(), weir_core::Error>(())
//! ```

pub mod ast;
pub mod context;
pub mod executor;
pub mod optimizer;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod source;
pub mod stream;

pub use context::ExecutorConfig;
pub use stream::{Stream, StreamIter, StreamSource};
