//! Weir Core - value types and errors shared by the Weir crates.
//!
//! This crate provides the foundational types for typed entity streams:
//!
//! - `DataType`: Store-level data types (Boolean, Int32, Int64, Float64, String, DateTime, Bytes)
//! - `Value`: Dynamically typed values, used for operands and bound parameters
//! - `pattern_match`: LIKE matching shared by renderers and in-memory row sources
//! - `Error`: Error types for construction and execution
//!
//! # Example
//!
//! ```rust
//! use weir_core::{DataType, Value};
//!
//! let age = Value::from(30i32);
//! assert_eq!(age.data_type(), Some(DataType::Int32));
//! assert!(Value::Null < age);
//! ```

mod error;
pub mod pattern_match;
mod types;
mod value;

pub use error::{Error, Result, SourceError};
pub use types::DataType;
pub use value::Value;
