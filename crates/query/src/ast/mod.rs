//! AST module for fields, operators and predicates.

mod field;
mod foreign_key;
mod operator;
mod predicate;

pub use field::{
    ColumnRef, Comparable, Entity, Field, FieldValue, NumericValue, TextValue, Timestamp,
};
pub use foreign_key::ForeignKeyField;
pub use operator::{Operator, OperatorFamily};
pub use predicate::{
    CombinedPredicate, CombinedPredicateBuilder, FieldPredicate, LogicalOp, Predicate,
};
