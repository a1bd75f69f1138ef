//! Typed fields: addressable attributes of an entity.
//!
//! A `Field<E, V>` pairs a column name with an accessor returning the
//! attribute's Rust value. Predicates built from a field carry both the
//! in-memory comparator (the ground truth) and the `(column, operator,
//! operand)` triple a renderer turns into a query fragment.

use crate::ast::operator::{Operator, OperatorFamily};
use crate::ast::predicate::{FieldPredicate, Predicate};
use core::any::TypeId;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::rc::Rc;
use weir_core::{DataType, Error, Result, Value};

/// A row type that fields can be declared on.
pub trait Entity: 'static {
    /// Entity name, used in diagnostics and sent to row sources.
    const NAME: &'static str;
}

/// A Rust type that can back a field.
pub trait FieldValue: Clone + 'static {
    /// Store-level type of the value.
    const DATA_TYPE: DataType;
    /// Whether the field may hold null.
    const NULLABLE: bool = false;

    /// Converts to the dynamically typed form.
    fn to_value(&self) -> Value;

    /// Returns true for a null value.
    fn is_null(&self) -> bool {
        false
    }
}

/// Field values that support the comparison family.
pub trait Comparable: FieldValue {
    /// Operand type accepted by comparisons (never nullable).
    type Operand: FieldValue;

    /// Compares against an operand. `None` means the comparison is unknown
    /// (null column or unordered floats) and never matches.
    fn compare_to(&self, operand: &Self::Operand) -> Option<Ordering>;
}

/// Field values that support the string-match family.
pub trait TextValue: FieldValue {
    /// Returns the text, or `None` for null.
    fn text(&self) -> Option<&str>;
}

/// Field values that support sign checks.
pub trait NumericValue: FieldValue {
    /// Returns the sign relative to zero, or `None` when unknown.
    fn sign(&self) -> Option<Ordering>;
}

/// Milliseconds since the Unix epoch, stored as `DateTime`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

macro_rules! ordered_field_value {
    ($ty:ty, $dt:expr, $to_value:expr) => {
        impl FieldValue for $ty {
            const DATA_TYPE: DataType = $dt;

            fn to_value(&self) -> Value {
                #[allow(clippy::redundant_closure_call)]
                ($to_value)(self)
            }
        }

        impl Comparable for $ty {
            type Operand = $ty;

            fn compare_to(&self, operand: &$ty) -> Option<Ordering> {
                self.partial_cmp(operand)
            }
        }
    };
}

ordered_field_value!(bool, DataType::Boolean, |v: &bool| Value::Boolean(*v));
ordered_field_value!(i32, DataType::Int32, |v: &i32| Value::Int32(*v));
ordered_field_value!(i64, DataType::Int64, |v: &i64| Value::Int64(*v));
ordered_field_value!(f64, DataType::Float64, |v: &f64| Value::Float64(*v));
ordered_field_value!(String, DataType::String, |v: &String| Value::String(v.clone()));
ordered_field_value!(Vec<u8>, DataType::Bytes, |v: &Vec<u8>| Value::Bytes(v.clone()));
ordered_field_value!(Timestamp, DataType::DateTime, |v: &Timestamp| Value::DateTime(v.0));

impl<T: FieldValue> FieldValue for Option<T> {
    const DATA_TYPE: DataType = T::DATA_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn is_null(&self) -> bool {
        self.as_ref().map_or(true, FieldValue::is_null)
    }
}

impl<T: Comparable> Comparable for Option<T> {
    type Operand = T::Operand;

    fn compare_to(&self, operand: &Self::Operand) -> Option<Ordering> {
        self.as_ref()?.compare_to(operand)
    }
}

impl TextValue for String {
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: TextValue> TextValue for Option<T> {
    fn text(&self) -> Option<&str> {
        self.as_ref()?.text()
    }
}

impl NumericValue for i32 {
    fn sign(&self) -> Option<Ordering> {
        Some(self.cmp(&0))
    }
}

impl NumericValue for i64 {
    fn sign(&self) -> Option<Ordering> {
        Some(self.cmp(&0))
    }
}

impl NumericValue for f64 {
    fn sign(&self) -> Option<Ordering> {
        self.partial_cmp(&0.0)
    }
}

impl<T: NumericValue> NumericValue for Option<T> {
    fn sign(&self) -> Option<Ordering> {
        self.as_ref()?.sign()
    }
}

/// Type-erased identity of a field: which column of which entity.
///
/// Two references are equal if they name the same column of the same
/// entity type.
#[derive(Clone, Debug)]
pub struct ColumnRef {
    entity: &'static str,
    entity_type: TypeId,
    column: Rc<str>,
    data_type: DataType,
    nullable: bool,
}

impl ColumnRef {
    /// Returns the owning entity's name.
    #[inline]
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Returns the store-side column name.
    #[inline]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the column's data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns whether the column may hold null.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the normalized name (entity.column).
    pub fn normalized_name(&self) -> String {
        format!("{}.{}", self.entity, self.column)
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type && self.column == other.column
    }
}

impl Eq for ColumnRef {}

impl Hash for ColumnRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column)
    }
}

/// Checks that a column name can be rendered verbatim into a fragment.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(Error::validation("column name must not be empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(Error::validation(format!(
                "column name {name:?} must start with a letter or underscore"
            )))
        }
        Some(_) => {}
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "column name {name:?} may only contain letters, digits and underscores"
        )))
    }
}

/// A typed, addressable attribute of entity `E` holding values of type `V`.
pub struct Field<E, V> {
    column: ColumnRef,
    getter: fn(&E) -> V,
}

impl<E, V> Clone for Field<E, V> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            getter: self.getter,
        }
    }
}

impl<E, V> fmt::Debug for Field<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("column", &self.column).finish()
    }
}

impl<E: Entity, V: FieldValue> Field<E, V> {
    /// Declares a field.
    ///
    /// Fails with a validation error if `column` is not a plain SQL
    /// identifier, since it is rendered verbatim into query fragments.
    pub fn new(column: impl AsRef<str>, getter: fn(&E) -> V) -> Result<Self> {
        let column = column.as_ref();
        validate_identifier(column)?;
        Ok(Self {
            column: ColumnRef {
                entity: E::NAME,
                entity_type: TypeId::of::<E>(),
                column: Rc::from(column),
                data_type: V::DATA_TYPE,
                nullable: V::NULLABLE,
            },
            getter,
        })
    }

    /// Returns the field's identity.
    #[inline]
    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        self.column.column()
    }

    /// Extracts the typed value from an entity.
    #[inline]
    pub fn get_from(&self, entity: &E) -> V {
        (self.getter)(entity)
    }

    /// Extracts the value in its dynamically typed form.
    pub fn value_of(&self, entity: &E) -> Value {
        (self.getter)(entity).to_value()
    }

    /// Builds a predicate from an operator known only at run time.
    ///
    /// Validates arity and operand type before returning; the in-memory
    /// comparator works over `Value`s.
    pub fn predicate(&self, operator: Operator, operand: Option<Value>) -> Result<Predicate<E>> {
        let data_type = self.column.data_type();
        match (operator.is_unary(), &operand) {
            (true, Some(_)) => {
                return Err(Error::validation(format!(
                    "operator {operator} on {} takes no operand",
                    self.column.normalized_name()
                )))
            }
            (false, None) => {
                return Err(Error::validation(format!(
                    "operator {operator} on {} requires an operand",
                    self.column.normalized_name()
                )))
            }
            (false, Some(value)) if value.is_null() => {
                return Err(Error::validation(format!(
                    "operator {operator} on {} cannot compare against null",
                    self.column.normalized_name()
                )))
            }
            (false, Some(value)) if value.data_type() != Some(data_type) => {
                return Err(Error::validation(format!(
                    "operand {value} does not match {} of type {data_type}",
                    self.column.normalized_name()
                )))
            }
            _ => {}
        }

        let compatible = match operator.family() {
            OperatorFamily::Comparison => !operator.is_ordering() || data_type.is_orderable(),
            OperatorFamily::NullCheck => self.column.is_nullable(),
            OperatorFamily::Sign => data_type.is_numeric(),
            OperatorFamily::StringMatch => data_type == DataType::String,
        };
        if !compatible {
            return Err(Error::validation(format!(
                "operator {operator} does not apply to {} of type {data_type}",
                self.column.normalized_name()
            )));
        }

        let getter = self.getter;
        let bound = operand.clone();
        Ok(self.leaf(operator, operand, move |entity: &E| {
            operator.eval_value(&getter(entity).to_value(), bound.as_ref())
        }))
    }

    fn leaf(
        &self,
        operator: Operator,
        operand: Option<Value>,
        comparator: impl Fn(&E) -> bool + 'static,
    ) -> Predicate<E> {
        Predicate::from_field(FieldPredicate::new(
            self.column.clone(),
            operator,
            operand,
            Rc::new(comparator),
        ))
    }
}

impl<E: Entity, V: Comparable> Field<E, V> {
    fn compare(&self, operator: Operator, operand: V::Operand) -> Predicate<E> {
        let getter = self.getter;
        let value = operand.to_value();
        self.leaf(operator, Some(value), move |entity: &E| {
            getter(entity)
                .compare_to(&operand)
                .is_some_and(|ordering| operator.accepts(ordering))
        })
    }

    /// `field = operand`
    pub fn equal(&self, operand: impl Into<V::Operand>) -> Predicate<E> {
        self.compare(Operator::Equal, operand.into())
    }

    /// `field <> operand`
    pub fn not_equal(&self, operand: impl Into<V::Operand>) -> Predicate<E> {
        self.compare(Operator::NotEqual, operand.into())
    }

    /// `field > operand`
    pub fn greater_than(&self, operand: impl Into<V::Operand>) -> Predicate<E> {
        self.compare(Operator::GreaterThan, operand.into())
    }

    /// `field >= operand`
    pub fn greater_or_equal(&self, operand: impl Into<V::Operand>) -> Predicate<E> {
        self.compare(Operator::GreaterOrEqual, operand.into())
    }

    /// `field < operand`
    pub fn less_than(&self, operand: impl Into<V::Operand>) -> Predicate<E> {
        self.compare(Operator::LessThan, operand.into())
    }

    /// `field <= operand`
    pub fn less_or_equal(&self, operand: impl Into<V::Operand>) -> Predicate<E> {
        self.compare(Operator::LessOrEqual, operand.into())
    }
}

impl<E: Entity, V: TextValue> Field<E, V> {
    fn text_match(&self, operator: Operator, operand: String) -> Predicate<E> {
        let getter = self.getter;
        let value = Value::String(operand.clone());
        self.leaf(operator, Some(value), move |entity: &E| {
            getter(entity)
                .text()
                .is_some_and(|text| operator.matches_text(text, &operand))
        })
    }

    /// Case-sensitive substring match.
    pub fn contains(&self, operand: impl Into<String>) -> Predicate<E> {
        self.text_match(Operator::Contains, operand.into())
    }

    /// Case-sensitive prefix match.
    pub fn starts_with(&self, operand: impl Into<String>) -> Predicate<E> {
        self.text_match(Operator::StartsWith, operand.into())
    }

    /// Case-sensitive suffix match.
    pub fn ends_with(&self, operand: impl Into<String>) -> Predicate<E> {
        self.text_match(Operator::EndsWith, operand.into())
    }

    pub fn equal_ignore_case(&self, operand: impl Into<String>) -> Predicate<E> {
        self.text_match(Operator::EqualIgnoreCase, operand.into())
    }

    pub fn not_equal_ignore_case(&self, operand: impl Into<String>) -> Predicate<E> {
        self.text_match(Operator::NotEqualIgnoreCase, operand.into())
    }
}

impl<E: Entity, V: NumericValue> Field<E, V> {
    fn sign_check(&self, operator: Operator) -> Predicate<E> {
        let getter = self.getter;
        self.leaf(operator, None, move |entity: &E| {
            getter(entity)
                .sign()
                .is_some_and(|ordering| operator.accepts(ordering))
        })
    }

    /// `field > 0`
    pub fn is_positive(&self) -> Predicate<E> {
        self.sign_check(Operator::IsPositive)
    }

    /// `field < 0`
    pub fn is_negative(&self) -> Predicate<E> {
        self.sign_check(Operator::IsNegative)
    }

    /// `field = 0`
    pub fn is_zero(&self) -> Predicate<E> {
        self.sign_check(Operator::IsZero)
    }
}

impl<E: Entity, T: FieldValue> Field<E, Option<T>> {
    /// Matches entities whose field is null.
    pub fn is_null(&self) -> Predicate<E> {
        let getter = self.getter;
        self.leaf(Operator::IsNull, None, move |entity: &E| getter(entity).is_null())
    }

    /// Matches entities whose field is not null.
    pub fn is_not_null(&self) -> Predicate<E> {
        let getter = self.getter;
        self.leaf(Operator::IsNotNull, None, move |entity: &E| {
            !getter(entity).is_null()
        })
    }
}
