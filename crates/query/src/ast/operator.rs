//! Comparison operators usable against a field.

use core::cmp::Ordering;
use core::fmt;
use weir_core::Value;

/// Operator families. Renderers are registered per family and data type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    /// Binary comparisons over any ordered type.
    Comparison,
    /// `IS NULL` / `IS NOT NULL`.
    NullCheck,
    /// Sign checks over numeric types.
    Sign,
    /// Binary pattern and case-insensitive matches over strings.
    StringMatch,
}

/// Comparison kinds a predicate can apply to a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    // Comparison
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    // Null checks
    IsNull,
    IsNotNull,
    // Sign
    IsPositive,
    IsNegative,
    IsZero,
    // String
    Contains,
    StartsWith,
    EndsWith,
    EqualIgnoreCase,
    NotEqualIgnoreCase,
}

impl Operator {
    /// Returns the family this operator belongs to.
    pub fn family(&self) -> OperatorFamily {
        match self {
            Operator::Equal
            | Operator::NotEqual
            | Operator::GreaterThan
            | Operator::GreaterOrEqual
            | Operator::LessThan
            | Operator::LessOrEqual => OperatorFamily::Comparison,
            Operator::IsNull | Operator::IsNotNull => OperatorFamily::NullCheck,
            Operator::IsPositive | Operator::IsNegative | Operator::IsZero => OperatorFamily::Sign,
            Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::EqualIgnoreCase
            | Operator::NotEqualIgnoreCase => OperatorFamily::StringMatch,
        }
    }

    /// Returns true if the operator takes no operand.
    pub fn is_unary(&self) -> bool {
        matches!(
            self.family(),
            OperatorFamily::NullCheck | OperatorFamily::Sign
        )
    }

    /// Returns true if the operator needs an ordering, not just equality.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::GreaterThan
                | Operator::GreaterOrEqual
                | Operator::LessThan
                | Operator::LessOrEqual
        )
    }

    /// Decides a comparison or sign check from `value.cmp(operand)`.
    ///
    /// Sign checks compare the value against zero. Returns false for
    /// operators outside these two families.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal | Operator::IsZero => ordering == Ordering::Equal,
            Operator::NotEqual => ordering != Ordering::Equal,
            Operator::GreaterThan | Operator::IsPositive => ordering == Ordering::Greater,
            Operator::GreaterOrEqual => ordering != Ordering::Less,
            Operator::LessThan | Operator::IsNegative => ordering == Ordering::Less,
            Operator::LessOrEqual => ordering != Ordering::Greater,
            Operator::IsNull
            | Operator::IsNotNull
            | Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::EqualIgnoreCase
            | Operator::NotEqualIgnoreCase => false,
        }
    }

    /// Applies a string operator to two strings.
    ///
    /// Returns false for non-string operators.
    pub fn matches_text(&self, value: &str, operand: &str) -> bool {
        match self {
            Operator::Contains => value.contains(operand),
            Operator::StartsWith => value.starts_with(operand),
            Operator::EndsWith => value.ends_with(operand),
            Operator::EqualIgnoreCase => value.to_uppercase() == operand.to_uppercase(),
            Operator::NotEqualIgnoreCase => value.to_uppercase() != operand.to_uppercase(),
            _ => false,
        }
    }

    /// Evaluates the operator over dynamically typed values.
    ///
    /// A null column value only satisfies `IsNull`; a comparison against
    /// a value of another type never matches.
    pub fn eval_value(&self, value: &Value, operand: Option<&Value>) -> bool {
        match self.family() {
            OperatorFamily::NullCheck => match self {
                Operator::IsNull => value.is_null(),
                _ => !value.is_null(),
            },
            OperatorFamily::Sign => {
                let zero = value.data_type().and_then(Value::zero_of);
                match zero {
                    Some(zero) if !is_nan(value) => self.accepts(value.cmp(&zero)),
                    _ => false,
                }
            }
            OperatorFamily::Comparison => match operand {
                Some(operand)
                    if !value.is_null()
                        && value.data_type() == operand.data_type()
                        && !is_nan(value)
                        && !is_nan(operand) =>
                {
                    self.accepts(value.cmp(operand))
                }
                _ => false,
            },
            OperatorFamily::StringMatch => match (value.as_str(), operand.and_then(Value::as_str)) {
                (Some(value), Some(operand)) => self.matches_text(value, operand),
                _ => false,
            },
        }
    }

    /// Returns the keyword used when displaying a predicate.
    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::IsPositive => "IS POSITIVE",
            Operator::IsNegative => "IS NEGATIVE",
            Operator::IsZero => "IS ZERO",
            Operator::Contains => "CONTAINS",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::EqualIgnoreCase => "EQUALS IGNORE CASE",
            Operator::NotEqualIgnoreCase => "NOT EQUALS IGNORE CASE",
        }
    }
}

/// Unordered floats never satisfy a comparison.
fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Float64(f) if f.is_nan())
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
