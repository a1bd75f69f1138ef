//! Standard renderers for each operator family.

use super::Rendered;
use crate::ast::{ColumnRef, Operator, OperatorFamily};
use weir_core::pattern_match::has_wildcards;
use weir_core::Value;

fn symbol(operator: Operator) -> Option<&'static str> {
    match operator {
        Operator::Equal => Some("="),
        Operator::NotEqual => Some("<>"),
        Operator::GreaterThan => Some(">"),
        Operator::GreaterOrEqual => Some(">="),
        Operator::LessThan => Some("<"),
        Operator::LessOrEqual => Some("<="),
        _ => None,
    }
}

/// Renders binary comparisons as `column <symbol> ?`.
///
/// Ordering comparisons over unordered types (bytes) are declined.
pub fn comparison(column: &ColumnRef, operator: Operator, operand: Option<&Value>) -> Option<Rendered> {
    if operator.is_ordering() && !column.data_type().is_orderable() {
        return None;
    }
    let symbol = symbol(operator)?;
    let operand = operand.filter(|v| !v.is_null())?;
    Some(Rendered::new(
        format!("{} {} ?", column.column(), symbol),
        vec![operand.clone()],
    ))
}

/// Renders pattern and case-insensitive matches.
///
/// `Contains`, `StartsWith` and `EndsWith` become `LIKE` patterns with the
/// wildcard on the open side(s). An operand that itself holds a wildcard
/// character is declined, since it would change the pattern's meaning.
pub fn string_match(column: &ColumnRef, operator: Operator, operand: Option<&Value>) -> Option<Rendered> {
    if operator.family() != OperatorFamily::StringMatch {
        return None;
    }
    let text = operand?.as_str()?;
    let name = column.column();
    let like = |pattern: String| {
        Some(Rendered::new(
            format!("{name} LIKE ?"),
            vec![Value::String(pattern)],
        ))
    };
    match operator {
        Operator::Contains | Operator::StartsWith | Operator::EndsWith if has_wildcards(text) => {
            None
        }
        Operator::Contains => like(format!("%{text}%")),
        Operator::StartsWith => like(format!("{text}%")),
        Operator::EndsWith => like(format!("%{text}")),
        Operator::EqualIgnoreCase => Some(Rendered::new(
            format!("UPPER({name}) = UPPER(?)"),
            vec![Value::String(text.into())],
        )),
        Operator::NotEqualIgnoreCase => Some(Rendered::new(
            format!("UPPER({name}) <> UPPER(?)"),
            vec![Value::String(text.into())],
        )),
        _ => None,
    }
}

/// Renders `IS NULL` / `IS NOT NULL`.
pub fn null_check(column: &ColumnRef, operator: Operator, operand: Option<&Value>) -> Option<Rendered> {
    if operand.is_some() {
        return None;
    }
    let keyword = match operator {
        Operator::IsNull => "IS NULL",
        Operator::IsNotNull => "IS NOT NULL",
        _ => return None,
    };
    Some(Rendered::new(
        format!("{} {}", column.column(), keyword),
        Vec::new(),
    ))
}

/// Renders sign checks as a comparison against the type's zero.
pub fn sign(column: &ColumnRef, operator: Operator, operand: Option<&Value>) -> Option<Rendered> {
    if operand.is_some() {
        return None;
    }
    let symbol = match operator {
        Operator::IsPositive => ">",
        Operator::IsNegative => "<",
        Operator::IsZero => "=",
        _ => return None,
    };
    let zero = Value::zero_of(column.data_type())?;
    Some(Rendered::new(
        format!("{} {} ?", column.column(), symbol),
        vec![zero],
    ))
}
