//! Parser and evaluator for rendered filter fragments.
//!
//! Supports the subset of SQL produced by the standard renderers:
//! - `col = ?`, `col <> ?`, `col < ?`, `col <= ?`, `col > ?`, `col >= ?`
//! - `UPPER(col) = UPPER(?)`
//! - `col LIKE ?`
//! - `col IS NULL`, `col IS NOT NULL`
//! - parenthesised groups joined by `AND` / `OR` (AND binds tighter)
//!
//! Parameters are positional: the n-th `?` binds the n-th parameter.

use crate::ast::Operator;
use crate::schema::EntitySchema;
use thiserror::Error;
use weir_core::pattern_match::like;
use weir_core::Value;

/// Errors raised while parsing or binding a fragment.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum FragmentError {
    #[error("syntax error at {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("expected {expected} parameters, got {actual}")]
    ParameterCount { expected: usize, actual: usize },
}

impl FragmentError {
    fn syntax(message: impl Into<String>, position: usize) -> Self {
        FragmentError::Syntax {
            message: message.into(),
            position,
        }
    }
}

/// A column reference, optionally wrapped in `UPPER(...)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Operand {
    pub column: String,
    pub upper: bool,
}

/// A parsed condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    /// `lhs op ?`; `upper_param` marks `UPPER(?)`.
    Compare {
        lhs: Operand,
        op: Operator,
        param: usize,
        upper_param: bool,
    },
    Like {
        column: String,
        param: usize,
    },
    Null {
        column: String,
        negated: bool,
    },
}

/// A parsed fragment ready to be evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    condition: Condition,
    parameters: usize,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    parameters: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            parameters: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FragmentError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(FragmentError::syntax(
                format!("expected '{expected}', found '{c}'"),
                self.pos,
            )),
            None => Err(FragmentError::syntax(
                format!("expected '{expected}', found end of input"),
                self.pos,
            )),
        }
    }

    fn identifier(&mut self) -> Result<&'a str, FragmentError> {
        let input = self.input;
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(FragmentError::syntax("expected identifier", self.pos));
        }
        Ok(&input[start..self.pos])
    }

    /// Consumes `keyword` (case-insensitive) if it comes next.
    fn keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        match self.identifier() {
            Ok(word) if word.eq_ignore_ascii_case(keyword) => true,
            _ => {
                self.pos = saved;
                false
            }
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), FragmentError> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(FragmentError::syntax(format!("expected {keyword}"), self.pos))
        }
    }

    fn placeholder(&mut self) -> Result<usize, FragmentError> {
        self.expect('?')?;
        let index = self.parameters;
        self.parameters += 1;
        Ok(index)
    }

    fn parse_or(&mut self) -> Result<Condition, FragmentError> {
        let mut terms = vec![self.parse_and()?];
        while self.keyword("OR") {
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Condition::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Condition, FragmentError> {
        let mut terms = vec![self.parse_primary()?];
        while self.keyword("AND") {
            terms.push(self.parse_primary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Condition::And(terms)
        })
    }

    fn parse_primary(&mut self) -> Result<Condition, FragmentError> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(')')?;
            return Ok(inner);
        }

        let lhs = self.parse_operand()?;
        if self.keyword("LIKE") {
            if lhs.upper {
                return Err(FragmentError::syntax("LIKE on UPPER()", self.pos));
            }
            let param = self.placeholder()?;
            return Ok(Condition::Like {
                column: lhs.column,
                param,
            });
        }
        if self.keyword("IS") {
            let negated = self.keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Condition::Null {
                column: lhs.column,
                negated,
            });
        }

        let op = self.parse_comparison()?;
        self.skip_whitespace();
        let upper_param = self.keyword("UPPER");
        let param = if upper_param {
            self.expect('(')?;
            let param = self.placeholder()?;
            self.expect(')')?;
            param
        } else {
            self.placeholder()?
        };
        Ok(Condition::Compare {
            lhs,
            op,
            param,
            upper_param,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, FragmentError> {
        let word = self.identifier()?;
        self.skip_whitespace();
        if word.eq_ignore_ascii_case("UPPER") && self.peek() == Some('(') {
            self.advance();
            let column = self.identifier()?.to_string();
            self.expect(')')?;
            return Ok(Operand {
                column,
                upper: true,
            });
        }
        Ok(Operand {
            column: word.to_string(),
            upper: false,
        })
    }

    fn parse_comparison(&mut self) -> Result<Operator, FragmentError> {
        self.skip_whitespace();
        let start = self.pos;
        let op = match self.peek() {
            Some('=') => {
                self.advance();
                Operator::Equal
            }
            Some('<') => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        Operator::LessOrEqual
                    }
                    Some('>') => {
                        self.advance();
                        Operator::NotEqual
                    }
                    _ => Operator::LessThan,
                }
            }
            Some('>') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Operator::GreaterOrEqual
                } else {
                    Operator::GreaterThan
                }
            }
            _ => return Err(FragmentError::syntax("expected comparison operator", start)),
        };
        Ok(op)
    }
}

impl Fragment {
    /// Parses a fragment.
    pub fn parse(input: &str) -> Result<Self, FragmentError> {
        let mut parser = Parser::new(input);
        let condition = parser.parse_or()?;
        parser.skip_whitespace();
        if parser.pos < input.len() {
            return Err(FragmentError::syntax("unexpected trailing input", parser.pos));
        }
        Ok(Self {
            condition,
            parameters: parser.parameters,
        })
    }

    /// Returns the number of `?` slots.
    pub fn parameter_count(&self) -> usize {
        self.parameters
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Checks that every column exists and the parameter count matches.
    pub fn bind<E>(&self, schema: &EntitySchema<E>, params: &[Value]) -> Result<(), FragmentError>
    where
        E: crate::ast::Entity,
    {
        if params.len() != self.parameters {
            return Err(FragmentError::ParameterCount {
                expected: self.parameters,
                actual: params.len(),
            });
        }
        check_columns(&self.condition, schema)
    }

    /// Evaluates the fragment against one entity.
    ///
    /// Assumes `bind` succeeded; an unknown column reads as null.
    pub fn matches<E>(&self, entity: &E, schema: &EntitySchema<E>, params: &[Value]) -> bool
    where
        E: crate::ast::Entity,
    {
        eval(&self.condition, entity, schema, params)
    }
}

fn check_columns<E: crate::ast::Entity>(
    condition: &Condition,
    schema: &EntitySchema<E>,
) -> Result<(), FragmentError> {
    let column = match condition {
        Condition::And(terms) | Condition::Or(terms) => {
            return terms.iter().try_for_each(|t| check_columns(t, schema));
        }
        Condition::Compare { lhs, .. } => &lhs.column,
        Condition::Like { column, .. } | Condition::Null { column, .. } => column,
    };
    if schema.contains(column) {
        Ok(())
    } else {
        Err(FragmentError::UnknownColumn(column.clone()))
    }
}

fn upper(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_uppercase()),
        _ => Value::Null,
    }
}

fn eval<E: crate::ast::Entity>(
    condition: &Condition,
    entity: &E,
    schema: &EntitySchema<E>,
    params: &[Value],
) -> bool {
    let read = |column: &str| schema.value(entity, column).unwrap_or(Value::Null);
    match condition {
        Condition::And(terms) => terms.iter().all(|t| eval(t, entity, schema, params)),
        Condition::Or(terms) => terms.iter().any(|t| eval(t, entity, schema, params)),
        Condition::Compare {
            lhs,
            op,
            param,
            upper_param,
        } => {
            let Some(param) = params.get(*param) else {
                return false;
            };
            let mut value = read(&lhs.column);
            if lhs.upper {
                value = upper(value);
            }
            let operand = if *upper_param {
                upper(param.clone())
            } else {
                param.clone()
            };
            op.eval_value(&value, Some(&operand))
        }
        Condition::Like { column, param } => {
            let value = read(column);
            match (value.as_str(), params.get(*param).and_then(Value::as_str)) {
                (Some(text), Some(pattern)) => like(text, pattern),
                _ => false,
            }
        }
        Condition::Null { column, negated } => read(column).is_null() != *negated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Entity, Field};

    struct Person {
        name: String,
        age: i32,
        email: Option<String>,
    }

    impl Entity for Person {
        const NAME: &'static str = "person";
    }

    fn schema() -> EntitySchema<Person> {
        EntitySchema::new()
            .with(&Field::new("name", |p: &Person| p.name.clone()).unwrap())
            .with(&Field::new("age", |p: &Person| p.age).unwrap())
            .with(&Field::new("email", |p: &Person| p.email.clone()).unwrap())
    }

    fn person(name: &str, age: i32, email: Option<&str>) -> Person {
        Person {
            name: name.into(),
            age,
            email: email.map(String::from),
        }
    }

    #[test]
    fn test_parse_simple() {
        let f = Fragment::parse("age >= ?").unwrap();
        assert_eq!(f.parameter_count(), 1);
        assert_eq!(
            f.condition(),
            &Condition::Compare {
                lhs: Operand {
                    column: "age".into(),
                    upper: false
                },
                op: Operator::GreaterOrEqual,
                param: 0,
                upper_param: false,
            }
        );
    }

    #[test]
    fn test_parse_groups() {
        let f = Fragment::parse("((age > ? AND name LIKE ?) OR email IS NOT NULL)").unwrap();
        assert_eq!(f.parameter_count(), 2);
        let Condition::Or(terms) = f.condition() else {
            panic!("expected OR");
        };
        assert_eq!(terms.len(), 2);
        assert!(matches!(&terms[0], Condition::And(inner) if inner.len() == 2));
        assert_eq!(
            terms[1],
            Condition::Null {
                column: "email".into(),
                negated: true
            }
        );
    }

    #[test]
    fn test_and_binds_tighter() {
        let f = Fragment::parse("age = ? OR age = ? AND name = ?").unwrap();
        let Condition::Or(terms) = f.condition() else {
            panic!("expected OR");
        };
        assert!(matches!(&terms[1], Condition::And(_)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Fragment::parse("age >"),
            Err(FragmentError::Syntax { .. })
        ));
        assert!(Fragment::parse("age ! ?").is_err());
        assert!(Fragment::parse("(age = ?").is_err());
        assert!(Fragment::parse("age = ? extra").is_err());
        assert!(Fragment::parse("email IS NOTHING").is_err());
    }

    #[test]
    fn test_bind_validates() {
        let f = Fragment::parse("height > ?").unwrap();
        assert_eq!(
            f.bind(&schema(), &[Value::Int32(1)]),
            Err(FragmentError::UnknownColumn("height".into()))
        );
        let f = Fragment::parse("age > ? AND age < ?").unwrap();
        assert_eq!(
            f.bind(&schema(), &[Value::Int32(1)]),
            Err(FragmentError::ParameterCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_evaluation() {
        let s = schema();
        let logan = person("Logan", 30, Some("l@x"));
        let bob = person("Bob", 17, None);

        let f = Fragment::parse("age >= ?").unwrap();
        let params = [Value::Int32(18)];
        assert!(f.matches(&logan, &s, &params));
        assert!(!f.matches(&bob, &s, &params));

        let f = Fragment::parse("name LIKE ?").unwrap();
        let params = [Value::from("%an%")];
        assert!(f.matches(&logan, &s, &params));
        assert!(!f.matches(&bob, &s, &params));

        let f = Fragment::parse("UPPER(name) = UPPER(?)").unwrap();
        assert!(f.matches(&bob, &s, &[Value::from("bOB")]));

        let f = Fragment::parse("email IS NULL").unwrap();
        assert!(f.matches(&bob, &s, &[]));
        assert!(!f.matches(&logan, &s, &[]));
    }

    #[test]
    fn test_null_never_matches_comparison() {
        let s = schema();
        let bob = person("Bob", 17, None);
        for sql in ["email = ?", "email <> ?", "UPPER(email) <> UPPER(?)", "email LIKE ?"] {
            let f = Fragment::parse(sql).unwrap();
            assert!(!f.matches(&bob, &s, &[Value::from("x")]), "{sql}");
        }
    }
}
