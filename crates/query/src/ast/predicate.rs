//! Predicate trees over entities.
//!
//! A predicate is either a leaf bound to a field (which a renderer can
//! translate), an AND/OR combination of predicates, or an opaque closure
//! that is only ever evaluated in memory.
//!
//! Trees are immutable once returned: combining predicates allocates a new
//! node that shares its children, so a sub-tree can be reused in several
//! combinations without either observing the other.

use crate::ast::field::ColumnRef;
use crate::ast::operator::Operator;
use core::fmt;
use std::rc::Rc;
use weir_core::Value;

/// Logical operators for combining predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// Returns the keyword used when joining children.
    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// A boolean test over an entity.
pub enum Predicate<E> {
    /// Leaf comparing one field against an operand.
    Field(Rc<FieldPredicate<E>>),
    /// AND/OR combination.
    Combined(Rc<CombinedPredicate<E>>),
    /// Arbitrary closure; never rendered.
    Opaque(Rc<dyn Fn(&E) -> bool>),
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Field(p) => Predicate::Field(Rc::clone(p)),
            Predicate::Combined(p) => Predicate::Combined(Rc::clone(p)),
            Predicate::Opaque(f) => Predicate::Opaque(Rc::clone(f)),
        }
    }
}

impl<E> Predicate<E> {
    pub(crate) fn from_field(leaf: FieldPredicate<E>) -> Self {
        Predicate::Field(Rc::new(leaf))
    }

    /// Wraps a closure as a predicate that is only evaluated in memory.
    pub fn from_fn(test: impl Fn(&E) -> bool + 'static) -> Self {
        Predicate::Opaque(Rc::new(test))
    }

    /// Evaluates the predicate against an entity.
    pub fn test(&self, entity: &E) -> bool {
        match self {
            Predicate::Field(p) => p.test(entity),
            Predicate::Combined(p) => p.test(entity),
            Predicate::Opaque(f) => f(entity),
        }
    }

    /// Returns `self AND other`, flattening nested conjunctions.
    pub fn and(&self, other: &Predicate<E>) -> Predicate<E> {
        CombinedPredicateBuilder::new(LogicalOp::And)
            .push(self)
            .push(other)
            .build()
    }

    /// Returns `self OR other`, flattening nested disjunctions.
    pub fn or(&self, other: &Predicate<E>) -> Predicate<E> {
        CombinedPredicateBuilder::new(LogicalOp::Or)
            .push(self)
            .push(other)
            .build()
    }

    /// Returns the leaf, if this is a field predicate.
    pub fn as_field(&self) -> Option<&FieldPredicate<E>> {
        match self {
            Predicate::Field(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the combinator, if this is a combined predicate.
    pub fn as_combined(&self) -> Option<&CombinedPredicate<E>> {
        match self {
            Predicate::Combined(p) => Some(p),
            _ => None,
        }
    }

    /// Returns true if this node is an opaque closure.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Predicate::Opaque(_))
    }

    /// Returns true if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Predicate<E>) -> bool {
        match (self, other) {
            (Predicate::Field(a), Predicate::Field(b)) => Rc::ptr_eq(a, b),
            (Predicate::Combined(a), Predicate::Combined(b)) => Rc::ptr_eq(a, b),
            (Predicate::Opaque(a), Predicate::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<E> fmt::Display for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Field(p) => fmt::Display::fmt(p, f),
            Predicate::Combined(p) => fmt::Display::fmt(p, f),
            Predicate::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({self})")
    }
}

/// A leaf predicate: `column operator [operand]`.
pub struct FieldPredicate<E> {
    column: ColumnRef,
    operator: Operator,
    operand: Option<Value>,
    comparator: Rc<dyn Fn(&E) -> bool>,
}

impl<E> FieldPredicate<E> {
    pub(crate) fn new(
        column: ColumnRef,
        operator: Operator,
        operand: Option<Value>,
        comparator: Rc<dyn Fn(&E) -> bool>,
    ) -> Self {
        Self {
            column,
            operator,
            operand,
            comparator,
        }
    }

    /// Returns the field this predicate reads.
    #[inline]
    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    #[inline]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operand, or `None` for unary operators.
    #[inline]
    pub fn operand(&self) -> Option<&Value> {
        self.operand.as_ref()
    }

    #[inline]
    pub fn test(&self, entity: &E) -> bool {
        (self.comparator)(entity)
    }
}

impl<E> fmt::Display for FieldPredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{} {} {}", self.column, self.operator, operand),
            None => write!(f, "{} {}", self.column, self.operator),
        }
    }
}

/// An AND/OR node over child predicates, in insertion order.
pub struct CombinedPredicate<E> {
    kind: LogicalOp,
    children: Vec<Predicate<E>>,
}

impl<E> CombinedPredicate<E> {
    #[inline]
    pub fn kind(&self) -> LogicalOp {
        self.kind
    }

    #[inline]
    pub fn children(&self) -> &[Predicate<E>] {
        &self.children
    }

    /// Evaluates the combination. An empty AND is true, an empty OR false.
    pub fn test(&self, entity: &E) -> bool {
        match self.kind {
            LogicalOp::And => self.children.iter().all(|c| c.test(entity)),
            LogicalOp::Or => self.children.iter().any(|c| c.test(entity)),
        }
    }
}

impl<E> fmt::Display for CombinedPredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.kind.keyword())?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

/// Accumulates children for a combinator, then freezes them into a node.
///
/// Pushing a combinator of the same kind splices in its children instead
/// of nesting it; children of another kind are kept as a single child.
pub struct CombinedPredicateBuilder<E> {
    kind: LogicalOp,
    children: Vec<Predicate<E>>,
}

impl<E> CombinedPredicateBuilder<E> {
    pub fn new(kind: LogicalOp) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// Adds a child, flattening a same-kind combinator.
    pub fn push(mut self, child: &Predicate<E>) -> Self {
        match child {
            Predicate::Combined(node) if node.kind == self.kind => {
                self.children.extend(node.children.iter().cloned());
            }
            other => self.children.push(other.clone()),
        }
        self
    }

    /// Adds every predicate from an iterator.
    pub fn extend<'a, I>(self, children: I) -> Self
    where
        I: IntoIterator<Item = &'a Predicate<E>>,
        E: 'a,
    {
        children.into_iter().fold(self, |builder, c| builder.push(c))
    }

    pub fn build(self) -> Predicate<E> {
        Predicate::Combined(Rc::new(CombinedPredicate {
            kind: self.kind,
            children: self.children,
        }))
    }
}
