//! Persistent operation pipelines.
//!
//! A pipeline is an immutable singly linked list of operations, newest
//! first. Appending allocates one node that points at the previous tail,
//! so two pipelines branched from a common prefix share it without copying
//! and the prefix stays valid and unchanged.

mod operation;

pub use operation::{
    DistinctOp, DistinctTracker, Element, ElementIter, FilterOp, Operation, SortOp,
};

use core::fmt;
use core::marker::PhantomData;
use std::rc::Rc;

struct PipelineNode {
    prev: Option<Rc<PipelineNode>>,
    operation: Rc<Operation>,
}

/// An ordered recipe of lazy operations over a source of `S`.
///
/// Building a pipeline evaluates nothing.
pub struct Pipeline<S> {
    tail: Option<Rc<PipelineNode>>,
    len: usize,
    _source: PhantomData<fn() -> S>,
}

impl<S> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            tail: self.tail.clone(),
            len: self.len,
            _source: PhantomData,
        }
    }
}

impl<S> Default for Pipeline<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Pipeline<S> {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self {
            tail: None,
            len: 0,
            _source: PhantomData,
        }
    }

    /// Returns a new pipeline with `operation` appended.
    pub(crate) fn append(&self, operation: Operation) -> Self {
        Self {
            tail: Some(Rc::new(PipelineNode {
                prev: self.tail.clone(),
                operation: Rc::new(operation),
            })),
            len: self.len + 1,
            _source: PhantomData,
        }
    }

    /// Returns the operations in execution order.
    pub fn operations(&self) -> Vec<Rc<Operation>> {
        let mut ops = Vec::with_capacity(self.len);
        let mut node = self.tail.as_deref();
        while let Some(n) = node {
            ops.push(Rc::clone(&n.operation));
            node = n.prev.as_deref();
        }
        ops.reverse();
        ops
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<S> fmt::Display for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, op) in self.operations().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{op}")?;
        }
        f.write_str("]")
    }
}

impl<S> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pipeline{self}")
    }
}
