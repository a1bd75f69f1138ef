//! The fluent stream API.
//!
//! A `Stream` is a persistent pipeline bound to a row source. Intermediate
//! operations return a new stream sharing the existing pipeline, so a
//! stream can serve as the common prefix of several branches. Nothing runs
//! until a terminal operation is called.
//!
//! ```ignore
//! let adults = people
//!     .stream()
//!     .filter(age.greater_or_equal(18))
//!     .sorted_by_key(|p| p.name.clone())
//!     .to_vec()?;
//! ```
//!
//! A stream is single-use: terminal operations consume it, and clones
//! share its consumed state, so a terminal call on a clone of a consumed
//! stream fails with an illegal-state error.

use crate::ast::Predicate;
use crate::context::ExecutorConfig;
use crate::executor::{RowSource, StreamExecutor};
use crate::optimizer::PushPlan;
use crate::pipeline::{ElementIter, Operation, Pipeline};
use core::cell::Cell;
use core::cmp::Ordering;
use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;
use std::rc::Rc;
use weir_core::{Error, Result};

/// A lazily evaluated sequence of `T` drawn from row source `R`.
///
/// Intermediate operations never fail. Deriving from a consumed stream
/// yields a stream that is itself consumed, and the `IllegalState` error
/// is reported by its terminal operation.
pub struct Stream<'s, R: RowSource, T = <R as RowSource>::Row> {
    source: &'s R,
    pipeline: Pipeline<R::Row>,
    config: ExecutorConfig,
    consumed: Rc<Cell<bool>>,
    _item: PhantomData<fn() -> T>,
}

impl<R: RowSource, T> Clone for Stream<'_, R, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            pipeline: self.pipeline.clone(),
            config: self.config.clone(),
            consumed: Rc::clone(&self.consumed),
            _item: PhantomData,
        }
    }
}

impl<'s, R: RowSource> Stream<'s, R> {
    /// Creates a stream over every row of `source`.
    pub fn new(source: &'s R, config: ExecutorConfig) -> Self {
        Self {
            source,
            pipeline: Pipeline::new(),
            config,
            consumed: Rc::new(Cell::new(false)),
            _item: PhantomData,
        }
    }
}

impl<'s, R: RowSource, T: 'static> Stream<'s, R, T> {
    fn then<U>(&self, operation: Operation) -> Stream<'s, R, U> {
        Stream {
            source: self.source,
            pipeline: self.pipeline.append(operation),
            config: self.config.clone(),
            consumed: Rc::new(Cell::new(self.consumed.get())),
            _item: PhantomData,
        }
    }

    /// Returns the pipeline built so far.
    pub fn pipeline(&self) -> &Pipeline<R::Row> {
        &self.pipeline
    }

    /// Returns a stream with a different executor configuration.
    pub fn with_config(&self, config: ExecutorConfig) -> Self {
        Stream {
            source: self.source,
            pipeline: self.pipeline.clone(),
            config,
            consumed: Rc::new(Cell::new(self.consumed.get())),
            _item: PhantomData,
        }
    }

    /// Keeps elements matching `predicate`. Leading filters built from
    /// fields may be evaluated by the row source.
    pub fn filter(&self, predicate: Predicate<T>) -> Self {
        self.then(Operation::filter(predicate))
    }

    /// Keeps elements for which `test` returns true. Always runs in memory.
    pub fn filter_fn(&self, test: impl Fn(&T) -> bool + 'static) -> Self {
        self.filter(Predicate::from_fn(test))
    }

    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<'s, R, U> {
        self.then(Operation::map(f))
    }

    pub fn flat_map<U, I>(&self, f: impl Fn(T) -> I + 'static) -> Stream<'s, R, U>
    where
        U: 'static,
        I: IntoIterator<Item = U> + 'static,
        I::IntoIter: 'static,
    {
        self.then(Operation::flat_map(f))
    }

    /// Sorts by natural order. The sort is stable.
    pub fn sorted(&self) -> Self
    where
        T: Ord,
    {
        self.then(Operation::sorted(|a: &T, b: &T| a.cmp(b), true))
    }

    /// Sorts with a comparator. The sort is stable.
    pub fn sorted_by(&self, compare: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        self.then(Operation::sorted(compare, false))
    }

    /// Sorts by a key. The sort is stable.
    pub fn sorted_by_key<K: Ord + 'static>(&self, key: impl Fn(&T) -> K + 'static) -> Self {
        self.then(Operation::sorted(move |a: &T, b: &T| key(a).cmp(&key(b)), false))
    }

    /// Drops elements equal to an earlier one, keeping first occurrences.
    pub fn distinct(&self) -> Self
    where
        T: Eq + Hash + Clone,
    {
        self.then(Operation::distinct::<T>())
    }

    /// Keeps at most `n` elements.
    pub fn limit(&self, n: usize) -> Self {
        self.then(Operation::Limit(n))
    }

    /// Drops the first `n` elements.
    pub fn skip(&self, n: usize) -> Self {
        self.then(Operation::Skip(n))
    }

    /// Calls `action` on each element as it passes.
    pub fn peek(&self, action: impl Fn(&T) + 'static) -> Self {
        self.then(Operation::peek(action))
    }

    /// Shows how the pipeline would be split, without executing it.
    pub fn explain(&self) -> PushPlan {
        StreamExecutor::new(self.source, self.config.clone()).plan(&self.pipeline)
    }

    /// Returns true once a terminal operation has run on this stream or a
    /// clone of it.
    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }

    fn consume(&self) -> Result<()> {
        if self.consumed.replace(true) {
            return Err(Error::illegal_state(format!(
                "stream over {} has already been consumed",
                <R::Row as crate::ast::Entity>::NAME
            )));
        }
        Ok(())
    }

    /// Executes the stream and returns an iterator over the results.
    ///
    /// The row source's cursor is held until the iterator is dropped.
    pub fn iter(self) -> Result<StreamIter<'s, T>> {
        self.consume()?;
        let inner = StreamExecutor::new(self.source, self.config).execute(&self.pipeline)?;
        Ok(StreamIter {
            inner,
            _item: PhantomData,
        })
    }

    pub fn for_each(self, f: impl FnMut(T)) -> Result<()> {
        self.iter()?.for_each(f);
        Ok(())
    }

    pub fn collect<C: FromIterator<T>>(self) -> Result<C> {
        Ok(self.iter()?.collect())
    }

    pub fn to_vec(self) -> Result<Vec<T>> {
        self.collect()
    }

    pub fn count(self) -> Result<usize> {
        Ok(self.iter()?.count())
    }

    /// Returns true if any element matches. Stops at the first match.
    pub fn any_match(self, mut test: impl FnMut(&T) -> bool) -> Result<bool> {
        Ok(self.iter()?.any(|t| test(&t)))
    }

    /// Returns true if every element matches. Stops at the first mismatch.
    pub fn all_match(self, mut test: impl FnMut(&T) -> bool) -> Result<bool> {
        Ok(self.iter()?.all(|t| test(&t)))
    }

    pub fn none_match(self, test: impl FnMut(&T) -> bool) -> Result<bool> {
        self.any_match(test).map(|any| !any)
    }

    pub fn find_first(self) -> Result<Option<T>> {
        Ok(self.iter()?.next())
    }

    /// Returns some element. Execution is sequential, so this is the first.
    pub fn find_any(self) -> Result<Option<T>> {
        self.find_first()
    }

    /// Returns the minimum. The first of several equal minima wins.
    pub fn min(self) -> Result<Option<T>>
    where
        T: Ord,
    {
        Ok(self.iter()?.min())
    }

    /// Returns the maximum. The last of several equal maxima wins.
    pub fn max(self) -> Result<Option<T>>
    where
        T: Ord,
    {
        Ok(self.iter()?.max())
    }

    pub fn min_by(self, compare: impl FnMut(&T, &T) -> Ordering) -> Result<Option<T>> {
        Ok(self.iter()?.min_by(compare))
    }

    pub fn max_by(self, compare: impl FnMut(&T, &T) -> Ordering) -> Result<Option<T>> {
        Ok(self.iter()?.max_by(compare))
    }

    /// Combines elements pairwise; `None` for an empty stream.
    pub fn reduce(self, f: impl FnMut(T, T) -> T) -> Result<Option<T>> {
        Ok(self.iter()?.reduce(f))
    }

    pub fn fold<A>(self, init: A, f: impl FnMut(A, T) -> A) -> Result<A> {
        Ok(self.iter()?.fold(init, f))
    }
}

impl<R: RowSource, T: 'static> fmt::Debug for Stream<'_, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("entity", &<R::Row as crate::ast::Entity>::NAME)
            .field("pipeline", &self.pipeline)
            .field("consumed", &self.consumed.get())
            .finish()
    }
}

/// Iterator over the results of an executed stream.
pub struct StreamIter<'s, T> {
    inner: ElementIter<'s>,
    _item: PhantomData<fn() -> T>,
}

impl<T: 'static> Iterator for StreamIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner
            .by_ref()
            .find_map(|e| e.downcast::<T>().ok().map(|t| *t))
    }
}

/// Opens streams on a row source.
pub trait StreamSource: RowSource + Sized {
    /// Starts a stream over every row with the default configuration.
    fn stream(&self) -> Stream<'_, Self> {
        Stream::new(self, ExecutorConfig::default())
    }

    fn stream_with(&self, config: ExecutorConfig) -> Stream<'_, Self> {
        Stream::new(self, config)
    }
}

impl<R: RowSource> StreamSource for R {}
