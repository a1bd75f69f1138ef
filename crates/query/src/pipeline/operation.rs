//! Pipeline operations.
//!
//! Elements flowing through a pipeline are type-erased (`Box<dyn Any>`) so
//! that one pipeline can hold steps whose element type changes along the
//! way. Typing is enforced by the `Stream` builder that creates these
//! operations; a downcast that fails here indicates a construction bug and
//! degrades to a no-op rather than panicking.

use crate::ast::Predicate;
use core::any::Any;
use core::cmp::Ordering;
use core::fmt;
use core::hash::Hash;
use hashbrown::HashSet;
use std::rc::Rc;

/// A type-erased pipeline element.
pub type Element = Box<dyn Any>;

/// A lazy sequence of type-erased elements.
pub type ElementIter<'a> = Box<dyn Iterator<Item = Element> + 'a>;

type TestFn = Rc<dyn Fn(&dyn Any) -> bool>;
type MapFn = Rc<dyn Fn(Element) -> Element>;
type FlatMapFn = Rc<dyn Fn(Element) -> ElementIter<'static>>;
type CompareFn = Rc<dyn Fn(&dyn Any, &dyn Any) -> Ordering>;
type PeekFn = Rc<dyn Fn(&dyn Any)>;

/// Per-execution state of a `distinct` step.
pub type DistinctTracker = Box<dyn FnMut(&dyn Any) -> bool>;

/// A single lazy step of a pipeline.
pub enum Operation {
    Filter(FilterOp),
    Map(MapFn),
    FlatMap(FlatMapFn),
    Sorted(SortOp),
    Distinct(DistinctOp),
    Limit(usize),
    Skip(usize),
    Peek(PeekFn),
}

impl Operation {
    pub(crate) fn filter<T: 'static>(predicate: Predicate<T>) -> Self {
        let description = predicate.to_string();
        let test_pred = predicate.clone();
        Operation::Filter(FilterOp {
            predicate: Rc::new(predicate),
            test: Rc::new(move |element: &dyn Any| {
                element
                    .downcast_ref::<T>()
                    .is_some_and(|e| test_pred.test(e))
            }),
            description,
        })
    }

    pub(crate) fn map<T: 'static, U: 'static>(f: impl Fn(T) -> U + 'static) -> Self {
        Operation::Map(Rc::new(move |element: Element| match element.downcast::<T>() {
            Ok(value) => Box::new(f(*value)) as Element,
            Err(element) => element,
        }))
    }

    pub(crate) fn flat_map<T, U, I>(f: impl Fn(T) -> I + 'static) -> Self
    where
        T: 'static,
        U: 'static,
        I: IntoIterator<Item = U> + 'static,
        I::IntoIter: 'static,
    {
        Operation::FlatMap(Rc::new(move |element: Element| match element.downcast::<T>() {
            Ok(value) => Box::new(f(*value).into_iter().map(|u| Box::new(u) as Element))
                as ElementIter<'static>,
            Err(_) => Box::new(core::iter::empty()),
        }))
    }

    pub(crate) fn sorted<T: 'static>(
        compare: impl Fn(&T, &T) -> Ordering + 'static,
        natural: bool,
    ) -> Self {
        Operation::Sorted(SortOp {
            compare: Rc::new(move |a: &dyn Any, b: &dyn Any| {
                match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                    (Some(a), Some(b)) => compare(a, b),
                    _ => Ordering::Equal,
                }
            }),
            natural,
        })
    }

    pub(crate) fn distinct<T: Eq + Hash + Clone + 'static>() -> Self {
        Operation::Distinct(DistinctOp {
            tracker: Rc::new(|| -> DistinctTracker {
                let mut seen: HashSet<T> = HashSet::new();
                Box::new(move |element: &dyn Any| {
                    element
                        .downcast_ref::<T>()
                        .map_or(true, |e| seen.insert(e.clone()))
                })
            }),
        })
    }

    pub(crate) fn peek<T: 'static>(action: impl Fn(&T) + 'static) -> Self {
        Operation::Peek(Rc::new(move |element: &dyn Any| {
            if let Some(e) = element.downcast_ref::<T>() {
                action(e);
            }
        }))
    }

    /// Returns the filter step, if this is one.
    pub fn as_filter(&self) -> Option<&FilterOp> {
        match self {
            Operation::Filter(filter) => Some(filter),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Filter(filter) => write!(f, "filter({})", filter.description()),
            Operation::Map(_) => f.write_str("map"),
            Operation::FlatMap(_) => f.write_str("flat_map"),
            Operation::Sorted(sort) if sort.is_natural() => f.write_str("sorted"),
            Operation::Sorted(_) => f.write_str("sorted_by"),
            Operation::Distinct(_) => f.write_str("distinct"),
            Operation::Limit(n) => write!(f, "limit({n})"),
            Operation::Skip(n) => write!(f, "skip({n})"),
            Operation::Peek(_) => f.write_str("peek"),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A filter step.
pub struct FilterOp {
    predicate: Rc<dyn Any>,
    pub(crate) test: TestFn,
    description: String,
}

impl FilterOp {
    /// Recovers the predicate if the filter runs over elements of type `T`.
    pub fn predicate<T: 'static>(&self) -> Option<&Predicate<T>> {
        self.predicate.downcast_ref::<Predicate<T>>()
    }

    #[inline]
    pub fn test(&self, element: &dyn Any) -> bool {
        (self.test)(element)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A sort step. `natural` marks `sorted()` as opposed to `sorted_by()`.
pub struct SortOp {
    pub(crate) compare: CompareFn,
    natural: bool,
}

impl SortOp {
    #[inline]
    pub fn compare(&self, a: &dyn Any, b: &dyn Any) -> Ordering {
        (self.compare)(a, b)
    }

    pub fn is_natural(&self) -> bool {
        self.natural
    }
}

/// A distinct step. Each execution gets a fresh tracker.
pub struct DistinctOp {
    tracker: Rc<dyn Fn() -> DistinctTracker>,
}

impl DistinctOp {
    /// Creates the seen-set for one execution.
    pub fn tracker(&self) -> DistinctTracker {
        (self.tracker)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_downcasts() {
        let op = Operation::map(|x: i32| x.to_string());
        let Operation::Map(f) = &op else {
            panic!("expected map");
        };
        let out = f(Box::new(7i32));
        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("7"));

        // A mismatched element passes through untouched.
        let out = f(Box::new(1.5f64));
        assert_eq!(out.downcast_ref::<f64>(), Some(&1.5));
    }

    #[test]
    fn test_flat_map() {
        let op = Operation::flat_map(|x: i32| vec![x, x * 10]);
        let Operation::FlatMap(f) = &op else {
            panic!("expected flat_map");
        };
        let out: Vec<i32> = f(Box::new(3i32))
            .map(|e| *e.downcast::<i32>().unwrap())
            .collect();
        assert_eq!(out, vec![3, 30]);
    }

    #[test]
    fn test_filter_keeps_predicate() {
        let op = Operation::filter(Predicate::from_fn(|x: &i32| *x > 2));
        let filter = op.as_filter().unwrap();
        assert!(filter.test(&5i32));
        assert!(!filter.test(&1i32));
        assert!(!filter.test(&"five"));
        assert!(filter.predicate::<i32>().is_some());
        assert!(filter.predicate::<i64>().is_none());
        assert_eq!(op.to_string(), "filter(<opaque>)");
    }

    #[test]
    fn test_distinct_tracker_is_fresh() {
        let op = Operation::distinct::<i32>();
        let Operation::Distinct(distinct) = &op else {
            panic!("expected distinct");
        };
        let mut first = distinct.tracker();
        assert!(first(&1i32));
        assert!(!first(&1i32));
        let mut second = distinct.tracker();
        assert!(second(&1i32));
    }

    #[test]
    fn test_sorted_compare() {
        let op = Operation::sorted(|a: &i32, b: &i32| b.cmp(a), false);
        let Operation::Sorted(sort) = &op else {
            panic!("expected sorted");
        };
        assert_eq!(sort.compare(&1i32, &2i32), Ordering::Greater);
        assert!(!sort.is_natural());
        assert_eq!(op.to_string(), "sorted_by");
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::Limit(3).to_string(), "limit(3)");
        assert_eq!(Operation::Skip(1).to_string(), "skip(1)");
        assert_eq!(Operation::peek(|_: &i32| {}).to_string(), "peek");
    }
}
