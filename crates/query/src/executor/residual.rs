//! In-memory replay of residual operations.
//!
//! Each operation maps onto the matching lazy iterator adaptor, so a
//! residual suffix behaves exactly like the same steps applied to an
//! un-pushed sequence: `limit` stops pulling rows once satisfied and
//! `sorted` buffers only when first polled.

use crate::pipeline::{Element, ElementIter, Operation};
use core::any::Any;
use core::cmp::Ordering;
use std::rc::Rc;

/// Wraps `input` with the given operations, in order.
pub fn replay<'a>(input: ElementIter<'a>, operations: &[Rc<Operation>]) -> ElementIter<'a> {
    operations
        .iter()
        .fold(input, |iter, op| apply(iter, op.as_ref()))
}

fn apply<'a>(input: ElementIter<'a>, operation: &Operation) -> ElementIter<'a> {
    match operation {
        Operation::Filter(filter) => {
            let test = Rc::clone(&filter.test);
            Box::new(input.filter(move |e| test(&**e)))
        }
        Operation::Map(f) => {
            let f = Rc::clone(f);
            Box::new(input.map(move |e| f(e)))
        }
        Operation::FlatMap(f) => {
            let f = Rc::clone(f);
            Box::new(input.flat_map(move |e| f(e)))
        }
        Operation::Sorted(sort) => Box::new(SortedIter {
            input: Some(input),
            sorted: Vec::new().into_iter(),
            compare: Rc::clone(&sort.compare),
        }),
        Operation::Distinct(distinct) => {
            let mut seen = distinct.tracker();
            Box::new(input.filter(move |e| seen(&**e)))
        }
        Operation::Limit(n) => Box::new(input.take(*n)),
        Operation::Skip(n) => Box::new(input.skip(*n)),
        Operation::Peek(f) => {
            let f = Rc::clone(f);
            Box::new(input.inspect(move |e| f(&**e)))
        }
    }
}

/// Buffers and stable-sorts its input on the first call to `next`.
struct SortedIter<'a> {
    input: Option<ElementIter<'a>>,
    sorted: std::vec::IntoIter<Element>,
    compare: Rc<dyn Fn(&dyn Any, &dyn Any) -> Ordering>,
}

impl Iterator for SortedIter<'_> {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        if let Some(input) = self.input.take() {
            let mut buffer: Vec<Element> = input.collect();
            let compare = &self.compare;
            buffer.sort_by(|a, b| compare(&**a, &**b));
            self.sorted = buffer.into_iter();
        }
        self.sorted.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Predicate;
    use std::cell::Cell;

    fn input(values: Vec<i32>) -> ElementIter<'static> {
        Box::new(values.into_iter().map(|v| Box::new(v) as Element))
    }

    fn run(values: Vec<i32>, ops: Vec<Operation>) -> Vec<i32> {
        let ops: Vec<Rc<Operation>> = ops.into_iter().map(Rc::new).collect();
        replay(input(values), &ops)
            .map(|e| *e.downcast::<i32>().unwrap())
            .collect()
    }

    #[test]
    fn test_filter_map_limit() {
        let out = run(
            vec![1, 2, 3, 4, 5, 6],
            vec![
                Operation::filter(Predicate::from_fn(|x: &i32| x % 2 == 0)),
                Operation::map(|x: i32| x * 10),
                Operation::Limit(2),
            ],
        );
        assert_eq!(out, vec![20, 40]);
    }

    #[test]
    fn test_sorted_is_stable() {
        let ops: Vec<Rc<Operation>> = vec![Rc::new(Operation::sorted(
            |a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0),
            false,
        ))];
        let rows = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let out: Vec<(i32, char)> = replay(
            Box::new(rows.into_iter().map(|r| Box::new(r) as Element)),
            &ops,
        )
        .map(|e| *e.downcast::<(i32, char)>().unwrap())
        .collect();
        assert_eq!(out, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_skip_distinct_flat_map() {
        let out = run(
            vec![3, 1, 3, 2, 1],
            vec![
                Operation::distinct::<i32>(),
                Operation::Skip(1),
                Operation::flat_map(|x: i32| vec![x, -x]),
            ],
        );
        assert_eq!(out, vec![1, -1, 2, -2]);
    }

    #[test]
    fn test_limit_short_circuits_peek() {
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let out = run(
            vec![1, 2, 3, 4, 5],
            vec![
                Operation::peek(move |_: &i32| counter.set(counter.get() + 1)),
                Operation::Limit(2),
            ],
        );
        assert_eq!(out, vec![1, 2]);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_sorted_is_lazy() {
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let ops: Vec<Rc<Operation>> = vec![
            Rc::new(Operation::peek(move |_: &i32| counter.set(counter.get() + 1))),
            Rc::new(Operation::sorted(|a: &i32, b: &i32| a.cmp(b), true)),
        ];
        let mut iter = replay(input(vec![3, 1, 2]), &ops);
        assert_eq!(seen.get(), 0);
        assert_eq!(iter.next().map(|e| *e.downcast::<i32>().unwrap()), Some(1));
        assert_eq!(seen.get(), 3);
    }
}
