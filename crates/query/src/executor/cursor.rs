//! Scoped ownership of a row-source cursor.

use super::source::RowCursor;
use tracing::trace;

/// Owns a cursor for the duration of one terminal call and releases it
/// exactly once when dropped, including during unwinding.
pub struct ScopedCursor<C: RowCursor> {
    cursor: C,
    entity: &'static str,
}

impl<C: RowCursor> ScopedCursor<C> {
    pub fn new(cursor: C, entity: &'static str) -> Self {
        Self { cursor, entity }
    }
}

impl<C: RowCursor> Iterator for ScopedCursor<C> {
    type Item = C::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl<C: RowCursor> Drop for ScopedCursor<C> {
    fn drop(&mut self) {
        trace!(entity = self.entity, "releasing row cursor");
        self.cursor.release();
    }
}
