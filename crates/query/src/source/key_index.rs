//! Multi-key entity cache.

use crate::ast::Entity;
use crate::executor::{RowSource, SourceQuery};
use crate::stream::{Stream, StreamSource};
use core::hash::Hash;
use hashbrown::HashMap;
use std::sync::{PoisonError, RwLock};
use weir_core::SourceError;

type Buckets<K, PK, E> = HashMap<K, HashMap<PK, E>>;

/// Caches entities grouped by a key, each group keyed by primary key.
///
/// Safe for concurrent lookup and insert. As a row source it returns a
/// snapshot of its contents and declines expressions, so every filter
/// runs in memory.
pub struct KeyIndexHolder<K, PK, E> {
    entries: RwLock<Buckets<K, PK, E>>,
    primary_key: fn(&E) -> PK,
}

impl<K, PK, E> KeyIndexHolder<K, PK, E>
where
    K: Eq + Hash,
    PK: Eq + Hash,
    E: Entity + Clone,
{
    /// Creates an empty holder. `primary_key` identifies an entity within
    /// its group.
    pub fn new(primary_key: fn(&E) -> PK) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            primary_key,
        }
    }

    /// Stores `entity` under `key`, replacing an entity with the same
    /// primary key in that group.
    pub fn put(&self, key: K, entity: E) {
        let pk = (self.primary_key)(&entity);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_default().insert(pk, entity);
    }

    /// Drops every entity stored under `key`.
    pub fn remove(&self, key: &K) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }

    /// Returns the number of entities across all keys.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Streams every cached entity.
    pub fn stream_all(&self) -> Stream<'_, Self> {
        self.stream()
    }

    /// Returns a row source over the entities stored under `key`.
    ///
    /// ```ignore
    /// let orders = holder.with_key(customer_id).stream().to_vec()?;
    /// ```
    pub fn with_key(&self, key: K) -> KeyScope<'_, K, PK, E> {
        KeyScope { holder: self, key }
    }

    fn snapshot(&self, key: Option<&K>) -> Vec<E> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match key {
            Some(key) => entries
                .get(key)
                .map(|group| group.values().cloned().collect())
                .unwrap_or_default(),
            None => entries
                .values()
                .flat_map(|group| group.values().cloned())
                .collect(),
        }
    }
}

fn reject_expression(query: &SourceQuery) -> Result<(), SourceError> {
    match query.expression() {
        Some(expression) => Err(format!(
            "key index over {} cannot evaluate {expression:?}",
            query.entity()
        )
        .into()),
        None => Ok(()),
    }
}

impl<K, PK, E> RowSource for KeyIndexHolder<K, PK, E>
where
    K: Eq + Hash,
    PK: Eq + Hash,
    E: Entity + Clone,
{
    type Row = E;
    type Cursor<'a> = std::vec::IntoIter<E> where Self: 'a;

    fn execute<'a>(&'a self, query: &SourceQuery) -> Result<Self::Cursor<'a>, SourceError> {
        reject_expression(query)?;
        Ok(self.snapshot(None).into_iter())
    }

    fn accepts_expressions(&self) -> bool {
        false
    }
}

/// The entities of one key in a `KeyIndexHolder`.
pub struct KeyScope<'h, K, PK, E> {
    holder: &'h KeyIndexHolder<K, PK, E>,
    key: K,
}

impl<K, PK, E> RowSource for KeyScope<'_, K, PK, E>
where
    K: Eq + Hash,
    PK: Eq + Hash,
    E: Entity + Clone,
{
    type Row = E;
    type Cursor<'a> = std::vec::IntoIter<E> where Self: 'a;

    fn execute<'a>(&'a self, query: &SourceQuery) -> Result<Self::Cursor<'a>, SourceError> {
        reject_expression(query)?;
        Ok(self.holder.snapshot(Some(&self.key)).into_iter())
    }

    fn accepts_expressions(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Field;
    use std::sync::Arc;
    use std::thread;

    #[derive(Clone, Debug, PartialEq)]
    struct Order {
        id: u32,
        customer: u32,
        total: i64,
    }

    impl Entity for Order {
        const NAME: &'static str = "order";
    }

    fn order(id: u32, customer: u32, total: i64) -> Order {
        Order {
            id,
            customer,
            total,
        }
    }

    fn holder() -> KeyIndexHolder<u32, u32, Order> {
        let h = KeyIndexHolder::new(|o: &Order| o.id);
        h.put(1, order(10, 1, 100));
        h.put(1, order(11, 1, 250));
        h.put(2, order(20, 2, 75));
        h
    }

    #[test]
    fn test_put_replaces_by_primary_key() {
        let h = holder();
        assert_eq!(h.len(), 3);
        h.put(1, order(10, 1, 999));
        assert_eq!(h.len(), 3);
        let totals: Vec<i64> = h.with_key(1).stream().map(|o| o.total).sorted().to_vec().unwrap();
        assert_eq!(totals, vec![250, 999]);
    }

    #[test]
    fn test_stream_all_filters_in_memory() {
        let h = holder();
        let total = Field::new("total", |o: &Order| o.total).unwrap();
        let stream = h.stream_all().filter(total.greater_than(80));
        assert!(!stream.explain().has_pushdown());
        let mut ids: Vec<u32> = stream.map(|o| o.id).to_vec().unwrap();
        ids.sort();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let h = holder();
        assert_eq!(h.with_key(7).stream().count().unwrap(), 0);
        h.remove(&1);
        assert_eq!(h.len(), 1);
        assert_eq!(h.with_key(1).stream().count().unwrap(), 0);
    }

    #[test]
    fn test_rejects_expressions() {
        let h = holder();
        let query = SourceQuery::new("order", Some("total > ?".into()), vec![]);
        assert!(h.execute(&query).is_err());
        assert!(h.with_key(1).execute(&query).is_err());
    }

    #[test]
    fn test_concurrent_put() {
        let h = Arc::new(KeyIndexHolder::new(|o: &Order| o.id));
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let h = Arc::clone(&h);
                thread::spawn(move || {
                    for i in 0..50u32 {
                        h.put(t, order(t * 100 + i, t, i64::from(i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(h.len(), 200);
        assert_eq!(h.with_key(3).stream().count().unwrap(), 50);
    }
}
