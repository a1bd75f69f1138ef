//! Fields that reference a row of another entity.

use crate::ast::field::{Entity, Field, FieldValue};
use core::fmt;
use core::ops::Deref;
use std::rc::Rc;

/// A field holding a foreign key, paired with a finder that resolves the
/// referenced row.
///
/// Dereferences to the underlying `Field`, so every predicate builder of
/// the key's type is available. The finder is opaque: it usually runs a
/// lookup against another row source.
///
/// ```ignore
/// let customer = Field::new("customer_id", |o: &Order| o.customer_id)?
///     .with_finder(move |o: &Order| customers.get(o.customer_id));
/// let owner = customer.find_from(&order);
/// let pushed = orders.stream().filter(customer.equal(7));
/// ```
pub struct ForeignKeyField<E, V, FK> {
    field: Field<E, V>,
    finder: Rc<dyn Fn(&E) -> FK>,
}

impl<E, V, FK> Clone for ForeignKeyField<E, V, FK> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            finder: Rc::clone(&self.finder),
        }
    }
}

impl<E: Entity, V: FieldValue, FK> fmt::Debug for ForeignKeyField<E, V, FK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKeyField")
            .field("column", self.field.column())
            .finish()
    }
}

impl<E: Entity, V: FieldValue, FK> ForeignKeyField<E, V, FK> {
    /// Resolves the row referenced by `entity`.
    pub fn find_from(&self, entity: &E) -> FK {
        (self.finder)(entity)
    }

    /// Returns the underlying key field.
    pub fn field(&self) -> &Field<E, V> {
        &self.field
    }
}

impl<E, V, FK> Deref for ForeignKeyField<E, V, FK> {
    type Target = Field<E, V>;

    fn deref(&self) -> &Field<E, V> {
        &self.field
    }
}

impl<E: Entity, V: FieldValue> Field<E, V> {
    /// Attaches a finder, turning the field into a foreign key.
    pub fn with_finder<FK>(self, finder: impl Fn(&E) -> FK + 'static) -> ForeignKeyField<E, V, FK> {
        ForeignKeyField {
            field: self,
            finder: Rc::new(finder),
        }
    }
}
