//! Reference row sources.

mod fragment;
mod key_index;
mod memory;

pub use fragment::{Condition, Fragment, FragmentError, Operand};
pub use key_index::{KeyIndexHolder, KeyScope};
pub use memory::{InMemoryRowSource, MemoryCursor};
