//! Stream execution: the row-source contract, cursor release and
//! residual replay.

mod cursor;
mod residual;
mod runner;
mod source;

pub use cursor::ScopedCursor;
pub use residual::replay;
pub use runner::StreamExecutor;
pub use source::{RowCursor, RowSource, SourceQuery};
