//! The three turn-handling strategies.
//!
//! Each strategy produces a lazily evaluated stream of text chunks; the
//! coordinator owns the history mutation and persistence around them.

mod chat;
mod refusal;
mod sql;

pub use chat::ChatStrategy;
pub use refusal::{REFUSAL_MESSAGE, RefusalStrategy};
pub use sql::{SqlPipelineError, SqlStrategy};
