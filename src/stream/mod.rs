//! Path extraction straight from JSON text, without building the tree.

pub mod cursor;
pub mod extract;

pub use cursor::{JsonCursor, SeekResult, TokenCursor, TokenKind};
pub use extract::{extract, read};
