pub mod core;
pub mod filter;
pub mod functions;

pub use self::core::{eval, eval_segments, get_index, get_property, EvalContext};
pub use functions::{key_set, size_of};
