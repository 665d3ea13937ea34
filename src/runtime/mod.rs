pub mod evaluation;
pub mod mutation;
pub mod patch;
pub mod paths;
pub mod pattern;
pub mod utils;

pub use evaluation::{eval, key_set, size_of};
pub use mutation::{array_add, remove, set};
pub use patch::{PatchKind, PatchOp, PatchOutcome};
pub use paths::paths_of;
