//! The paint tree and the command stream that drives platform views.

pub mod container;
pub mod ops;

pub use container::PaintTree;
pub use ops::{PaintBackend, PaintOp, PaintOpQueue, PropBundle};
