//! Shared stylesheet artifacts.

pub mod fragment;

pub use fragment::{CssFragment, PseudoElement};
