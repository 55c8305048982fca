//! Error taxonomy for the element core.
//!
//! Nothing here is fatal to the engine: invalid CSS values are dropped with a
//! log, list key problems are surfaced to the host as recoverable warnings,
//! and lazy-component failures dispatch the fallback slot. Errors never cross
//! the host boundary as panics.

use thiserror::Error;

use vireo_css::CssPropertyId;

use crate::element::ElementId;

#[derive(Debug, Error)]
pub enum CoreError {
    /// An item key was missing, empty, or not a string before scrubbing.
    #[error("illegal item key at index {index}: {reason}")]
    IllegalItemKey { index: usize, reason: String },

    /// Two list items carried the same key before scrubbing.
    #[error("duplicate item key `{key}` at index {index}")]
    DuplicateItemKey { key: String, index: usize },

    /// The offending property is dropped, never applied.
    #[error("invalid css value for `{property:?}`")]
    InvalidCssValue { property: CssPropertyId },

    /// A lazy component failed to load; its fallback slot is dispatched.
    #[error("lazy bundle `{url}` failed to load")]
    BadLazyBundle { url: String },

    #[error("unknown element id {0}")]
    UnknownElement(ElementId),

    #[error("no @keyframes named `{0}`")]
    MissingKeyframes(String),

    #[error("element {0} is not a list")]
    NotAList(ElementId),

    #[error("element {0} is not a lazy component")]
    NotLazy(ElementId),

    /// The `update-list-info` payload did not parse as a component list.
    #[error("malformed list info payload on element {0}")]
    InvalidListInfo(ElementId),

    #[error("list index {index} out of bounds (len {len})")]
    ListIndexOutOfBounds { index: usize, len: usize },
}
