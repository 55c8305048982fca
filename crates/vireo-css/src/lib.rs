//! Typed CSS model for the element core.
//!
//! This crate owns the resolved style value type ([`CssValue`]), the dense
//! property id space ([`CssPropertyId`]), easing curves, the serde-facing
//! keyframe/transition declarations, and per-property-type interpolation.
//! It never parses stylesheet text; the host's CSS front end feeds it
//! already-tokenized declarations.

pub mod color;
pub mod easing;
pub mod interpolate;
pub mod keyframes;
pub mod property;
pub mod value;

pub use color::Color;
pub use easing::{StepPosition, TimingFunction};
pub use interpolate::{LengthEnv, PropertyValueType, interpolate};
pub use keyframes::{
    AnimationData, AnimationDirection, AnimationFillMode, AnimationPlayState, KeyframeRule,
    KeyframesToken, TransitionData, TransitionProperty,
};
pub use property::CssPropertyId;
pub use value::{CssValue, LengthUnit};

/// Map of resolved property values, the unit of exchange between the style
/// resolver, animators, and the paint back-end.
pub type StyleMap = std::collections::HashMap<CssPropertyId, CssValue>;
