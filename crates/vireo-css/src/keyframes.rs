//! Serde-facing animation and transition declarations.
//!
//! These are the tokenized forms of `animation-*` / `transition-*` and
//! `@keyframes` that the CSS front end hands to the engine. They are
//! serialization-focused; the animator converts them into runtime curves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::easing::TimingFunction;
use crate::property::CssPropertyId;
use crate::value::CssValue;

/// Direction of animation playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationDirection {
    #[default]
    Normal,
    Reverse,
    Alternate,
    AlternateReverse,
}

/// What values apply before/after the active phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationFillMode {
    #[default]
    None,
    Forwards,
    Backwards,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationPlayState {
    #[default]
    Running,
    Paused,
}

/// One `animation-name: …` declaration with its companion longhands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationData {
    pub name: String,
    /// Duration of one iteration in milliseconds.
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub delay_ms: f64,
    /// Fractional counts allowed; negative means infinite per CSS.
    #[serde(default = "default_iteration_count")]
    pub iteration_count: f64,
    #[serde(default)]
    pub direction: AnimationDirection,
    #[serde(default)]
    pub fill_mode: AnimationFillMode,
    #[serde(default)]
    pub play_state: AnimationPlayState,
    #[serde(default)]
    pub timing: TimingFunction,
}

fn default_iteration_count() -> f64 {
    1.0
}

impl AnimationData {
    pub fn new(name: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            delay_ms: 0.0,
            iteration_count: 1.0,
            direction: AnimationDirection::Normal,
            fill_mode: AnimationFillMode::None,
            play_state: AnimationPlayState::Running,
            timing: TimingFunction::Linear,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.iteration_count < 0.0
    }
}

/// Which property a transition declaration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum TransitionProperty {
    /// Expands to the full enumerated transitionable set.
    All,
    Property { id: CssPropertyId },
}

/// One entry of a `transition: …` declaration list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionData {
    pub property: TransitionProperty,
    pub duration_ms: f64,
    #[serde(default)]
    pub delay_ms: f64,
    #[serde(default)]
    pub timing: TimingFunction,
}

/// One rule inside an `@keyframes` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRule {
    /// Position in the timeline, 0.0 to 1.0.
    pub progress: f64,
    /// Easing applied from this keyframe to the next.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingFunction>,
    /// Property values at this keyframe.
    #[serde(default)]
    pub styles: HashMap<CssPropertyId, CssValue>,
}

/// A parsed `@keyframes` block, shared immutably after parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframesToken {
    pub name: String,
    /// Rules sorted by ascending progress.
    pub frames: Vec<KeyframeRule>,
}

impl KeyframesToken {
    /// Properties animated anywhere in this block.
    pub fn animated_properties(&self) -> Vec<CssPropertyId> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for id in frame.styles.keys() {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CssValue;

    #[test]
    fn serde_round_trip_animation_data() {
        let a = AnimationData {
            name: "pulse".into(),
            duration_ms: 400.0,
            delay_ms: 50.0,
            iteration_count: -1.0,
            direction: AnimationDirection::Alternate,
            fill_mode: AnimationFillMode::Both,
            play_state: AnimationPlayState::Running,
            timing: TimingFunction::EaseInOut,
        };
        assert!(a.is_infinite());
        let json = serde_json::to_string(&a).expect("serialize animation data");
        let back: AnimationData = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(a, back);
    }

    #[test]
    fn serde_round_trip_transition_data() {
        let t = TransitionData {
            property: TransitionProperty::Property {
                id: CssPropertyId::Opacity,
            },
            duration_ms: 200.0,
            delay_ms: 0.0,
            timing: TimingFunction::Linear,
        };
        let json = serde_json::to_string(&t).expect("serialize transition data");
        let back: TransitionData = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(t, back);
    }

    #[test]
    fn animated_properties_dedupes_across_frames() {
        let token = KeyframesToken {
            name: "fade".into(),
            frames: vec![
                KeyframeRule {
                    progress: 0.0,
                    timing: None,
                    styles: HashMap::from([(CssPropertyId::Opacity, CssValue::number(0.0))]),
                },
                KeyframeRule {
                    progress: 1.0,
                    timing: None,
                    styles: HashMap::from([
                        (CssPropertyId::Opacity, CssValue::number(1.0)),
                        (CssPropertyId::Width, CssValue::px(100.0)),
                    ]),
                },
            ],
        };
        let props = token.animated_properties();
        assert_eq!(props.len(), 2);
        assert!(props.contains(&CssPropertyId::Opacity));
        assert!(props.contains(&CssPropertyId::Width));
    }
}
