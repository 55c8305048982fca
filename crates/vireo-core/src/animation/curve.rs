//! Per-property animation curves.

use vireo_css::easing::TimingFunction;
use vireo_css::interpolate::{interpolate, EPSILON, LengthEnv, PropertyValueType};
use vireo_css::property::CssPropertyId;
use vireo_css::value::CssValue;

/// One keyframe of a curve. `timing` eases the segment starting here.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveKeyframe {
    /// Position in the timeline, 0.0 to 1.0, strictly ascending per curve.
    pub progress: f64,
    pub timing: Option<TimingFunction>,
    pub value: CssValue,
}

/// The keyframe timeline for a single animated property.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCurve {
    pub property: CssPropertyId,
    pub value_type: PropertyValueType,
    pub keyframes: Vec<CurveKeyframe>,
    /// One iteration's duration in milliseconds.
    pub scaled_duration_ms: f64,
    /// Top-level easing applied to the whole timeline before segment lookup.
    pub timing: TimingFunction,
}

impl AnimationCurve {
    pub fn new(property: CssPropertyId, duration_ms: f64, timing: TimingFunction) -> Self {
        Self {
            property,
            value_type: property.value_type(),
            keyframes: Vec::new(),
            scaled_duration_ms: duration_ms,
            timing,
        }
    }

    /// The two-keyframe curve a transition generates: `{0 → start, 1 → end}`.
    pub fn two_point(
        property: CssPropertyId,
        start: CssValue,
        end: CssValue,
        duration_ms: f64,
        timing: TimingFunction,
    ) -> Self {
        let mut curve = Self::new(property, duration_ms, timing);
        curve.keyframes.push(CurveKeyframe {
            progress: 0.0,
            timing: None,
            value: start,
        });
        curve.keyframes.push(CurveKeyframe {
            progress: 1.0,
            timing: None,
            value: end,
        });
        curve
    }

    pub fn end_value(&self) -> Option<&CssValue> {
        self.keyframes.last().map(|kf| &kf.value)
    }

    pub fn start_value(&self) -> Option<&CssValue> {
        self.keyframes.first().map(|kf| &kf.value)
    }

    /// Sample the curve at `time_ms ∈ [0, scaled_duration_ms]`.
    ///
    /// Returns `None` when the curve has fewer than two keyframes. A
    /// degenerate segment (`t_i == t_{i+1}` within epsilon) returns its
    /// endpoint value, never NaN.
    pub fn get_value(&self, time_ms: f64, env: &LengthEnv) -> Option<CssValue> {
        if self.keyframes.len() < 2 {
            return self.keyframes.first().map(|kf| kf.value.clone());
        }
        let duration = self.scaled_duration_ms;
        if duration <= 0.0 {
            return self.end_value().cloned();
        }

        let progress = (time_ms / duration).clamp(0.0, 1.0);
        let transformed = duration * self.timing.evaluate(progress);

        // Active segment: last i with t_i ≤ transformed, never the final
        // keyframe when another precedes it.
        let mut seg = 0;
        for i in 0..self.keyframes.len() - 1 {
            if self.keyframes[i].progress * duration <= transformed {
                seg = i;
            } else {
                break;
            }
        }
        let from = &self.keyframes[seg];
        let to = &self.keyframes[seg + 1];
        let t_from = from.progress * duration;
        let t_to = to.progress * duration;

        let mut segment_progress = if (t_to - t_from).abs() < EPSILON {
            // Single-frame segment.
            1.0
        } else {
            ((transformed - t_from) / (t_to - t_from)).clamp(0.0, 1.0)
        };
        if let Some(timing) = &from.timing {
            segment_progress = timing.evaluate(segment_progress);
        }

        Some(interpolate(
            self.value_type,
            &from.value,
            &to.value,
            segment_progress,
            self.property.is_x_axis(),
            env,
        ))
    }
}
