//! Per-element style commit path: the transition trigger and the
//! animation-originated write path.
//!
//! Merging (selector buckets, inline styles, CSS variables) happens in the
//! manager because it needs ancestors; everything that only needs the one
//! element lives here.

use tracing::warn;

use vireo_css::keyframes::AnimationFillMode;
use vireo_css::keyframes::AnimationData;
use vireo_css::property::CssPropertyId;
use vireo_css::value::CssValue;
use vireo_css::StyleMap;

use crate::animation::animation::Animation;
use crate::animation::curve::AnimationCurve;
use crate::element::{Element, StyleEffects};

impl Element {
    /// Pre-commit hook; a `false` return abandons the whole resolution.
    pub(crate) fn will_resolve_style(&self, _merged: &StyleMap) -> bool {
        !self.will_destroy()
    }

    /// Decide whether this style write is driven by a generated transition.
    ///
    /// Returns `true` when a transition was started (or is already driving
    /// the property) and the raw value must not be committed; the animator
    /// will produce it. An invalid endpoint cancels any running transition
    /// and lets the caller commit normally.
    pub fn consume_css_property(&mut self, id: CssPropertyId, end: &CssValue) -> bool {
        let Some(data) = self.transitions.data_for(id).cloned() else {
            return false;
        };
        let Some(start) = self.effective_style(id).cloned() else {
            // Nothing to animate from; first write commits directly.
            return false;
        };
        if start == *end {
            return false;
        }
        if !id.is_valid_endpoint(&start) || !id.is_valid_endpoint(end) {
            if self.animator.cancel_transition(id) {
                warn!(element = self.id, property = ?id, "transition endpoint invalid, committing raw value");
            }
            return false;
        }

        let mut decl = AnimationData::new(transition_name(id), data.duration_ms);
        decl.delay_ms = data.delay_ms;
        decl.timing = data.timing;
        decl.fill_mode = AnimationFillMode::Forwards;
        let mut animation = Animation::new(decl, true);
        animation.add_curve(AnimationCurve::two_point(
            id,
            start,
            end.clone(),
            data.duration_ms,
            data.timing,
        ));
        // Replacing a running transition on the same property keeps its
        // staged value; see Animator::start_transition.
        self.animator.start_transition(id, animation);
        true
    }

    /// Commit a fully-merged style map, routing each property through the
    /// transition trigger first.
    pub fn apply_resolved_styles(&mut self, merged: StyleMap) -> StyleEffects {
        let mut effects = StyleEffects::default();
        if !self.will_resolve_style(&merged) {
            return effects;
        }
        for (id, value) in merged {
            if self.transitions.needs_transition(id) && self.consume_css_property(id, &value) {
                continue;
            }
            effects.merge(self.set_style_internal(id, value));
        }
        effects
    }

    /// Animation-originated write: stage the value for the paint back-end
    /// without re-entering the transition trigger or touching the committed
    /// style.
    pub fn apply_animated_value(&mut self, id: CssPropertyId, value: &CssValue) {
        self.push_prop(id, value);
    }

    /// Re-flush the committed style after an animation reverted.
    pub fn reapply_committed_style(&mut self, id: CssPropertyId) {
        if let Some(value) = self.styles.get(&id).cloned() {
            self.push_prop(id, &value);
        } else {
            self.push_prop(id, &CssValue::Empty);
        }
    }
}

fn transition_name(id: CssPropertyId) -> String {
    match serde_json::to_value(id) {
        Ok(serde_json::Value::String(name)) => format!("transition:{name}"),
        _ => "transition".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_css::easing::TimingFunction;
    use vireo_css::interpolate::LengthEnv;
    use vireo_css::keyframes::{TransitionData, TransitionProperty};

    use crate::element::NodeKind;

    fn with_opacity_transition(duration_ms: f64) -> Element {
        let mut el = Element::new(1, "view", NodeKind::View);
        el.set_style_internal(CssPropertyId::Opacity, CssValue::number(1.0));
        el.transitions.set_transition_data(vec![TransitionData {
            property: TransitionProperty::Property {
                id: CssPropertyId::Opacity,
            },
            duration_ms,
            delay_ms: 0.0,
            timing: TimingFunction::Linear,
        }]);
        el
    }

    #[test]
    fn transition_intercepts_the_commit() {
        let mut el = with_opacity_transition(200.0);
        let consumed = el.consume_css_property(CssPropertyId::Opacity, &CssValue::number(0.0));
        assert!(consumed);
        // Committed style still reads the old value.
        assert_eq!(el.styles.get(&CssPropertyId::Opacity), Some(&CssValue::number(1.0)));

        let env = LengthEnv::default();
        el.animator.tick(0.0, &env, false);
        let r = el.animator.tick(100.0, &env, false);
        assert_eq!(r.updates.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.5)));
    }

    #[test]
    fn retargeting_starts_from_the_current_animated_value() {
        let mut el = with_opacity_transition(200.0);
        assert!(el.consume_css_property(CssPropertyId::Opacity, &CssValue::number(0.0)));
        let env = LengthEnv::default();
        el.animator.tick(0.0, &env, false);
        el.animator.tick(100.0, &env, false); // staged ≈ 0.5

        // Reverse mid-flight: the new transition starts from 0.5.
        assert!(el.consume_css_property(CssPropertyId::Opacity, &CssValue::number(1.0)));
        el.animator.tick(100.0, &env, false);
        let r = el.animator.tick(200.0, &env, false);
        assert_eq!(r.updates.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.75)));
    }

    #[test]
    fn equal_endpoints_do_not_start_a_transition() {
        let mut el = with_opacity_transition(200.0);
        assert!(!el.consume_css_property(CssPropertyId::Opacity, &CssValue::number(1.0)));
    }

    #[test]
    fn invalid_endpoint_cancels_and_commits_raw() {
        let mut el = with_opacity_transition(200.0);
        assert!(el.consume_css_property(CssPropertyId::Opacity, &CssValue::number(0.0)));
        let env = LengthEnv::default();
        el.animator.tick(0.0, &env, false);

        // Opacity outside [0,1] is not a valid endpoint.
        let _ = el.apply_resolved_styles(StyleMap::from([(
            CssPropertyId::Opacity,
            CssValue::number(1.5),
        )]));
        assert!(!el.animator.has_transition_on(CssPropertyId::Opacity));
        assert_eq!(el.styles.get(&CssPropertyId::Opacity), Some(&CssValue::number(1.5)));
    }
}
