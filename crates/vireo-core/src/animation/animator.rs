//! Per-element animator: owns every running animation on one element and
//! merges their per-frame output into a single staged style map.

use std::collections::HashMap;

use vireo_css::interpolate::LengthEnv;
use vireo_css::property::CssPropertyId;
use vireo_css::StyleMap;

use crate::animation::animation::{Animation, TickOutcome};

/// Events produced by one animator tick, relative to its element.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorEvent {
    AnimationStarted { name: String },
    AnimationIteration { name: String },
    AnimationEnded { name: String },
    AnimationCancelled { name: String },
    TransitionStarted { property: CssPropertyId },
    TransitionEnded { property: CssPropertyId },
    TransitionCancelled { property: CssPropertyId },
}

/// The merged result of one tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickResult {
    /// Values to apply this frame through the animation-originated style
    /// path (never re-entering the transition trigger).
    pub updates: StyleMap,
    /// Properties whose animation ended without fill; the committed style
    /// shows through again.
    pub reverted: Vec<CssPropertyId>,
    /// Transitions that ran to completion; the caller commits the end value.
    pub ended_transitions: StyleMap,
    pub events: Vec<AnimatorEvent>,
}

#[derive(Debug, Default)]
pub struct Animator {
    keyframe_animations: HashMap<String, Animation>,
    transition_animations: HashMap<CssPropertyId, Animation>,
    /// Last value produced per property; authoritative between frames.
    final_map: StyleMap,
}

impl Animator {
    pub fn is_empty(&self) -> bool {
        self.keyframe_animations.is_empty() && self.transition_animations.is_empty()
    }

    /// The staged animated value for a property, if one is in effect.
    pub fn staged_value(&self, property: CssPropertyId) -> Option<&vireo_css::CssValue> {
        self.final_map.get(&property)
    }

    pub fn has_transition_on(&self, property: CssPropertyId) -> bool {
        self.transition_animations.contains_key(&property)
    }

    pub fn keyframe_animation_names(&self) -> Vec<String> {
        self.keyframe_animations.keys().cloned().collect()
    }

    pub fn keyframe_animation_mut(&mut self, name: &str) -> Option<&mut Animation> {
        self.keyframe_animations.get_mut(name)
    }

    /// Install a transition animation for one property.
    ///
    /// Replacement contract: when the incoming transition replaces a running
    /// one on the same property, the old animation is destroyed without
    /// clearing its staged effect, so the frame in between shows the old
    /// value rather than popping to the committed style. Any other teardown
    /// clears the effect first.
    pub fn start_transition(&mut self, property: CssPropertyId, animation: Animation) {
        self.transition_animations.insert(property, animation);
    }

    /// Stop a transition and clear its staged effect. Used when an endpoint
    /// turns invalid and the raw value is committed instead.
    pub fn cancel_transition(&mut self, property: CssPropertyId) -> bool {
        let existed = self.transition_animations.remove(&property).is_some();
        if existed {
            self.final_map.remove(&property);
        }
        existed
    }

    pub fn start_keyframe(&mut self, animation: Animation) {
        self.keyframe_animations
            .insert(animation.name.clone(), animation);
    }

    /// Remove a keyframe animation by name, clearing its staged values.
    pub fn cancel_keyframe(&mut self, name: &str) -> Option<Vec<CssPropertyId>> {
        let animation = self.keyframe_animations.remove(name)?;
        let props: Vec<CssPropertyId> = animation.animated_properties().collect();
        for prop in &props {
            self.final_map.remove(prop);
        }
        Some(props)
    }

    /// Tear everything down without emitting final values. Called when the
    /// element's `willDestroy` flag is set.
    pub fn destroy(&mut self) {
        self.keyframe_animations.clear();
        self.transition_animations.clear();
        self.final_map.clear();
    }

    /// Advance every running animation to `now_ms`.
    pub fn tick(&mut self, now_ms: f64, env: &LengthEnv, strict_zero_duration: bool) -> TickResult {
        let mut result = TickResult::default();

        let mut finished_transitions = Vec::new();
        for (property, animation) in self.transition_animations.iter_mut() {
            match animation.tick(now_ms, env, strict_zero_duration) {
                TickOutcome::Inactive => {}
                TickOutcome::Frame { values, started, .. } => {
                    if started {
                        result
                            .events
                            .push(AnimatorEvent::TransitionStarted { property: *property });
                    }
                    for (prop, value) in values {
                        self.final_map.insert(prop, value.clone());
                        result.updates.insert(prop, value);
                    }
                }
                TickOutcome::Finished { retained } => {
                    finished_transitions.push((*property, retained));
                }
            }
        }
        for (property, retained) in finished_transitions {
            let animation = self.transition_animations.remove(&property);
            self.final_map.remove(&property);
            let end = retained
                .and_then(|mut m| m.remove(&property))
                .or_else(|| {
                    animation
                        .as_ref()
                        .and_then(|a| a.curves.get(&property))
                        .and_then(|c| c.end_value().cloned())
                });
            if let Some(end) = end {
                result.ended_transitions.insert(property, end);
            }
            result
                .events
                .push(AnimatorEvent::TransitionEnded { property });
        }

        let mut finished_keyframes = Vec::new();
        for (name, animation) in self.keyframe_animations.iter_mut() {
            match animation.tick(now_ms, env, strict_zero_duration) {
                TickOutcome::Inactive => {}
                TickOutcome::Frame {
                    values,
                    started,
                    new_iteration,
                } => {
                    if started {
                        result
                            .events
                            .push(AnimatorEvent::AnimationStarted { name: name.clone() });
                    }
                    if new_iteration {
                        result
                            .events
                            .push(AnimatorEvent::AnimationIteration { name: name.clone() });
                    }
                    for (prop, value) in values {
                        self.final_map.insert(prop, value.clone());
                        result.updates.insert(prop, value);
                    }
                }
                TickOutcome::Finished { retained } => {
                    finished_keyframes.push((name.clone(), retained));
                }
            }
        }
        for (name, retained) in finished_keyframes {
            let animation = self.keyframe_animations.remove(&name);
            match retained {
                Some(values) => {
                    // Fill-forwards: the end values stay staged indefinitely.
                    for (prop, value) in values {
                        self.final_map.insert(prop, value.clone());
                        result.updates.insert(prop, value);
                    }
                }
                None => {
                    if let Some(animation) = animation {
                        for prop in animation.animated_properties() {
                            self.final_map.remove(&prop);
                            result.reverted.push(prop);
                        }
                    }
                }
            }
            result
                .events
                .push(AnimatorEvent::AnimationEnded { name });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::curve::AnimationCurve;
    use vireo_css::easing::TimingFunction;
    use vireo_css::keyframes::AnimationData;
    use vireo_css::value::CssValue;

    fn opacity_transition(from: f64, to: f64, duration: f64) -> Animation {
        let mut anim = Animation::new(AnimationData::new("transition:opacity", duration), true);
        anim.data.fill_mode = vireo_css::keyframes::AnimationFillMode::Forwards;
        anim.add_curve(AnimationCurve::two_point(
            CssPropertyId::Opacity,
            CssValue::number(from),
            CssValue::number(to),
            duration,
            TimingFunction::Linear,
        ));
        anim
    }

    #[test]
    fn transition_produces_frames_then_commits_end() {
        let env = LengthEnv::default();
        let mut animator = Animator::default();
        animator.start_transition(CssPropertyId::Opacity, opacity_transition(1.0, 0.0, 200.0));

        let r = animator.tick(0.0, &env, false);
        assert_eq!(r.updates.get(&CssPropertyId::Opacity), Some(&CssValue::number(1.0)));
        let r = animator.tick(100.0, &env, false);
        assert_eq!(r.updates.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.5)));
        let r = animator.tick(200.0, &env, false);
        assert_eq!(
            r.ended_transitions.get(&CssPropertyId::Opacity),
            Some(&CssValue::number(0.0))
        );
        assert!(animator.staged_value(CssPropertyId::Opacity).is_none());
        assert!(r
            .events
            .contains(&AnimatorEvent::TransitionEnded { property: CssPropertyId::Opacity }));
    }

    #[test]
    fn replacing_a_transition_keeps_the_staged_value() {
        let env = LengthEnv::default();
        let mut animator = Animator::default();
        animator.start_transition(CssPropertyId::Opacity, opacity_transition(1.0, 0.0, 200.0));
        animator.tick(0.0, &env, false);
        animator.tick(100.0, &env, false);
        assert_eq!(
            animator.staged_value(CssPropertyId::Opacity),
            Some(&CssValue::number(0.5))
        );

        // Replace mid-flight: the old animation dies but its staged value
        // survives until the new one produces a frame.
        animator.start_transition(CssPropertyId::Opacity, opacity_transition(0.5, 1.0, 200.0));
        assert_eq!(
            animator.staged_value(CssPropertyId::Opacity),
            Some(&CssValue::number(0.5))
        );
        let r = animator.tick(200.0, &env, false);
        assert_eq!(r.updates.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.5)));
        let r = animator.tick(300.0, &env, false);
        assert_eq!(r.updates.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.75)));
    }

    #[test]
    fn cancelling_a_transition_clears_its_effect() {
        let env = LengthEnv::default();
        let mut animator = Animator::default();
        animator.start_transition(CssPropertyId::Opacity, opacity_transition(1.0, 0.0, 200.0));
        animator.tick(0.0, &env, false);
        assert!(animator.cancel_transition(CssPropertyId::Opacity));
        assert!(animator.staged_value(CssPropertyId::Opacity).is_none());
    }

    #[test]
    fn keyframe_without_fill_reverts_on_finish() {
        let env = LengthEnv::default();
        let mut animator = Animator::default();
        let mut anim = Animation::new(AnimationData::new("fade", 100.0), false);
        anim.add_curve(AnimationCurve::two_point(
            CssPropertyId::Opacity,
            CssValue::number(0.0),
            CssValue::number(1.0),
            100.0,
            TimingFunction::Linear,
        ));
        animator.start_keyframe(anim);
        animator.tick(0.0, &env, false);
        let r = animator.tick(150.0, &env, false);
        assert_eq!(r.reverted, vec![CssPropertyId::Opacity]);
        assert!(animator.staged_value(CssPropertyId::Opacity).is_none());
        assert!(animator.is_empty());
    }
}
