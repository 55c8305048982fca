//! Translates `animation-*` declarations plus `@keyframes` tokens into
//! running animations on an element's animator.

use tracing::warn;

use vireo_css::keyframes::{AnimationData, AnimationPlayState};
use vireo_css::property::CssPropertyId;

use crate::animation::animation::Animation;
use crate::animation::animator::AnimatorEvent;
use crate::animation::curve::{AnimationCurve, CurveKeyframe};
use crate::element::Element;
use crate::style::CssFragment;

/// Outcome of one declaration sync.
#[derive(Debug, Default)]
pub struct SyncResult {
    pub events: Vec<AnimatorEvent>,
    /// Properties whose cancelled animations no longer stage a value; the
    /// committed style shows through and must be re-flushed.
    pub reverted: Vec<CssPropertyId>,
}

/// Reconcile the element's running keyframe animations against the currently
/// declared `animation-name` list.
///
/// Missing `@keyframes` are non-fatal: the declaration is skipped with a log
/// and everything else proceeds.
pub fn sync_animations(
    element: &mut Element,
    decls: &[AnimationData],
    fragment: &CssFragment,
    now_ms: f64,
) -> SyncResult {
    let mut result = SyncResult::default();

    // Cancel animations whose declarations disappeared.
    for name in element.animator.keyframe_animation_names() {
        let still_declared = decls.iter().any(|d| d.name == name);
        if !still_declared {
            if let Some(props) = element.animator.cancel_keyframe(&name) {
                result.reverted.extend(props);
                result
                    .events
                    .push(AnimatorEvent::AnimationCancelled { name });
            }
        }
    }

    for decl in decls {
        if decl.name.is_empty() || decl.name == "none" {
            continue;
        }
        if let Some(running) = element.animator.keyframe_animation_mut(&decl.name) {
            // Only the play state changes in place; other longhand edits
            // keep the running clock.
            match decl.play_state {
                AnimationPlayState::Paused => running.pause(now_ms),
                AnimationPlayState::Running => running.resume(now_ms),
            }
            continue;
        }

        let Some(token) = fragment.keyframes(&decl.name) else {
            warn!(element = element.id, name = %decl.name, "no @keyframes for animation-name");
            continue;
        };

        let mut animation = Animation::new(decl.clone(), false);
        for property in token.animated_properties() {
            let mut points: Vec<CurveKeyframe> = token
                .frames
                .iter()
                .filter_map(|frame| {
                    frame.styles.get(&property).map(|value| CurveKeyframe {
                        progress: frame.progress,
                        timing: frame.timing,
                        value: value.clone(),
                    })
                })
                .collect();
            if points.is_empty() {
                continue;
            }
            points.sort_by(|a, b| a.progress.total_cmp(&b.progress));

            // Absent 0%/100% keyframes resolve from the element's current
            // value so the animation starts and ends where the element is.
            if points.first().is_some_and(|kf| kf.progress > 0.0) {
                let value = element
                    .effective_style(property)
                    .cloned()
                    .unwrap_or_else(|| points[0].value.clone());
                points.insert(
                    0,
                    CurveKeyframe {
                        progress: 0.0,
                        timing: None,
                        value,
                    },
                );
            }
            if points.last().is_some_and(|kf| kf.progress < 1.0) {
                let value = element
                    .effective_style(property)
                    .cloned()
                    .unwrap_or_else(|| points[points.len() - 1].value.clone());
                points.push(CurveKeyframe {
                    progress: 1.0,
                    timing: None,
                    value,
                });
            }

            let mut curve = AnimationCurve::new(property, decl.duration_ms, decl.timing);
            curve.keyframes = points;
            animation.add_curve(curve);
        }

        if animation.curves.is_empty() {
            warn!(element = element.id, name = %decl.name, "keyframes animate no properties");
            continue;
        }
        element.animator.start_keyframe(animation);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use vireo_css::interpolate::LengthEnv;
    use vireo_css::keyframes::{KeyframeRule, KeyframesToken};
    use vireo_css::value::CssValue;

    use crate::element::NodeKind;

    fn fragment_with_fade() -> CssFragment {
        let mut fragment = CssFragment::default();
        fragment.keyframes.insert(
            "fade".into(),
            Arc::new(KeyframesToken {
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
                        styles: HashMap::from([(CssPropertyId::Opacity, CssValue::number(1.0))]),
                    },
                ],
            }),
        );
        fragment
    }

    #[test]
    fn declared_animation_starts_and_ticks() {
        let fragment = fragment_with_fade();
        let mut element = Element::new(1, "view", NodeKind::View);
        let decls = vec![AnimationData::new("fade", 100.0)];
        sync_animations(&mut element, &decls, &fragment, 0.0);

        let env = LengthEnv::default();
        element.animator.tick(0.0, &env, false);
        let r = element.animator.tick(50.0, &env, false);
        assert_eq!(
            r.updates.get(&CssPropertyId::Opacity),
            Some(&CssValue::number(0.5))
        );
    }

    #[test]
    fn missing_keyframes_is_non_fatal() {
        let fragment = CssFragment::default();
        let mut element = Element::new(1, "view", NodeKind::View);
        let decls = vec![AnimationData::new("ghost", 100.0)];
        let result = sync_animations(&mut element, &decls, &fragment, 0.0);
        assert!(result.events.is_empty());
        assert!(element.animator.is_empty());
    }

    #[test]
    fn removed_declaration_cancels_and_reverts() {
        let fragment = fragment_with_fade();
        let mut element = Element::new(1, "view", NodeKind::View);
        sync_animations(
            &mut element,
            &[AnimationData::new("fade", 100.0)],
            &fragment,
            0.0,
        );
        let env = LengthEnv::default();
        element.animator.tick(10.0, &env, false);

        let result = sync_animations(&mut element, &[], &fragment, 20.0);
        assert_eq!(result.reverted, vec![CssPropertyId::Opacity]);
        assert!(matches!(
            result.events.as_slice(),
            [AnimatorEvent::AnimationCancelled { name }] if name == "fade"
        ));
    }

    #[test]
    fn partial_keyframes_fill_from_current_style() {
        let mut fragment = CssFragment::default();
        fragment.keyframes.insert(
            "grow".into(),
            Arc::new(KeyframesToken {
                name: "grow".into(),
                frames: vec![KeyframeRule {
                    progress: 0.5,
                    timing: None,
                    styles: HashMap::from([(CssPropertyId::Width, CssValue::px(100.0))]),
                }],
            }),
        );
        let mut element = Element::new(1, "view", NodeKind::View);
        element.set_style_internal(CssPropertyId::Width, CssValue::px(20.0));
        sync_animations(
            &mut element,
            &[AnimationData::new("grow", 100.0)],
            &fragment,
            0.0,
        );

        let env = LengthEnv::default();
        element.animator.tick(0.0, &env, false);
        let r = element.animator.tick(25.0, &env, false);
        // Halfway to the 50% keyframe: 20px → 100px at t=0.5 of the segment.
        assert_eq!(r.updates.get(&CssPropertyId::Width), Some(&CssValue::px(60.0)));
    }
}
