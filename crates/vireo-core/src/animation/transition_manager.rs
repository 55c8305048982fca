//! Transition declarations and the trigger decision.
//!
//! The manager answers one question per style write: should this mutation be
//! driven by a generated two-keyframe animation instead of committed
//! directly? The actual trigger lives in the element's style-resolution path
//! because it needs the element's current and previous values.

use std::collections::HashMap;

use vireo_css::keyframes::{TransitionData, TransitionProperty};
use vireo_css::property::{CssPropertyId, ALL_TRANSITIONABLE};

#[derive(Debug, Default)]
pub struct TransitionManager {
    entries: HashMap<CssPropertyId, TransitionData>,
}

impl TransitionManager {
    /// Install the element's declared transitions. `all` expands to the full
    /// enumerated transitionable set; polymeric properties expand to their
    /// per-side components. Later declarations win per property.
    pub fn set_transition_data(&mut self, data: Vec<TransitionData>) {
        self.entries.clear();
        for entry in data {
            match entry.property {
                TransitionProperty::All => {
                    for &id in ALL_TRANSITIONABLE {
                        self.entries.insert(id, entry.clone());
                    }
                }
                TransitionProperty::Property { id } => {
                    if let Some(sides) = id.expand_polymeric() {
                        for &side in sides {
                            self.entries.insert(side, entry.clone());
                        }
                    } else if id.is_transitionable() {
                        self.entries.insert(id, entry.clone());
                    }
                }
            }
        }
    }

    pub fn needs_transition(&self, id: CssPropertyId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn data_for(&self, id: CssPropertyId) -> Option<&TransitionData> {
        self.entries.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_css::easing::TimingFunction;

    fn decl(property: TransitionProperty, duration: f64) -> TransitionData {
        TransitionData {
            property,
            duration_ms: duration,
            delay_ms: 0.0,
            timing: TimingFunction::Linear,
        }
    }

    #[test]
    fn all_expands_to_the_enumerated_set() {
        let mut mgr = TransitionManager::default();
        mgr.set_transition_data(vec![decl(TransitionProperty::All, 300.0)]);
        assert!(mgr.needs_transition(CssPropertyId::Opacity));
        assert!(mgr.needs_transition(CssPropertyId::BackgroundColor));
        assert!(mgr.needs_transition(CssPropertyId::Width));
        // Non-transitionable properties stay out.
        assert!(!mgr.needs_transition(CssPropertyId::Display));
    }

    #[test]
    fn polymeric_declarations_expand_per_side() {
        let mut mgr = TransitionManager::default();
        mgr.set_transition_data(vec![decl(
            TransitionProperty::Property {
                id: CssPropertyId::Margin,
            },
            100.0,
        )]);
        assert!(mgr.needs_transition(CssPropertyId::MarginTop));
        assert!(mgr.needs_transition(CssPropertyId::MarginLeft));
        assert!(!mgr.needs_transition(CssPropertyId::PaddingTop));
    }

    #[test]
    fn later_declarations_win_per_property() {
        let mut mgr = TransitionManager::default();
        mgr.set_transition_data(vec![
            decl(TransitionProperty::All, 300.0),
            decl(
                TransitionProperty::Property {
                    id: CssPropertyId::Opacity,
                },
                50.0,
            ),
        ]);
        assert_eq!(mgr.data_for(CssPropertyId::Opacity).unwrap().duration_ms, 50.0);
        assert_eq!(mgr.data_for(CssPropertyId::Width).unwrap().duration_ms, 300.0);
    }
}
