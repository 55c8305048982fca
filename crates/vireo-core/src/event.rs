//! Lifecycle and animation events surfaced to the host.

use vireo_css::CssPropertyId;

use crate::element::ElementId;

/// Hooks the host can install on the element manager.
///
/// `component_removed` fires post-order during subtree teardown; the list
/// reuse pool relies on that ordering to free script-side counterparts
/// before their parents.
pub trait LifecycleObserver {
    /// The element (and its subtree) was inserted into the paint tree.
    fn component_attached(&mut self, _id: ElementId) {}
    /// `OnPatchFinish` returned for the pipeline that attached the element.
    fn component_ready(&mut self, _id: ElementId) {}
    /// Fired post-order while a subtree is being unmounted.
    fn component_removed(&mut self, _id: ElementId) {}
}

/// Events produced by the animators, drained by the host after each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationEvent {
    AnimationStarted { id: ElementId, name: String },
    AnimationIteration { id: ElementId, name: String },
    AnimationEnded { id: ElementId, name: String },
    AnimationCancelled { id: ElementId, name: String },
    TransitionStarted { id: ElementId, property: CssPropertyId },
    TransitionEnded { id: ElementId, property: CssPropertyId },
    TransitionCancelled { id: ElementId, property: CssPropertyId },
}

/// FIFO queue of animation events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<AnimationEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: AnimationEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<AnimationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
