//! The CSS animation and transition engine.
//!
//! Declarations come in as parsed [`vireo_css::AnimationData`] /
//! [`vireo_css::TransitionData`] tokens; this module turns them into running
//! [`animation::Animation`]s owned by a per-element
//! [`animator::Animator`], ticked once per vsync by the element manager.

pub mod animation;
pub mod animator;
pub mod curve;
pub mod keyframe_manager;
pub mod transition_manager;
