//! Vireo: a declarative UI element runtime.
//!
//! This crate is the public façade over the workspace. Most hosts only need
//! [`ElementManager`] plus the two back-end traits; the member crates are
//! re-exported whole for anything deeper.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vireo::{CssFragment, ElementManager, EngineConfig, NodeKind};
//!
//! let mut manager = ElementManager::new(Arc::new(CssFragment::default()), EngineConfig::default());
//! let page = manager.create_page();
//! let view = manager.create_element("view", NodeKind::View);
//! manager.insert_node(page, view, None).unwrap();
//! manager.finish_patch();
//! ```

pub use vireo_core as core;
pub use vireo_css as css;
pub use vireo_value as value;

pub use vireo_core::{
    AnimationEvent, CoreError, CssFragment, DequeueAction, DiffResult, Element, ElementId,
    ElementManager, EngineConfig, LayoutBackend, LayoutResult, LifecycleObserver,
    ListComponentInfo, NodeKind, PaintBackend, PaintOp, PipelineOptions, Reporter,
};
pub use vireo_css::{CssPropertyId, CssValue, StyleMap};
pub use vireo_value::Value;
