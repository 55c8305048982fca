//! Element tree core: the logical UI tree, style resolution, CSS animation,
//! the paint-op pipeline, and list virtualization.
//!
//! The crate is platform-free. Hosts implement [`paint::PaintBackend`] and
//! [`layout::LayoutBackend`], drive an [`element::manager::ElementManager`]
//! from the engine thread, and drain its paint-op queue on the UI thread.

pub mod animation;
pub mod element;
pub mod error;
pub mod event;
pub mod layout;
pub mod list;
pub mod paint;
pub mod pipeline;
pub mod report;
pub mod style;

pub use element::manager::{ElementManager, EngineConfig};
pub use element::{Element, ElementFlags, ElementId, LazyState, NodeKind};
pub use error::CoreError;
pub use event::{AnimationEvent, LifecycleObserver};
pub use layout::{LayoutBackend, LayoutResult, NullLayoutBackend};
pub use list::{DequeueAction, DiffResult, ListComponentInfo};
pub use paint::{PaintBackend, PaintOp, PropBundle};
pub use pipeline::{DispatchOptions, ItemTiming, PipelineOptions};
pub use report::{GenericInfo, ReportEvent, Reporter};
pub use style::{CssFragment, PseudoElement};
