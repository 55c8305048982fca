//! Pipeline bookkeeping.
//!
//! One pipeline is a single "apply mutations → diff → emit paint ops → tick
//! animators → flush" cycle, delimited by `OnPatchFinish`. The options bundle
//! carries per-item timing stamps the platform list uses for its first-screen
//! metrics.

use serde::{Deserialize, Serialize};

/// Millisecond timestamps for one list item's render, against the same
/// monotonic clock the animators tick on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemTiming {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_start: Option<f64>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_end: Option<f64>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_start: Option<f64>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_end: Option<f64>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_start: Option<f64>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_end: Option<f64>,
}

/// Bundle handed to the paint back-end's `OnPatchFinish`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Monotonic per-manager pipeline counter.
    pub pipeline_id: u64,
    /// Set when the pipeline was triggered by a list `componentAtIndex`.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<u64>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_item_key: Option<String>,
    #[serde(default)]
    pub timing: ItemTiming,
    /// True for the pipeline that renders the first screen.
    #[serde(default)]
    pub is_first_screen: bool,
}

/// Transitive flags carried by a list re-render dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatchOptions {
    #[serde(default)]
    pub css_variables_changed: bool,
    #[serde(default)]
    pub global_properties_changed: bool,
    #[serde(default)]
    pub force_diff: bool,
    #[serde(default)]
    pub refresh_lifecycle: bool,
}
