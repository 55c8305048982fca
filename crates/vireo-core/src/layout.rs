//! Layout results and the contract to the out-of-process layout engine.
//!
//! The core never solves layout itself. It posts style and attribute updates
//! to a [`LayoutBackend`] and applies the [`LayoutResult`]s it gets back
//! during the paint tree's layout pass.

use serde::{Deserialize, Serialize};

use vireo_css::{CssPropertyId, CssValue};
use vireo_value::Value;

use crate::element::ElementId;

/// Box geometry delivered by the layout engine for one element.
///
/// Side arrays are `[top, right, bottom, left]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutResult {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub paddings: [f64; 4],
    #[serde(default)]
    pub margins: [f64; 4],
    #[serde(default)]
    pub borders: [f64; 4],
    #[serde(default)]
    pub max_height: f64,
    /// Present only for sticky elements.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky_positions: Option<[f64; 4]>,
}

impl LayoutResult {
    /// Whether width/height differ from `other` (offset-only moves are
    /// cheaper to apply and do not count as a frame change).
    pub fn frame_changed(&self, other: &LayoutResult) -> bool {
        self.width != other.width
            || self.height != other.height
            || self.paddings != other.paddings
            || self.margins != other.margins
            || self.borders != other.borders
    }

    pub fn offset_changed(&self, other: &LayoutResult) -> bool {
        self.left != other.left || self.top != other.top
    }
}

/// Messages the core posts to the layout thread. All calls are
/// fire-and-forget; results come back as [`LayoutResult`]s applied by the
/// host between pipelines.
pub trait LayoutBackend {
    fn attach(&mut self, id: ElementId, props: &Value);
    fn update_props(&mut self, id: ElementId, props: &Value);
    fn update_style(&mut self, id: ElementId, css_id: CssPropertyId, value: &CssValue);
    fn reset_style(&mut self, id: ElementId, css_id: CssPropertyId);
    fn update_font_size(&mut self, id: ElementId, cur_font_px: f64, root_font_px: f64);
    fn update_attribute(&mut self, id: ElementId, attr: &str, value: &Value);
    fn mark_layout_root(&mut self, id: ElementId);
}

/// Layout backend that drops everything. Used when the host applies layout
/// results directly, and in tests that only exercise the paint tree.
#[derive(Debug, Default)]
pub struct NullLayoutBackend;

impl LayoutBackend for NullLayoutBackend {
    fn attach(&mut self, _id: ElementId, _props: &Value) {}
    fn update_props(&mut self, _id: ElementId, _props: &Value) {}
    fn update_style(&mut self, _id: ElementId, _css_id: CssPropertyId, _value: &CssValue) {}
    fn reset_style(&mut self, _id: ElementId, _css_id: CssPropertyId) {}
    fn update_font_size(&mut self, _id: ElementId, _cur: f64, _root: f64) {}
    fn update_attribute(&mut self, _id: ElementId, _attr: &str, _value: &Value) {}
    fn mark_layout_root(&mut self, _id: ElementId) {}
}
