//! The element node type.
//!
//! An [`Element`] is one node of the logical UI tree. Elements live in the
//! [`manager::ElementManager`] arena and refer to each other by id, never by
//! pointer; the paint-op queue can therefore carry ids across the thread
//! boundary safely.

pub mod manager;
pub mod style_resolver;

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use vireo_css::{CssPropertyId, CssValue, StyleMap};
use vireo_value::Value;

use crate::animation::animator::Animator;
use crate::animation::transition_manager::TransitionManager;
use crate::layout::LayoutResult;
use crate::list::ListState;
use crate::paint::ops::PropBundle;

/// Stable 32-bit element id, monotonic per manager, unique among live
/// elements.
pub type ElementId = u32;

bitflags! {
    /// Per-element state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElementFlags: u32 {
        /// Contributes geometry but has no platform view.
        const LAYOUT_ONLY       = 1 << 0;
        const FIXED             = 1 << 1;
        const STICKY            = 1 << 2;
        /// Skipped in the render view of children (block/if/for).
        const VIRTUAL           = 1 << 3;
        const WRAPPER           = 1 << 4;
        const HAS_PAINTING_NODE = 1 << 5;
        /// Nonzero z-index seen on this element.
        const HAS_Z_PROPS       = 1 << 6;
        /// Prefers to flatten into its parent's platform view.
        const TEND_TO_FLATTEN   = 1 << 7;
        /// Set before the destructor runs; paint ops for this id are dropped.
        const WILL_DESTROY      = 1 << 8;
        /// Has an `em`-relative style; recomputed when an ancestor font-size
        /// changes.
        const EM_DEPENDENT      = 1 << 9;
        const HAS_OPACITY       = 1 << 10;
    }
}

/// Overflow clipping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    X,
    Y,
    Both,
}

/// Loading state of a lazy component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyState {
    Loading,
    Ready,
    /// The bundle failed; the fallback slot was dispatched.
    Fail,
}

/// The node kind, one variant per former tag-dispatched subclass.
#[derive(Debug)]
pub enum NodeKind {
    View,
    Text,
    Image,
    ScrollView,
    Page,
    Component { name: String },
    LazyComponent { url: String, state: LazyState },
    List(Box<ListState>),
    Slot,
    Plug,
    Wrapper,
    Block,
    If,
    For,
}

impl NodeKind {
    /// Virtual nodes exist only in the logical tree; the render view of
    /// children skips them.
    pub fn is_virtual(&self) -> bool {
        matches!(self, NodeKind::Block | NodeKind::If | NodeKind::For)
    }

    pub fn is_page(&self) -> bool {
        matches!(self, NodeKind::Page)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, NodeKind::List(_))
    }
}

/// Script-visible node data: attributes, selectors, handlers.
#[derive(Debug, Default)]
pub struct DataModel {
    pub attributes: HashMap<String, Value>,
    pub class_list: Vec<String>,
    pub id_selector: Option<String>,
    pub dataset: HashMap<String, Value>,
    /// Event name → handler function name in the VM.
    pub event_handlers: HashMap<String, String>,
    pub gesture_detectors: HashMap<u32, String>,
}

/// Side effects of a single `set_style_internal` call, consumed by the
/// manager to schedule paint-tree work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleEffects {
    pub z_changed: bool,
    pub fixed_changed: bool,
    pub sticky_changed: bool,
    pub overflow_changed: bool,
    pub font_size_changed: bool,
    pub needs_layout: bool,
}

impl StyleEffects {
    pub fn merge(&mut self, other: StyleEffects) {
        self.z_changed |= other.z_changed;
        self.fixed_changed |= other.fixed_changed;
        self.sticky_changed |= other.sticky_changed;
        self.overflow_changed |= other.overflow_changed;
        self.font_size_changed |= other.font_size_changed;
        self.needs_layout |= other.needs_layout;
    }

    /// Whether the element may need a different paint parent.
    pub fn needs_reparent(&self) -> bool {
        self.z_changed || self.fixed_changed || self.sticky_changed
    }
}

/// One node of the logical UI tree.
#[derive(Debug)]
pub struct Element {
    pub id: ElementId,
    pub tag: String,
    pub kind: NodeKind,
    pub parent: Option<ElementId>,
    /// Logical children in source order (includes virtual nodes).
    pub children: Vec<ElementId>,
    pub data_model: DataModel,
    /// Resolved styles currently in effect.
    pub styles: StyleMap,
    /// Inline styles, merged on top of selector-derived styles.
    pub inline_styles: StyleMap,
    /// Last consumed value per property; the transition trigger and the
    /// reversed-animation correction read these.
    pub previous_styles: StyleMap,
    /// Unresolved `variable`-patterned declarations, re-substituted when a
    /// consumed `--token` changes.
    pub variable_styles: HashMap<CssPropertyId, CssValue>,
    /// `--token` declarations made on this element.
    pub css_variables: HashMap<String, String>,
    pub flags: ElementFlags,
    pub overflow: Overflow,
    pub z_index: i32,
    pub font_size: f64,
    pub layout: LayoutResult,
    pub animator: Animator,
    pub transitions: TransitionManager,
    pub prop_bundle: PropBundle,
    /// Props were modified since the last `OnNodeReady`.
    pub props_dirty: bool,
}

impl Element {
    pub fn new(id: ElementId, tag: impl Into<String>, kind: NodeKind) -> Self {
        let tag = tag.into();
        let mut flags = ElementFlags::TEND_TO_FLATTEN;
        if kind.is_virtual() {
            flags |= ElementFlags::VIRTUAL;
        }
        if matches!(kind, NodeKind::Wrapper) {
            flags |= ElementFlags::WRAPPER;
        }
        Self {
            id,
            tag,
            kind,
            parent: None,
            children: Vec::new(),
            data_model: DataModel::default(),
            styles: StyleMap::default(),
            inline_styles: StyleMap::default(),
            previous_styles: StyleMap::default(),
            variable_styles: HashMap::new(),
            css_variables: HashMap::new(),
            flags,
            overflow: Overflow::Visible,
            z_index: 0,
            font_size: 14.0,
            layout: LayoutResult::default(),
            animator: Animator::default(),
            transitions: TransitionManager::default(),
            prop_bundle: PropBundle::new(),
            props_dirty: false,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.contains(ElementFlags::VIRTUAL)
    }

    pub fn is_layout_only(&self) -> bool {
        self.flags.contains(ElementFlags::LAYOUT_ONLY)
    }

    pub fn is_fixed(&self) -> bool {
        self.flags.contains(ElementFlags::FIXED)
    }

    pub fn is_sticky(&self) -> bool {
        self.flags.contains(ElementFlags::STICKY)
    }

    pub fn has_painting_node(&self) -> bool {
        self.flags.contains(ElementFlags::HAS_PAINTING_NODE)
    }

    pub fn will_destroy(&self) -> bool {
        self.flags.contains(ElementFlags::WILL_DESTROY)
    }

    /// A stacking context orders its descendants' z-indices independently of
    /// surrounding content. Opacity below one does not create one here; see
    /// `EngineConfig::disable_flatten_with_opacity` for the related flatten
    /// rule.
    pub fn is_stacking_context(&self) -> bool {
        self.kind.is_page() || self.z_index != 0 || self.is_fixed()
    }

    /// Commit one resolved style value, updating the property-driven flags
    /// and the pending prop bundle. Does not consult the transition trigger;
    /// callers decide that first.
    pub fn set_style_internal(&mut self, id: CssPropertyId, value: CssValue) -> StyleEffects {
        let mut effects = StyleEffects::default();
        match id {
            CssPropertyId::ZIndex => {
                let z = match value.as_number() {
                    Some(n) => n as i32,
                    None => {
                        warn!(element = self.id, "non-numeric z-index dropped");
                        return effects;
                    }
                };
                if z != self.z_index {
                    self.z_index = z;
                    effects.z_changed = true;
                }
                self.flags.set(ElementFlags::HAS_Z_PROPS, z != 0);
            }
            CssPropertyId::Position => {
                let keyword = value.as_keyword().unwrap_or("relative");
                let fixed = keyword == "fixed";
                let sticky = keyword == "sticky";
                if fixed != self.is_fixed() {
                    self.flags.set(ElementFlags::FIXED, fixed);
                    effects.fixed_changed = true;
                }
                if sticky != self.is_sticky() {
                    self.flags.set(ElementFlags::STICKY, sticky);
                    effects.sticky_changed = true;
                }
            }
            CssPropertyId::Overflow | CssPropertyId::OverflowX | CssPropertyId::OverflowY => {
                let hidden = value.as_keyword() == Some("hidden");
                let next = match (id, hidden) {
                    (_, false) => Overflow::Visible,
                    (CssPropertyId::OverflowX, true) => match self.overflow {
                        Overflow::Y | Overflow::Both => Overflow::Both,
                        _ => Overflow::X,
                    },
                    (CssPropertyId::OverflowY, true) => match self.overflow {
                        Overflow::X | Overflow::Both => Overflow::Both,
                        _ => Overflow::Y,
                    },
                    (_, true) => Overflow::Hidden,
                };
                if next != self.overflow {
                    self.overflow = next;
                    effects.overflow_changed = true;
                }
            }
            CssPropertyId::Opacity => {
                let opaque = value.as_number().map(|n| n >= 1.0).unwrap_or(true);
                self.flags.set(ElementFlags::HAS_OPACITY, !opaque);
            }
            CssPropertyId::FontSize => {
                if let Some(px) = value.as_number() {
                    if px != self.font_size {
                        self.font_size = px;
                        effects.font_size_changed = true;
                    }
                }
            }
            _ => {}
        }
        if id.affects_layout() {
            effects.needs_layout = true;
        }

        let previous = self.styles.insert(id, value.clone());
        if let Some(previous) = previous {
            self.previous_styles.insert(id, previous);
        }
        self.push_prop(id, &value);
        effects
    }

    /// Current effective value of a property: the animator's staged value if
    /// the property is animating, the committed style otherwise.
    pub fn effective_style(&self, id: CssPropertyId) -> Option<&CssValue> {
        self.animator
            .staged_value(id)
            .or_else(|| self.styles.get(&id))
    }

    /// Whether the element can stay layout-only. Upgraded to a native view
    /// when any of these tests fail.
    pub fn can_be_layout_only(&self) -> bool {
        self.can_be_layout_only_with(false)
    }

    /// `flatten_with_opacity` exempts the opacity bit from the paint-style
    /// test; see `EngineConfig::disable_flatten_with_opacity`.
    pub fn can_be_layout_only_with(&self, flatten_with_opacity: bool) -> bool {
        if !matches!(self.kind, NodeKind::View | NodeKind::Wrapper) {
            return false;
        }
        if !self.flags.contains(ElementFlags::TEND_TO_FLATTEN) {
            return false;
        }
        if self.flags.intersects(
            ElementFlags::HAS_Z_PROPS | ElementFlags::FIXED | ElementFlags::STICKY,
        ) {
            return false;
        }
        if self.overflow != Overflow::Visible {
            return false;
        }
        if !self.data_model.event_handlers.is_empty()
            || !self.data_model.gesture_detectors.is_empty()
        {
            return false;
        }
        !self.has_paint_styles(flatten_with_opacity)
    }

    fn has_paint_styles(&self, ignore_opacity: bool) -> bool {
        use CssPropertyId::*;
        const PAINT_PROPS: &[CssPropertyId] = &[
            BackgroundColor,
            BorderTopWidth,
            BorderRightWidth,
            BorderBottomWidth,
            BorderLeftWidth,
            BorderRadius,
            Transform,
            Filter,
        ];
        PAINT_PROPS.iter().any(|p| {
            self.styles
                .get(p)
                .map(|v| !v.is_empty())
                .unwrap_or(false)
        }) || (!ignore_opacity && self.flags.contains(ElementFlags::HAS_OPACITY))
    }

    /// Stage a prop update for the paint back-end under the property's wire
    /// name.
    pub(crate) fn push_prop(&mut self, id: CssPropertyId, value: &CssValue) {
        let key = match serde_json::to_value(id) {
            Ok(serde_json::Value::String(name)) => name,
            _ => return,
        };
        if let Ok(json) = serde_json::to_value(value) {
            self.prop_bundle.insert(key, json);
            self.props_dirty = true;
        }
    }

    /// Take the staged prop bundle, leaving an empty one behind.
    pub fn take_prop_bundle(&mut self) -> PropBundle {
        std::mem::take(&mut self.prop_bundle)
    }
}
