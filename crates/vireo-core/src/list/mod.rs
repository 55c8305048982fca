//! List virtualization: item-key scrubbing, the diff plan, and the reuse
//! pool.

pub mod diff;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::element::ElementId;
use crate::error::CoreError;

pub use diff::DiffResult;

/// Prefix of synthesized item keys. The counter is process-global so a key
/// never collides across lists.
pub const DEFAULT_ITEM_KEY_PREFIX: &str = "vireo-list-default-item-key-";

static DEFAULT_KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_default_key() -> String {
    let n = DEFAULT_KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{DEFAULT_ITEM_KEY_PREFIX}{n}")
}

/// One list item as declared by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListComponentInfo {
    /// Component name; doubles as the reuse identifier.
    pub name: String,
    #[serde(default)]
    pub item_key: String,
    #[serde(default)]
    pub properties: serde_json::Value,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub is_full_span: bool,
    #[serde(default)]
    pub is_sticky_top: bool,
    #[serde(default)]
    pub is_sticky_bottom: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_main_axis_size_px: Option<f64>,
}

impl ListComponentInfo {
    pub fn new(name: impl Into<String>, item_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_key: item_key.into(),
            properties: serde_json::Value::Null,
            data: serde_json::Value::Null,
            is_full_span: false,
            is_sticky_top: false,
            is_sticky_bottom: false,
            estimated_main_axis_size_px: None,
        }
    }
}

/// Replace missing, empty, or duplicated item keys with synthesized ones.
///
/// Returns the recoverable warnings the host asked to know about; the list
/// always proceeds with the scrubbed keys.
pub fn scrub_item_keys(components: &mut [ListComponentInfo]) -> Vec<CoreError> {
    let mut errors = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for index in 0..components.len() {
        let key = components[index].item_key.clone();
        if key.is_empty() {
            errors.push(CoreError::IllegalItemKey {
                index,
                reason: "missing or empty".into(),
            });
            components[index].item_key = next_default_key();
        } else if seen.contains_key(&key) {
            errors.push(CoreError::DuplicateItemKey { key, index });
            components[index].item_key = next_default_key();
        }
        seen.insert(components[index].item_key.clone(), index);
    }
    if !errors.is_empty() {
        warn!(count = errors.len(), "scrubbed illegal list item keys");
    }
    errors
}

/// The action `dequeue` tells the list node to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DequeueAction {
    /// The key is already backed by a live component; re-render it.
    Update { element: ElementId },
    /// A released component of the same reuse identifier is rebound.
    Reuse { element: ElementId, from_key: String },
    /// Nothing to reuse; build a fresh component tree.
    Create,
}

#[derive(Debug, Clone)]
struct PoolEntry {
    element: ElementId,
    name: String,
    needs_remove: bool,
}

/// Released-component pool keyed by `(itemKey, reuseIdentifier)`.
#[derive(Debug, Default)]
pub struct ReusePool {
    key_to_component: HashMap<String, PoolEntry>,
    free_list: HashMap<String, Vec<(String, ElementId)>>,
}

impl ReusePool {
    /// Record that `element` backs `item_key`.
    pub fn bind(&mut self, item_key: impl Into<String>, name: impl Into<String>, element: ElementId) {
        self.key_to_component.insert(
            item_key.into(),
            PoolEntry {
                element,
                name: name.into(),
                needs_remove: false,
            },
        );
    }

    pub fn mark_needs_remove(&mut self, item_key: &str) {
        if let Some(entry) = self.key_to_component.get_mut(item_key) {
            entry.needs_remove = true;
        }
    }

    pub fn component_for(&self, item_key: &str) -> Option<ElementId> {
        self.key_to_component.get(item_key).map(|e| e.element)
    }

    /// Reuse identifier of the live component backing `item_key`.
    pub fn name_for(&self, item_key: &str) -> Option<&str> {
        self.key_to_component.get(item_key).map(|e| e.name.as_str())
    }

    pub fn dequeue(&mut self, item_key: &str, reuse_identifier: &str) -> DequeueAction {
        if let Some(entry) = self.key_to_component.get(item_key) {
            if entry.name == reuse_identifier && !entry.needs_remove {
                return DequeueAction::Update {
                    element: entry.element,
                };
            }
        }
        if let Some(free) = self.free_list.get_mut(reuse_identifier) {
            if let Some((from_key, element)) = free.pop() {
                return DequeueAction::Reuse { element, from_key };
            }
        }
        DequeueAction::Create
    }

    /// Release the component backing `item_key` into the free list.
    pub fn enqueue(&mut self, item_key: &str, reuse_identifier: &str) {
        if let Some(entry) = self.key_to_component.remove(item_key) {
            self.free_list
                .entry(reuse_identifier.to_string())
                .or_default()
                .push((item_key.to_string(), entry.element));
        }
    }

    /// Drop every reference to `element`, live or pooled. Called post-order
    /// when a component subtree is unmounted for good.
    pub fn forget(&mut self, element: ElementId) {
        self.key_to_component.retain(|_, e| e.element != element);
        for free in self.free_list.values_mut() {
            free.retain(|(_, id)| *id != element);
        }
    }
}

/// Per-list state stored on a `NodeKind::List` element.
#[derive(Debug, Default)]
pub struct ListState {
    pub components: Vec<ListComponentInfo>,
    pub pool: ReusePool,
    pub last_diff: DiffResult,
    /// The `custom-list-name` attribute, when set.
    pub custom_list_name: Option<String>,
    pub new_arch: bool,
    pub diffable: bool,
}

impl ListState {
    /// Scrub the incoming keys, diff against the previous components, and
    /// swap them in. Returns the plan plus any key warnings.
    pub fn update_components(
        &mut self,
        mut components: Vec<ListComponentInfo>,
    ) -> (DiffResult, Vec<CoreError>) {
        let errors = scrub_item_keys(&mut components);
        let plan = DiffResult::compute(&self.components, &components);
        for &old_idx in plan.removals.iter() {
            if let Some(info) = self.components.get(old_idx) {
                self.pool.mark_needs_remove(&info.item_key);
            }
        }
        self.components = components;
        self.last_diff = plan.clone();
        (plan, errors)
    }

    /// Whether the platform-side list implementation drives this list.
    /// Precedence: the `custom-list-name` attribute, then the shell flag,
    /// then page config.
    pub fn uses_platform_list(&self, shell_flag: Option<bool>, page_config: bool) -> bool {
        if let Some(name) = &self.custom_list_name {
            return name == "list-container";
        }
        if let Some(flag) = shell_flag {
            return flag;
        }
        page_config
    }

    /// The single `list-platform-info` attribute payload.
    pub fn platform_info(&self) -> serde_json::Value {
        let indices_where = |pred: fn(&ListComponentInfo) -> bool| -> Vec<usize> {
            self.components
                .iter()
                .enumerate()
                .filter(|(_, c)| pred(c))
                .map(|(i, _)| i)
                .collect()
        };
        let estimated: Vec<f64> = self
            .components
            .iter()
            .map(|c| c.estimated_main_axis_size_px.unwrap_or(-1.0))
            .collect();
        json!({
            "diffable": self.diffable,
            "newarch": self.new_arch,
            "viewTypes": self.components.iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
            "fullspan": indices_where(|c| c.is_full_span),
            "itemkeys": self.components.iter().map(|c| c.item_key.clone()).collect::<Vec<_>>(),
            "stickyTop": indices_where(|c| c.is_sticky_top),
            "stickyBottom": indices_where(|c| c.is_sticky_bottom),
            "estimatedHeight": estimated,
            "estimatedHeightPx": estimated,
            "estimatedMainAxisSizePx": estimated,
            "diffResult": self.last_diff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubbing_replaces_empty_and_duplicate_keys() {
        let mut items = vec![
            ListComponentInfo::new("cell", "a"),
            ListComponentInfo::new("cell", ""),
            ListComponentInfo::new("cell", "a"),
        ];
        let errors = scrub_item_keys(&mut items);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], CoreError::IllegalItemKey { index: 1, .. }));
        assert!(matches!(errors[1], CoreError::DuplicateItemKey { index: 2, .. }));
        assert!(items[1].item_key.starts_with(DEFAULT_ITEM_KEY_PREFIX));
        assert!(items[2].item_key.starts_with(DEFAULT_ITEM_KEY_PREFIX));
        assert_ne!(items[1].item_key, items[2].item_key);
    }

    #[test]
    fn dequeue_prefers_live_then_pool_then_create() {
        let mut pool = ReusePool::default();
        pool.bind("a", "cell", 10);
        assert_eq!(
            pool.dequeue("a", "cell"),
            DequeueAction::Update { element: 10 }
        );

        // A different reuse identifier cannot update in place.
        assert_eq!(pool.dequeue("a", "header"), DequeueAction::Create);

        pool.enqueue("a", "cell");
        assert_eq!(
            pool.dequeue("b", "cell"),
            DequeueAction::Reuse {
                element: 10,
                from_key: "a".into()
            }
        );
        assert_eq!(pool.dequeue("b", "cell"), DequeueAction::Create);
    }

    #[test]
    fn needs_remove_blocks_in_place_update() {
        let mut pool = ReusePool::default();
        pool.bind("a", "cell", 10);
        pool.mark_needs_remove("a");
        assert_eq!(pool.dequeue("a", "cell"), DequeueAction::Create);
    }

    #[test]
    fn platform_info_carries_the_plan_and_sticky_indices() {
        let mut state = ListState::default();
        let mut items = vec![
            ListComponentInfo::new("header", "h"),
            ListComponentInfo::new("cell", "a"),
        ];
        items[0].is_sticky_top = true;
        items[1].estimated_main_axis_size_px = Some(44.0);
        state.update_components(items);

        let info = state.platform_info();
        assert_eq!(info["itemkeys"], json!(["h", "a"]));
        assert_eq!(info["stickyTop"], json!([0]));
        assert_eq!(info["estimatedHeightPx"], json!([-1.0, 44.0]));
        assert_eq!(info["diffResult"]["insertions"], json!([0, 1]));
    }

    #[test]
    fn attribute_overrides_shell_and_page_config() {
        let mut state = ListState::default();
        assert!(!state.uses_platform_list(None, false));
        assert!(state.uses_platform_list(None, true));
        assert!(state.uses_platform_list(Some(true), false));
        state.custom_list_name = Some("waterfall".into());
        assert!(!state.uses_platform_list(Some(true), true));
        state.custom_list_name = Some("list-container".into());
        assert!(state.uses_platform_list(Some(false), false));
    }
}
