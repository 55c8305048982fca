//! The element arena and the mutation pipeline.
//!
//! Every tree mutation goes through the manager: it owns the nodes, the
//! paint tree, the paint-op queue, and the per-pipeline bookkeeping. Hosts
//! drive it single-threaded from the engine thread and drain the queue on
//! the UI thread between pipelines.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use vireo_css::interpolate::LengthEnv;
use vireo_css::keyframes::{AnimationData, TransitionData};
use vireo_css::value::LengthUnit;
use vireo_css::{CssPropertyId, CssValue, StyleMap};
use vireo_value::json::value_to_json;
use vireo_value::Value;

use crate::animation::animator::AnimatorEvent;
use crate::animation::keyframe_manager;
use crate::element::{Element, ElementFlags, ElementId, LazyState, NodeKind, StyleEffects};
use crate::error::CoreError;
use crate::event::{AnimationEvent, EventQueue, LifecycleObserver};
use crate::layout::LayoutResult;
use crate::list::{DequeueAction, DiffResult, ListComponentInfo, ListState};
use crate::paint::container::PaintTree;
use crate::paint::ops::{PaintBackend, PaintOp, PaintOpQueue, PropBundle};
use crate::pipeline::{ItemTiming, PipelineOptions};
use crate::report::Reporter;
use crate::style::CssFragment;

/// Host-configured engine behavior, fixed for the manager's lifetime.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Zero-duration delayed backwards-filling transitions report progress
    /// 0.0 instead of the legacy 1.0.
    pub strict_transition_progress: bool,
    /// Elements with opacity below one are never layout-only.
    pub disable_flatten_with_opacity: bool,
    /// Shell override for platform-driven lists; `None` defers to page
    /// config.
    pub platform_list_shell_flag: Option<bool>,
    pub page_config_platform_list: bool,
    /// Gamma for color interpolation.
    pub default_color_gamma: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_transition_progress: false,
            disable_flatten_with_opacity: true,
            platform_list_shell_flag: None,
            page_config_platform_list: false,
            default_color_gamma: vireo_css::interpolate::DEFAULT_COLOR_GAMMA,
        }
    }
}

/// Owner of the element tree and the paint pipeline.
pub struct ElementManager {
    nodes: HashMap<ElementId, Element>,
    next_id: ElementId,
    root: Option<ElementId>,
    fragment: Arc<CssFragment>,
    config: EngineConfig,
    paint: PaintTree,
    queue: PaintOpQueue,
    events: EventQueue,
    observers: Vec<Box<dyn LifecycleObserver>>,
    reporter: Option<Reporter>,
    pipeline_id: u64,
    first_patch_done: bool,
    /// Components attached since the last `finish_patch`.
    attached_this_pipeline: Vec<ElementId>,
}

impl ElementManager {
    pub fn new(fragment: Arc<CssFragment>, config: EngineConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
            root: None,
            fragment,
            config,
            paint: PaintTree::default(),
            queue: PaintOpQueue::default(),
            events: EventQueue::default(),
            observers: Vec::new(),
            reporter: None,
            pipeline_id: 0,
            first_patch_done: false,
            attached_this_pipeline: Vec::new(),
        }
    }

    pub fn set_reporter(&mut self, reporter: Reporter) {
        self.reporter = Some(reporter);
    }

    pub fn add_observer(&mut self, observer: Box<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, CoreError> {
        self.nodes.get(&id).ok_or(CoreError::UnknownElement(id))
    }

    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, CoreError> {
        self.nodes.get_mut(&id).ok_or(CoreError::UnknownElement(id))
    }

    pub fn paint_ops(&self) -> &[PaintOp] {
        self.queue.ops()
    }

    /// Feed every queued paint op into the back-end and clear the queue.
    pub fn drain_paint_ops(&mut self, backend: &mut dyn PaintBackend) {
        self.queue.drain_into(backend);
    }

    pub fn drain_animation_events(&mut self) -> Vec<AnimationEvent> {
        self.events.drain()
    }

    fn flatten_with_opacity(&self) -> bool {
        !self.config.disable_flatten_with_opacity
    }

    // ---- tree construction -------------------------------------------------

    /// Create a detached element. Non-virtual elements either start
    /// layout-only or get a platform node created right away.
    pub fn create_element(&mut self, tag: impl Into<String>, kind: NodeKind) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        let mut element = Element::new(id, tag, kind);
        if element.is_virtual() {
            // No platform presence at all.
        } else if !element.kind.is_page() && element.can_be_layout_only_with(self.flatten_with_opacity())
        {
            element.flags.insert(ElementFlags::LAYOUT_ONLY);
        } else {
            element.flags.insert(ElementFlags::HAS_PAINTING_NODE);
            self.queue.push(PaintOp::CreatePaintingNode {
                id,
                platform_tag: element.tag.clone(),
                props: element.take_prop_bundle(),
                tend_to_flatten: element.flags.contains(ElementFlags::TEND_TO_FLATTEN),
                create_async: false,
                node_index: 0,
            });
        }
        self.nodes.insert(id, element);
        id
    }

    /// Create the page root. There is exactly one per manager.
    pub fn create_page(&mut self) -> ElementId {
        let id = self.create_element("page", NodeKind::Page);
        self.root = Some(id);
        self.paint.set_root_page(id);
        id
    }

    pub fn insert_node(
        &mut self,
        parent: ElementId,
        child: ElementId,
        index: Option<usize>,
    ) -> Result<(), CoreError> {
        if !self.nodes.contains_key(&parent) {
            return Err(CoreError::UnknownElement(parent));
        }
        self.element_mut(child)?.parent = Some(parent);
        {
            let parent_el = self.element_mut(parent)?;
            match index {
                Some(i) if i <= parent_el.children.len() => parent_el.children.insert(i, child),
                _ => parent_el.children.push(child),
            }
        }
        self.attach_subtree(child);
        Ok(())
    }

    /// Unlink a child without destroying it; the subtree can be re-inserted.
    pub fn remove_node(&mut self, parent: ElementId, child: ElementId) -> Result<(), CoreError> {
        self.element_mut(parent)?.children.retain(|&c| c != child);
        self.element_mut(child)?.parent = None;
        let order = self.subtree_preorder(child);
        let Self { nodes, paint, queue, .. } = self;
        for &id in &order {
            paint.detach(nodes, queue, id, false);
        }
        Ok(())
    }

    /// Tear a subtree down for good. Pending paint ops addressed to any
    /// destroyed id are dropped; `component_removed` fires post-order.
    pub fn destroy_node(&mut self, id: ElementId) -> Result<(), CoreError> {
        let order = self.subtree_postorder(id)?;
        for &node in &order {
            if let Some(element) = self.nodes.get_mut(&node) {
                element.flags.insert(ElementFlags::WILL_DESTROY);
                element.animator.destroy();
            }
            self.queue.drop_ops_for(node);
        }

        if let Some(parent) = self.element(id)?.parent {
            if let Some(parent_el) = self.nodes.get_mut(&parent) {
                parent_el.children.retain(|&c| c != id);
            }
        }
        {
            let Self { nodes, paint, queue, .. } = self;
            if let Some(paint_parent) = paint.paint_parent(id) {
                let index = paint
                    .paint_children(paint_parent)
                    .iter()
                    .position(|&c| c == id)
                    .map(|i| i as i32)
                    .unwrap_or(-1);
                if nodes.get(&id).is_some_and(Element::has_painting_node) {
                    queue.push(PaintOp::DestroyPaintingNode {
                        parent_id: paint_parent,
                        child_id: id,
                        index,
                    });
                }
            }
        }

        for &node in &order {
            let is_component = self
                .nodes
                .get(&node)
                .is_some_and(|e| matches!(e.kind, NodeKind::Component { .. } | NodeKind::LazyComponent { .. }));
            if is_component {
                for observer in self.observers.iter_mut() {
                    observer.component_removed(node);
                }
            }
            self.paint.forget(node);
            self.nodes.remove(&node);
        }
        // Scrub destroyed ids out of every surviving reuse pool.
        for element in self.nodes.values_mut() {
            if let NodeKind::List(state) = &mut element.kind {
                for &node in &order {
                    state.pool.forget(node);
                }
            }
        }
        Ok(())
    }

    fn attach_subtree(&mut self, id: ElementId) {
        let order = self.subtree_preorder(id);
        {
            let Self { nodes, paint, queue, .. } = self;
            for &node in &order {
                paint.attach(nodes, queue, node);
            }
        }
        for &node in &order {
            let is_component = self
                .nodes
                .get(&node)
                .is_some_and(|e| matches!(e.kind, NodeKind::Component { .. } | NodeKind::LazyComponent { .. }));
            if is_component {
                for observer in self.observers.iter_mut() {
                    observer.component_attached(node);
                }
                self.attached_this_pipeline.push(node);
            }
        }
    }

    /// Parents before children.
    fn subtree_preorder(&self, id: ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            order.push(node);
            if let Some(element) = self.nodes.get(&node) {
                for &child in element.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// The render view of an element's children: virtual nodes are replaced
    /// by their own children, recursively.
    pub fn render_children(&self, id: ElementId) -> Result<Vec<ElementId>, CoreError> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.element(id)?.children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let Some(element) = self.nodes.get(&node) else { continue };
            if element.is_virtual() {
                for &child in element.children.iter().rev() {
                    stack.push(child);
                }
            } else {
                out.push(node);
            }
        }
        Ok(out)
    }

    /// Children before parents.
    fn subtree_postorder(&self, id: ElementId) -> Result<Vec<ElementId>, CoreError> {
        self.element(id)?;
        let mut order = self.subtree_preorder(id);
        order.reverse();
        Ok(order)
    }

    // ---- attributes and events ---------------------------------------------

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: Value) -> Result<(), CoreError> {
        if self.element(id)?.kind.is_list() {
            match name {
                "custom-list-name" => {
                    let list_name = value.as_str().map(str::to_owned);
                    self.list_state_mut(id)?.custom_list_name = list_name;
                    return self.emit_list_platform_info(id);
                }
                "diffable" => {
                    self.list_state_mut(id)?.diffable = value.is_truthy();
                    return Ok(());
                }
                "new-arch" => {
                    self.list_state_mut(id)?.new_arch = value.is_truthy();
                    return Ok(());
                }
                "update-list-info" => {
                    let json = value_to_json(&value, false)
                        .map_err(|_| CoreError::InvalidListInfo(id))?;
                    let components: Vec<ListComponentInfo> = serde_json::from_value(json)
                        .map_err(|_| CoreError::InvalidListInfo(id))?;
                    self.update_list_components(id, components)?;
                    return Ok(());
                }
                _ => {}
            }
        }

        let json = value_to_json(&value, false).unwrap_or(serde_json::Value::Null);
        let element = self.element_mut(id)?;
        element.data_model.attributes.insert(name.to_string(), value);
        element.prop_bundle.insert(name.to_string(), json);
        element.props_dirty = true;
        Ok(())
    }

    /// Register an event handler. A layout-only element gains a platform
    /// node so the platform can hit-test it.
    pub fn bind_event(
        &mut self,
        id: ElementId,
        event: impl Into<String>,
        handler: impl Into<String>,
    ) -> Result<(), CoreError> {
        let needs_upgrade = {
            let element = self.element_mut(id)?;
            element
                .data_model
                .event_handlers
                .insert(event.into(), handler.into());
            element.is_layout_only()
        };
        if needs_upgrade {
            self.transition_to_native_view(id)?;
        }
        Ok(())
    }

    /// Queue a platform UI method call against an element's node. The
    /// platform answers through `callback_id`.
    pub fn invoke_ui_method(
        &mut self,
        id: ElementId,
        method: impl Into<String>,
        params: serde_json::Value,
        callback_id: u64,
    ) -> Result<(), CoreError> {
        self.element(id)?;
        self.queue.push(PaintOp::InvokeUiMethod {
            id,
            method: method.into(),
            params,
            callback_id,
        });
        Ok(())
    }

    /// Record the outcome of a lazy bundle load. The loader itself lives in
    /// the host; on failure the host dispatches the fallback slot.
    pub fn set_lazy_state(&mut self, id: ElementId, state: LazyState) -> Result<(), CoreError> {
        let element = self.element_mut(id)?;
        match &mut element.kind {
            NodeKind::LazyComponent { url, state: current } => {
                if state == LazyState::Fail {
                    warn!(element = id, url = %url, "lazy bundle failed");
                }
                *current = state;
                Ok(())
            }
            _ => Err(CoreError::NotLazy(id)),
        }
    }

    // ---- style resolution --------------------------------------------------

    pub fn set_classes(&mut self, id: ElementId, classes: Vec<String>) -> Result<(), CoreError> {
        self.element_mut(id)?.data_model.class_list = classes;
        self.resolve_element_style(id)
    }

    pub fn set_id_selector(
        &mut self,
        id: ElementId,
        selector: Option<String>,
    ) -> Result<(), CoreError> {
        self.element_mut(id)?.data_model.id_selector = selector;
        self.resolve_element_style(id)
    }

    /// Commit one inline style declaration, routed through the transition
    /// trigger like any other resolved write.
    pub fn set_inline_style(
        &mut self,
        id: ElementId,
        property: CssPropertyId,
        value: CssValue,
    ) -> Result<(), CoreError> {
        let effects = {
            let element = self.element_mut(id)?;
            element.inline_styles.insert(property, value.clone());
            if element.transitions.needs_transition(property)
                && element.consume_css_property(property, &value)
            {
                StyleEffects::default()
            } else {
                element.set_style_internal(property, value)
            }
        };
        self.apply_style_effects(id, effects)
    }

    /// Full selector-driven resolution for one element: fragment buckets in
    /// specificity order, inline styles on top, CSS variables substituted
    /// against the ancestor chain.
    pub fn resolve_element_style(&mut self, id: ElementId) -> Result<(), CoreError> {
        let (tag, classes, id_selector) = {
            let element = self.element(id)?;
            (
                element.tag.clone(),
                element.data_model.class_list.clone(),
                element.data_model.id_selector.clone(),
            )
        };
        let mut merged = self.fragment.merge_for(&tag, &classes, id_selector.as_deref());
        {
            let element = self.element(id)?;
            for (property, value) in &element.inline_styles {
                merged.insert(*property, value.clone());
            }
        }

        let mut variable_patterns: Vec<(CssPropertyId, CssValue)> = Vec::new();
        for (property, value) in merged.iter_mut() {
            if matches!(value, CssValue::Variable { .. }) {
                variable_patterns.push((*property, value.clone()));
                *value = match self.lookup_variables(id, value) {
                    Some(text) => CssValue::text(text),
                    None => CssValue::Empty,
                };
            }
        }
        let em_dependent = merged
            .values()
            .any(|v| matches!(v, CssValue::Length { unit: LengthUnit::Em, .. }));

        let effects = {
            let element = self.element_mut(id)?;
            for (property, pattern) in variable_patterns {
                element.variable_styles.insert(property, pattern);
            }
            if em_dependent {
                element.flags.insert(ElementFlags::EM_DEPENDENT);
            }
            element.apply_resolved_styles(merged)
        };
        self.apply_style_effects(id, effects)
    }

    fn lookup_variables(&self, id: ElementId, pattern: &CssValue) -> Option<String> {
        pattern.substitute_variables(|token| {
            let mut current = Some(id);
            while let Some(node) = current {
                let element = self.nodes.get(&node)?;
                if let Some(value) = element.css_variables.get(token) {
                    return Some(value.clone());
                }
                current = element.parent;
            }
            None
        })
    }

    /// Declare a `--token` on an element and re-substitute only the subtree
    /// declarations that consume it, in one pass.
    pub fn set_css_variable(
        &mut self,
        id: ElementId,
        token: &str,
        value: &str,
    ) -> Result<(), CoreError> {
        {
            let element = self.element_mut(id)?;
            let previous = element
                .css_variables
                .insert(token.to_string(), value.to_string());
            if previous.as_deref() == Some(value) {
                return Ok(());
            }
        }

        let mut touched = 0usize;
        for node in self.subtree_preorder(id) {
            let patterns: Vec<(CssPropertyId, CssValue)> = match self.nodes.get(&node) {
                Some(element) => element
                    .variable_styles
                    .iter()
                    .filter(|(_, pattern)| pattern.variable_tokens().iter().any(|t| t == token))
                    .map(|(p, v)| (*p, v.clone()))
                    .collect(),
                None => continue,
            };
            if patterns.is_empty() {
                continue;
            }
            touched += 1;
            let mut updates = StyleMap::default();
            for (property, pattern) in patterns {
                let resolved = match self.lookup_variables(node, &pattern) {
                    Some(text) => CssValue::text(text),
                    None => CssValue::Empty,
                };
                updates.insert(property, resolved);
            }
            let effects = self.element_mut(node)?.apply_resolved_styles(updates);
            self.apply_style_effects(node, effects)?;
        }
        debug!(element = id, token, consumers = touched, "css variable updated");
        Ok(())
    }

    fn apply_style_effects(&mut self, id: ElementId, effects: StyleEffects) -> Result<(), CoreError> {
        // Any committed style can add a paint concern, so the layout-only
        // test runs even when no effect flag fired.
        let needs_upgrade = {
            let element = self.element(id)?;
            element.is_layout_only()
                && !element.can_be_layout_only_with(self.flatten_with_opacity())
        };
        if needs_upgrade {
            self.transition_to_native_view(id)?;
        } else if effects.needs_reparent() {
            let Self { nodes, paint, queue, .. } = self;
            paint.detach(nodes, queue, id, true);
            paint.attach(nodes, queue, id);
        }
        if effects.font_size_changed {
            self.refresh_em_dependents(id)?;
        }
        Ok(())
    }

    /// Re-resolve `em`-dependent descendants after an ancestor font size
    /// change.
    fn refresh_em_dependents(&mut self, id: ElementId) -> Result<(), CoreError> {
        let dependents: Vec<ElementId> = self
            .subtree_preorder(id)
            .into_iter()
            .filter(|node| {
                *node != id
                    && self
                        .nodes
                        .get(node)
                        .is_some_and(|e| e.flags.contains(ElementFlags::EM_DEPENDENT))
            })
            .collect();
        for node in dependents {
            self.resolve_element_style(node)?;
        }
        Ok(())
    }

    /// Give a layout-only element a real platform node, re-homing the paint
    /// children that now belong under it. Irreversible.
    pub fn transition_to_native_view(&mut self, id: ElementId) -> Result<(), CoreError> {
        let (platform_tag, props) = {
            let element = self.element_mut(id)?;
            if element.has_painting_node() {
                return Ok(());
            }
            element
                .flags
                .remove(ElementFlags::LAYOUT_ONLY | ElementFlags::TEND_TO_FLATTEN);
            element.flags.insert(ElementFlags::HAS_PAINTING_NODE);
            (element.tag.clone(), element.take_prop_bundle())
        };
        debug!(element = id, "materializing layout-only element");
        self.queue.push(PaintOp::CreatePaintingNode {
            id,
            platform_tag,
            props,
            tend_to_flatten: false,
            create_async: false,
            node_index: 0,
        });

        let Self { nodes, paint, queue, .. } = self;
        if let Some(new_parent) = paint.attach(nodes, queue, id) {
            let to_move: Vec<ElementId> = paint
                .paint_children(new_parent)
                .iter()
                .copied()
                .filter(|&child| child != id && passes_through(nodes, child, id, new_parent))
                .collect();
            for child in to_move {
                paint.detach(nodes, queue, child, true);
                paint.attach(nodes, queue, child);
            }
        }
        paint.update_layout(nodes, queue, id);
        queue.push(PaintOp::FlushImmediately);
        Ok(())
    }

    // ---- animations --------------------------------------------------------

    /// Reconcile `animation-*` declarations against the element's running
    /// animations.
    pub fn set_animation_data(
        &mut self,
        id: ElementId,
        decls: Vec<AnimationData>,
        now_ms: f64,
    ) -> Result<(), CoreError> {
        let fragment = Arc::clone(&self.fragment);
        let result = {
            let element = self.element_mut(id)?;
            keyframe_manager::sync_animations(element, &decls, &fragment, now_ms)
        };
        {
            let element = self.element_mut(id)?;
            for property in result.reverted {
                element.reapply_committed_style(property);
            }
        }
        for event in result.events {
            self.events.push(lift_event(id, event));
        }
        Ok(())
    }

    pub fn set_transition_data(
        &mut self,
        id: ElementId,
        data: Vec<TransitionData>,
    ) -> Result<(), CoreError> {
        self.element_mut(id)?.transitions.set_transition_data(data);
        Ok(())
    }

    /// Advance every running animation to `now_ms` and apply the frame.
    ///
    /// Animated values flow through the staged path and never re-enter the
    /// transition trigger; finished transitions commit their end value.
    pub fn tick(&mut self, now_ms: f64) {
        let animated: Vec<ElementId> = self
            .nodes
            .iter()
            .filter(|(_, element)| !element.animator.is_empty())
            .map(|(&id, _)| id)
            .collect();
        let strict = self.config.strict_transition_progress;

        let mut pending_effects: Vec<(ElementId, StyleEffects)> = Vec::new();
        for id in animated {
            let env = self.length_env(id);
            let Some(element) = self.nodes.get_mut(&id) else { continue };
            let result = element.animator.tick(now_ms, &env, strict);
            for (property, value) in &result.updates {
                element.apply_animated_value(*property, value);
            }
            for property in &result.reverted {
                element.reapply_committed_style(*property);
            }
            let mut effects = StyleEffects::default();
            for (property, value) in result.ended_transitions {
                effects.merge(element.set_style_internal(property, value));
            }
            if effects != StyleEffects::default() {
                pending_effects.push((id, effects));
            }
            for event in result.events {
                self.events.push(lift_event(id, event));
            }
        }
        for (id, effects) in pending_effects {
            if let Err(error) = self.apply_style_effects(id, effects) {
                warn!(element = id, %error, "post-animation style effects failed");
            }
        }
    }

    fn length_env(&self, id: ElementId) -> LengthEnv {
        let mut env = LengthEnv {
            color_gamma: self.config.default_color_gamma,
            ..LengthEnv::default()
        };
        if let Some(element) = self.nodes.get(&id) {
            env.self_width = element.layout.width;
            env.self_height = element.layout.height;
            env.font_size = element.font_size;
            if let Some(parent) = element.parent.and_then(|p| self.nodes.get(&p)) {
                env.parent_width = parent.layout.width;
                env.parent_height = parent.layout.height;
            }
        }
        if let Some(root) = self.root.and_then(|r| self.nodes.get(&r)) {
            env.root_font_size = root.font_size;
            env.viewport_width = root.layout.width;
            env.viewport_height = root.layout.height;
        }
        env
    }

    // ---- layout ------------------------------------------------------------

    pub fn apply_layout_result(
        &mut self,
        id: ElementId,
        layout: LayoutResult,
    ) -> Result<(), CoreError> {
        self.element_mut(id)?.layout = layout;
        Ok(())
    }

    // ---- lists -------------------------------------------------------------

    fn list_state_mut(&mut self, id: ElementId) -> Result<&mut ListState, CoreError> {
        let element = self.nodes.get_mut(&id).ok_or(CoreError::UnknownElement(id))?;
        match &mut element.kind {
            NodeKind::List(state) => Ok(state),
            _ => Err(CoreError::NotAList(id)),
        }
    }

    fn list_state(&self, id: ElementId) -> Result<&ListState, CoreError> {
        let element = self.element(id)?;
        match &element.kind {
            NodeKind::List(state) => Ok(state),
            _ => Err(CoreError::NotAList(id)),
        }
    }

    fn list_uses_platform(&self, id: ElementId) -> Result<bool, CoreError> {
        let state = self.list_state(id)?;
        Ok(state.uses_platform_list(
            self.config.platform_list_shell_flag,
            self.config.page_config_platform_list,
        ))
    }

    /// Swap in a new component sequence: scrub keys, diff, mark removals in
    /// the pool, and re-emit the platform payload when a platform list
    /// drives rendering.
    pub fn update_list_components(
        &mut self,
        id: ElementId,
        components: Vec<ListComponentInfo>,
    ) -> Result<DiffResult, CoreError> {
        let (plan, errors) = self.list_state_mut(id)?.update_components(components);
        for error in &errors {
            warn!(list = id, %error, "list item key scrubbed");
        }
        if let Some(reporter) = &self.reporter {
            let mut props = HashMap::new();
            props.insert("vireo_list_scrubbed_keys".into(), errors.len().to_string());
            props.insert(
                "vireo_list_changed".into(),
                (!plan.is_empty()).to_string(),
            );
            reporter.report("vireo_list_update", props);
        }
        self.emit_list_platform_info(id)?;
        Ok(plan)
    }

    fn emit_list_platform_info(&mut self, id: ElementId) -> Result<(), CoreError> {
        if !self.list_uses_platform(id)? {
            return Ok(());
        }
        let info = self.list_state(id)?.platform_info();
        let mut props = PropBundle::new();
        props.insert("list-platform-info".into(), info);
        self.queue.push(PaintOp::UpdateProps { id, props });
        Ok(())
    }

    /// Platform callback: the list needs the component for `index` on
    /// screen. Decides between in-place update, pool reuse, and creation;
    /// the pipeline it opens is closed with an `OnPatchFinish` carrying the
    /// operation id.
    pub fn list_component_at_index(
        &mut self,
        list_id: ElementId,
        index: usize,
        operation_id: u64,
        now_ms: f64,
    ) -> Result<DequeueAction, CoreError> {
        let (item_key, name) = {
            let state = self.list_state(list_id)?;
            let info = state
                .components
                .get(index)
                .ok_or(CoreError::ListIndexOutOfBounds {
                    index,
                    len: state.components.len(),
                })?;
            (info.item_key.clone(), info.name.clone())
        };
        let action = self.list_state_mut(list_id)?.pool.dequeue(&item_key, &name);
        if let DequeueAction::Reuse { element, from_key } = &action {
            let element = *element;
            debug!(list = list_id, %item_key, from_key = %from_key, "reusing list component");
            self.list_state_mut(list_id)?.pool.bind(&item_key, &name, element);
            self.queue.push(PaintOp::ListReusePaintingNode {
                id: element,
                item_key: item_key.clone(),
            });
        }
        self.finish_list_pipeline(list_id, &item_key, operation_id, now_ms)?;
        Ok(action)
    }

    /// Bind a freshly created component subtree to its item key after a
    /// `Create` action.
    pub fn bind_list_component(
        &mut self,
        list_id: ElementId,
        item_key: &str,
        element: ElementId,
    ) -> Result<(), CoreError> {
        let name = {
            let state = self.list_state(list_id)?;
            state
                .components
                .iter()
                .find(|c| c.item_key == item_key)
                .map(|c| c.name.clone())
        }
        .unwrap_or_default();
        self.list_state_mut(list_id)?.pool.bind(item_key, name, element);
        Ok(())
    }

    /// Platform callback: the item scrolled out and its component goes back
    /// to the free list.
    pub fn enqueue_list_component(
        &mut self,
        list_id: ElementId,
        item_key: &str,
    ) -> Result<(), CoreError> {
        let state = self.list_state_mut(list_id)?;
        let Some(name) = state.pool.name_for(item_key).map(str::to_owned) else {
            warn!(list = list_id, %item_key, "enqueue for unknown item key");
            return Ok(());
        };
        state.pool.enqueue(item_key, &name);
        Ok(())
    }

    fn finish_list_pipeline(
        &mut self,
        list_id: ElementId,
        item_key: &str,
        operation_id: u64,
        now_ms: f64,
    ) -> Result<(), CoreError> {
        let platform_driven = self.list_uses_platform(list_id)?;
        self.pipeline_id += 1;
        let options = PipelineOptions {
            pipeline_id: self.pipeline_id,
            operation_id: Some(operation_id),
            list_item_key: Some(item_key.to_string()),
            timing: ItemTiming {
                render_start: Some(now_ms),
                ..Default::default()
            },
            is_first_screen: !self.first_patch_done,
        };
        self.queue.push(PaintOp::OnPatchFinish { options });
        if !platform_driven {
            self.queue.push(PaintOp::FlushImmediately);
        }
        Ok(())
    }

    // ---- pipeline ----------------------------------------------------------

    /// Close the current pipeline: flush dirty prop bundles, settle deferred
    /// z-sorts, run the layout pass, and emit `OnPatchFinish`.
    pub fn finish_patch(&mut self) {
        let dirty: Vec<ElementId> = self
            .nodes
            .iter()
            .filter(|(_, element)| element.props_dirty && element.has_painting_node())
            .map(|(&id, _)| id)
            .collect();
        for &id in &dirty {
            if let Some(element) = self.nodes.get_mut(&id) {
                let props = element.take_prop_bundle();
                element.props_dirty = false;
                if !props.is_empty() {
                    self.queue.push(PaintOp::UpdateProps { id, props });
                }
            }
        }

        {
            let Self { nodes, paint, queue, .. } = self;
            paint.flush_dirty_stacking(nodes, queue);
            if let Some(root) = paint.root_page() {
                queue.push(PaintOp::UpdateLayoutPatching);
                paint.update_layout(nodes, queue, root);
            }
        }
        // Nodes whose props changed this pipeline settle after layout.
        for id in dirty {
            self.queue.push(PaintOp::OnNodeReady { id });
        }

        self.pipeline_id += 1;
        let options = PipelineOptions {
            pipeline_id: self.pipeline_id,
            is_first_screen: !self.first_patch_done,
            ..Default::default()
        };
        self.first_patch_done = true;
        self.queue.push(PaintOp::OnPatchFinish { options });

        let attached = std::mem::take(&mut self.attached_this_pipeline);
        for id in attached {
            if self.nodes.contains_key(&id) {
                for observer in self.observers.iter_mut() {
                    observer.component_ready(id);
                }
            }
        }
    }
}

fn lift_event(id: ElementId, event: AnimatorEvent) -> AnimationEvent {
    match event {
        AnimatorEvent::AnimationStarted { name } => AnimationEvent::AnimationStarted { id, name },
        AnimatorEvent::AnimationIteration { name } => {
            AnimationEvent::AnimationIteration { id, name }
        }
        AnimatorEvent::AnimationEnded { name } => AnimationEvent::AnimationEnded { id, name },
        AnimatorEvent::AnimationCancelled { name } => {
            AnimationEvent::AnimationCancelled { id, name }
        }
        AnimatorEvent::TransitionStarted { property } => {
            AnimationEvent::TransitionStarted { id, property }
        }
        AnimatorEvent::TransitionEnded { property } => {
            AnimationEvent::TransitionEnded { id, property }
        }
        AnimatorEvent::TransitionCancelled { property } => {
            AnimationEvent::TransitionCancelled { id, property }
        }
    }
}

/// Whether `target` sits on `child`'s logical ancestor chain strictly below
/// `stop`.
fn passes_through(
    nodes: &HashMap<ElementId, Element>,
    child: ElementId,
    target: ElementId,
    stop: ElementId,
) -> bool {
    let mut current = nodes.get(&child).and_then(|e| e.parent);
    while let Some(ancestor) = current {
        if ancestor == target {
            return true;
        }
        if ancestor == stop {
            return false;
        }
        current = nodes.get(&ancestor).and_then(|e| e.parent);
    }
    false
}
