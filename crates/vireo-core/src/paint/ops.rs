//! Paint commands and the back-end contract.
//!
//! The core never talks to a platform view directly. It enqueues [`PaintOp`]s
//! addressed by stable element ids; the host drains the queue on the UI
//! thread into a [`PaintBackend`]. An op is not observable as applied until a
//! later `OnPatchFinish` returns.

use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::pipeline::PipelineOptions;

/// Opaque pending platform-node property updates, keyed by prop name.
pub type PropBundle = serde_json::Map<String, serde_json::Value>;

/// One paint command. `index == -1` means "append".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PaintOp {
    CreatePaintingNode {
        id: ElementId,
        platform_tag: String,
        props: PropBundle,
        tend_to_flatten: bool,
        create_async: bool,
        node_index: u32,
    },
    InsertPaintingNode {
        parent_id: ElementId,
        child_id: ElementId,
        index: i32,
    },
    RemovePaintingNode {
        parent_id: ElementId,
        child_id: ElementId,
        index: i32,
        is_move: bool,
    },
    DestroyPaintingNode {
        parent_id: ElementId,
        child_id: ElementId,
        index: i32,
    },
    UpdateLayout {
        id: ElementId,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        paddings: [f64; 4],
        margins: [f64; 4],
        borders: [f64; 4],
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        sticky_positions: Option<[f64; 4]>,
        max_height: f64,
        node_index: u32,
    },
    UpdateProps {
        id: ElementId,
        props: PropBundle,
    },
    OnNodeReady {
        id: ElementId,
    },
    ListReusePaintingNode {
        id: ElementId,
        item_key: String,
    },
    InvokeUiMethod {
        id: ElementId,
        method: String,
        params: serde_json::Value,
        callback_id: u64,
    },
    FlushImmediately,
    UpdateLayoutPatching,
    OnPatchFinish {
        options: PipelineOptions,
    },
}

impl PaintOp {
    /// The element this op is addressed to, if any.
    pub fn target(&self) -> Option<ElementId> {
        match self {
            PaintOp::CreatePaintingNode { id, .. }
            | PaintOp::UpdateLayout { id, .. }
            | PaintOp::UpdateProps { id, .. }
            | PaintOp::OnNodeReady { id }
            | PaintOp::ListReusePaintingNode { id, .. }
            | PaintOp::InvokeUiMethod { id, .. } => Some(*id),
            PaintOp::InsertPaintingNode { child_id, .. }
            | PaintOp::RemovePaintingNode { child_id, .. }
            | PaintOp::DestroyPaintingNode { child_id, .. } => Some(*child_id),
            PaintOp::FlushImmediately | PaintOp::UpdateLayoutPatching | PaintOp::OnPatchFinish { .. } => {
                None
            }
        }
    }
}

/// The platform painting back-end, one method per wire command.
pub trait PaintBackend {
    fn create_painting_node(
        &mut self,
        id: ElementId,
        platform_tag: &str,
        props: &PropBundle,
        tend_to_flatten: bool,
        create_async: bool,
        node_index: u32,
    );
    fn insert_painting_node(&mut self, parent_id: ElementId, child_id: ElementId, index: i32);
    fn remove_painting_node(
        &mut self,
        parent_id: ElementId,
        child_id: ElementId,
        index: i32,
        is_move: bool,
    );
    fn destroy_painting_node(&mut self, parent_id: ElementId, child_id: ElementId, index: i32);
    #[allow(clippy::too_many_arguments)]
    fn update_layout(
        &mut self,
        id: ElementId,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        paddings: [f64; 4],
        margins: [f64; 4],
        borders: [f64; 4],
        sticky_positions: Option<[f64; 4]>,
        max_height: f64,
        node_index: u32,
    );
    fn update_props(&mut self, id: ElementId, props: &PropBundle);
    fn on_node_ready(&mut self, id: ElementId);
    fn list_reuse_painting_node(&mut self, id: ElementId, item_key: &str);
    fn invoke_ui_method(
        &mut self,
        id: ElementId,
        method: &str,
        params: &serde_json::Value,
        callback_id: u64,
    );
    fn flush_immediately(&mut self);
    fn update_layout_patching(&mut self);
    fn on_patch_finish(&mut self, options: &PipelineOptions);
}

/// Ordered queue of pending paint ops.
///
/// The engine thread enqueues; the UI thread drains through
/// [`PaintOpQueue::drain_into`]. When an element is destroyed mid-pipeline,
/// ops addressed to it are dropped before they reach the back-end.
#[derive(Debug, Default)]
pub struct PaintOpQueue {
    ops: Vec<PaintOp>,
}

impl PaintOpQueue {
    pub fn push(&mut self, op: PaintOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[PaintOp] {
        &self.ops
    }

    /// Drop every queued op addressed to `id`. Called when the element's
    /// `willDestroy` flag is set before its teardown runs.
    pub fn drop_ops_for(&mut self, id: ElementId) {
        self.ops.retain(|op| op.target() != Some(id));
    }

    /// Feed every queued op into the back-end in order and clear the queue.
    pub fn drain_into(&mut self, backend: &mut dyn PaintBackend) {
        for op in self.ops.drain(..) {
            match op {
                PaintOp::CreatePaintingNode {
                    id,
                    platform_tag,
                    props,
                    tend_to_flatten,
                    create_async,
                    node_index,
                } => backend.create_painting_node(
                    id,
                    &platform_tag,
                    &props,
                    tend_to_flatten,
                    create_async,
                    node_index,
                ),
                PaintOp::InsertPaintingNode {
                    parent_id,
                    child_id,
                    index,
                } => backend.insert_painting_node(parent_id, child_id, index),
                PaintOp::RemovePaintingNode {
                    parent_id,
                    child_id,
                    index,
                    is_move,
                } => backend.remove_painting_node(parent_id, child_id, index, is_move),
                PaintOp::DestroyPaintingNode {
                    parent_id,
                    child_id,
                    index,
                } => backend.destroy_painting_node(parent_id, child_id, index),
                PaintOp::UpdateLayout {
                    id,
                    left,
                    top,
                    width,
                    height,
                    paddings,
                    margins,
                    borders,
                    sticky_positions,
                    max_height,
                    node_index,
                } => backend.update_layout(
                    id,
                    left,
                    top,
                    width,
                    height,
                    paddings,
                    margins,
                    borders,
                    sticky_positions,
                    max_height,
                    node_index,
                ),
                PaintOp::UpdateProps { id, props } => backend.update_props(id, &props),
                PaintOp::OnNodeReady { id } => backend.on_node_ready(id),
                PaintOp::ListReusePaintingNode { id, item_key } => {
                    backend.list_reuse_painting_node(id, &item_key)
                }
                PaintOp::InvokeUiMethod {
                    id,
                    method,
                    params,
                    callback_id,
                } => backend.invoke_ui_method(id, &method, &params, callback_id),
                PaintOp::FlushImmediately => backend.flush_immediately(),
                PaintOp::UpdateLayoutPatching => backend.update_layout_patching(),
                PaintOp::OnPatchFinish { options } => backend.on_patch_finish(&options),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_ops_for_a_destroyed_id_keeps_order() {
        let mut queue = PaintOpQueue::default();
        queue.push(PaintOp::OnNodeReady { id: 1 });
        queue.push(PaintOp::OnNodeReady { id: 2 });
        queue.push(PaintOp::InsertPaintingNode {
            parent_id: 0,
            child_id: 2,
            index: -1,
        });
        queue.push(PaintOp::FlushImmediately);
        queue.drop_ops_for(2);
        assert_eq!(
            queue.ops(),
            &[PaintOp::OnNodeReady { id: 1 }, PaintOp::FlushImmediately]
        );
    }

    #[test]
    fn serde_round_trip_paint_op() {
        let op = PaintOp::UpdateLayout {
            id: 9,
            left: 1.0,
            top: 2.0,
            width: 3.0,
            height: 4.0,
            paddings: [0.0; 4],
            margins: [0.0; 4],
            borders: [1.0; 4],
            sticky_positions: None,
            max_height: 0.0,
            node_index: 0,
        };
        let json = serde_json::to_string(&op).expect("serialize op");
        let back: PaintOp = serde_json::from_str(&json).expect("deserialize op");
        assert_eq!(op, back);
    }
}
