//! The paint tree: the subset of elements that map to platform views.
//!
//! Isomorphic to the element tree except that layout-only elements are
//! elided: their paint children re-parent to the nearest non-layout-only
//! ancestor. Fixed elements with `z-index: 0` attach to the page root in
//! document order; nonzero z-index elements attach to the nearest stacking
//! context and are stable-sorted by z at the end of the pipeline.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::element::{Element, ElementId};
use crate::layout::LayoutResult;
use crate::paint::ops::{PaintOp, PaintOpQueue};

pub type Arena = HashMap<ElementId, Element>;

#[derive(Debug, Default)]
struct ContainerNode {
    parent: Option<ElementId>,
    /// Paint children in platform order.
    children: Vec<ElementId>,
    /// Last `(left, top, layout)` emitted for this node.
    last_emitted: Option<(f64, f64, LayoutResult)>,
}

#[derive(Debug, Default)]
pub struct PaintTree {
    nodes: HashMap<ElementId, ContainerNode>,
    /// Stacking contexts whose children need a z-sort at pipeline end.
    dirty_stacking: HashSet<ElementId>,
    root_page: Option<ElementId>,
}

/// Lexicographic document position of an element: the child-index path from
/// the root.
pub fn document_order_key(arena: &Arena, id: ElementId) -> Vec<usize> {
    let mut key = Vec::new();
    let mut current = id;
    while let Some(element) = arena.get(&current) {
        let Some(parent) = element.parent else { break };
        if let Some(parent_el) = arena.get(&parent) {
            if let Some(index) = parent_el.children.iter().position(|&c| c == current) {
                key.push(index);
            }
        }
        current = parent;
    }
    key.reverse();
    key
}

/// The paint parent an element belongs under: the page root for fixed
/// elements with `z-index: 0`, the nearest stacking context for nonzero
/// z-index, otherwise the nearest non-layout-only logical ancestor.
pub fn target_paint_parent(arena: &Arena, id: ElementId, root_page: ElementId) -> Option<ElementId> {
    let element = arena.get(&id)?;
    if element.is_fixed() && element.z_index == 0 {
        return Some(root_page);
    }
    let want_stacking_context = element.z_index != 0;
    let mut current = element.parent;
    while let Some(ancestor_id) = current {
        let ancestor = arena.get(&ancestor_id)?;
        let eligible = if want_stacking_context {
            ancestor.is_stacking_context() && !ancestor.is_layout_only()
        } else {
            !ancestor.is_layout_only() && !ancestor.is_virtual()
        };
        if eligible {
            return Some(ancestor_id);
        }
        current = ancestor.parent;
    }
    Some(root_page)
}

impl PaintTree {
    pub fn set_root_page(&mut self, id: ElementId) {
        self.root_page = Some(id);
        self.nodes.entry(id).or_default();
    }

    pub fn root_page(&self) -> Option<ElementId> {
        self.root_page
    }

    pub fn paint_parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn paint_children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn mark_stacking_dirty(&mut self, id: ElementId) {
        self.dirty_stacking.insert(id);
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.parent.is_some()) || self.root_page == Some(id)
    }

    /// Attach `child` under its correct paint parent, at its document-order
    /// position among the existing paint children.
    ///
    /// Z-positioned and sticky children mark the enclosing stacking context
    /// dirty; the actual sort is deferred to the end of the pipeline.
    pub fn attach(
        &mut self,
        arena: &Arena,
        queue: &mut PaintOpQueue,
        child: ElementId,
    ) -> Option<ElementId> {
        let root_page = self.root_page?;
        let element = arena.get(&child)?;
        if element.is_virtual() || element.is_layout_only() {
            // Layout-only elements take no paint slot; their children attach
            // through them to the nearest materialized ancestor.
            return None;
        }
        let parent = target_paint_parent(arena, child, root_page)?;
        if element.z_index != 0 || element.is_sticky() {
            self.mark_stacking_dirty(parent);
        }

        let key = document_order_key(arena, child);
        let siblings = &self.nodes.entry(parent).or_default().children;
        let mut index = siblings.len();
        for (i, &sibling) in siblings.iter().enumerate() {
            if document_order_key(arena, sibling) > key {
                index = i;
                break;
            }
        }
        self.nodes.entry(parent).or_default().children.insert(index, child);
        self.nodes.entry(child).or_default().parent = Some(parent);

        if element.has_painting_node() {
            queue.push(PaintOp::InsertPaintingNode {
                parent_id: parent,
                child_id: child,
                index: index as i32,
            });
        }
        Some(parent)
    }

    /// Detach `child` from its paint parent. `is_move` marks a detach that
    /// is immediately followed by a re-attach elsewhere.
    pub fn detach(
        &mut self,
        arena: &Arena,
        queue: &mut PaintOpQueue,
        child: ElementId,
        is_move: bool,
    ) {
        let Some(parent) = self.nodes.get(&child).and_then(|n| n.parent) else {
            return;
        };
        let index = self
            .nodes
            .get(&parent)
            .and_then(|n| n.children.iter().position(|&c| c == child));
        if let Some(index) = index {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.remove(index);
            }
            let has_painting_node = arena.get(&child).is_some_and(Element::has_painting_node);
            if has_painting_node {
                queue.push(PaintOp::RemovePaintingNode {
                    parent_id: parent,
                    child_id: child,
                    index: index as i32,
                    is_move,
                });
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
        if arena.get(&child).is_some_and(|e| e.z_index != 0) {
            self.mark_stacking_dirty(parent);
        }
    }

    /// Drop every trace of a destroyed element.
    pub fn forget(&mut self, id: ElementId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(parent) = node.parent {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.retain(|&c| c != id);
                }
            }
        }
        self.dirty_stacking.remove(&id);
    }

    /// Stable-sort a dirty stacking context's children by z-index: negative
    /// z first, document order within equal z, positive z last. Children
    /// that changed position are re-inserted as moves.
    pub fn update_z_index_list(
        &mut self,
        arena: &Arena,
        queue: &mut PaintOpQueue,
        container: ElementId,
    ) {
        let Some(node) = self.nodes.get(&container) else {
            return;
        };
        let before = node.children.clone();
        let mut after = before.clone();
        after.sort_by_key(|id| arena.get(id).map(|e| e.z_index).unwrap_or(0));
        if before == after {
            return;
        }
        debug!(container, "re-sorting stacking context children");
        for (new_index, &child) in after.iter().enumerate() {
            let old_index = before.iter().position(|&c| c == child).unwrap_or(new_index);
            if old_index == new_index {
                continue;
            }
            if arena.get(&child).is_some_and(Element::has_painting_node) {
                queue.push(PaintOp::RemovePaintingNode {
                    parent_id: container,
                    child_id: child,
                    index: old_index as i32,
                    is_move: true,
                });
                queue.push(PaintOp::InsertPaintingNode {
                    parent_id: container,
                    child_id: child,
                    index: new_index as i32,
                });
            }
        }
        if let Some(node) = self.nodes.get_mut(&container) {
            node.children = after;
        }
    }

    /// Sort every stacking context marked dirty during the pipeline.
    pub fn flush_dirty_stacking(&mut self, arena: &Arena, queue: &mut PaintOpQueue) {
        let dirty: Vec<ElementId> = self.dirty_stacking.drain().collect();
        for container in dirty {
            self.update_z_index_list(arena, queue, container);
        }
    }

    /// Sum of `(left, top)` of logical ancestors strictly between `id` and
    /// its paint parent. Nonzero when layout-only or stacking-context
    /// redirection makes the paint parent differ from the logical parent.
    fn offset_to_paint_parent(&self, arena: &Arena, id: ElementId) -> (f64, f64) {
        let Some(paint_parent) = self.paint_parent(id) else {
            return (0.0, 0.0);
        };
        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut current = arena.get(&id).and_then(|e| e.parent);
        while let Some(ancestor_id) = current {
            if ancestor_id == paint_parent {
                break;
            }
            let Some(ancestor) = arena.get(&ancestor_id) else { break };
            dx += ancestor.layout.left;
            dy += ancestor.layout.top;
            current = ancestor.parent;
        }
        (dx, dy)
    }

    /// Emit `UpdateLayout` for `id` and recurse through its logical
    /// subtree. Fixed elements use their own offsets against the page root;
    /// redirected elements accumulate ancestor offsets up to their paint
    /// parent.
    pub fn update_layout(&mut self, arena: &Arena, queue: &mut PaintOpQueue, id: ElementId) {
        let Some(element) = arena.get(&id) else { return };
        let layout = element.layout;
        let (left, top) = if element.is_fixed() {
            (layout.left, layout.top)
        } else {
            let (dx, dy) = self.offset_to_paint_parent(arena, id);
            (layout.left + dx, layout.top + dy)
        };

        if element.has_painting_node() {
            let node = self.nodes.entry(id).or_default();
            let changed = match &node.last_emitted {
                Some((last_left, last_top, last_layout)) => {
                    layout.frame_changed(last_layout) || *last_left != left || *last_top != top
                }
                None => true,
            };
            if changed {
                node.last_emitted = Some((left, top, layout));
                queue.push(PaintOp::UpdateLayout {
                    id,
                    left,
                    top,
                    width: layout.width,
                    height: layout.height,
                    paddings: layout.paddings,
                    margins: layout.margins,
                    borders: layout.borders,
                    sticky_positions: layout.sticky_positions,
                    max_height: layout.max_height,
                    node_index: 0,
                });
            }
        }

        for child in element.children.clone() {
            self.update_layout(arena, queue, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementFlags, NodeKind};

    fn arena_with_page() -> (Arena, PaintTree, PaintOpQueue) {
        let mut arena = Arena::new();
        let mut page = Element::new(0, "page", NodeKind::Page);
        page.flags.insert(ElementFlags::HAS_PAINTING_NODE);
        arena.insert(0, page);
        let mut tree = PaintTree::default();
        tree.set_root_page(0);
        (arena, tree, PaintOpQueue::default())
    }

    fn add_view(arena: &mut Arena, id: ElementId, parent: ElementId) {
        let mut el = Element::new(id, "view", NodeKind::View);
        el.parent = Some(parent);
        el.flags.insert(ElementFlags::HAS_PAINTING_NODE);
        arena.insert(id, el);
        let children = &mut arena.get_mut(&parent).unwrap().children;
        children.push(id);
    }

    #[test]
    fn layout_only_parents_are_skipped() {
        let (mut arena, mut tree, mut queue) = arena_with_page();
        add_view(&mut arena, 1, 0);
        arena.get_mut(&1).unwrap().flags.insert(ElementFlags::LAYOUT_ONLY);
        arena.get_mut(&1).unwrap().flags.remove(ElementFlags::HAS_PAINTING_NODE);
        add_view(&mut arena, 2, 1);

        tree.attach(&arena, &mut queue, 1);
        assert_eq!(tree.attach(&arena, &mut queue, 2), Some(0));
        assert_eq!(tree.paint_children(0), &[2]);
    }

    #[test]
    fn fixed_zero_z_inserts_in_document_order() {
        let (mut arena, mut tree, mut queue) = arena_with_page();
        // A is document-earlier than B; both fixed, inserted B first.
        add_view(&mut arena, 1, 0); // A
        add_view(&mut arena, 2, 0); // B
        for id in [1, 2] {
            let el = arena.get_mut(&id).unwrap();
            el.flags.insert(ElementFlags::FIXED);
        }
        tree.attach(&arena, &mut queue, 2);
        tree.attach(&arena, &mut queue, 1);
        assert_eq!(tree.paint_children(0), &[1, 2]);
    }

    #[test]
    fn z_children_redirect_to_nearest_stacking_context() {
        let (mut arena, mut tree, mut queue) = arena_with_page();
        add_view(&mut arena, 1, 0); // stacking context
        arena.get_mut(&1).unwrap().z_index = 1;
        add_view(&mut arena, 2, 1); // plain child
        add_view(&mut arena, 3, 2); // z-positioned grandchild
        arena.get_mut(&3).unwrap().z_index = 5;

        tree.attach(&arena, &mut queue, 1);
        tree.attach(&arena, &mut queue, 2);
        assert_eq!(tree.attach(&arena, &mut queue, 3), Some(1));
    }

    #[test]
    fn z_sort_is_stable_negative_first() {
        let (mut arena, mut tree, mut queue) = arena_with_page();
        for id in 1..=4 {
            add_view(&mut arena, id, 0);
            tree.attach(&arena, &mut queue, id);
        }
        arena.get_mut(&1).unwrap().z_index = 1;
        arena.get_mut(&3).unwrap().z_index = -1;
        tree.mark_stacking_dirty(0);
        tree.flush_dirty_stacking(&arena, &mut queue);
        // Negative z first, zeros in document order, positives last.
        assert_eq!(tree.paint_children(0), &[3, 2, 4, 1]);
    }

    #[test]
    fn update_layout_accumulates_layout_only_offsets() {
        let (mut arena, mut tree, mut queue) = arena_with_page();
        add_view(&mut arena, 1, 0);
        {
            let el = arena.get_mut(&1).unwrap();
            el.flags.insert(ElementFlags::LAYOUT_ONLY);
            el.flags.remove(ElementFlags::HAS_PAINTING_NODE);
            el.layout.left = 10.0;
            el.layout.top = 20.0;
        }
        add_view(&mut arena, 2, 1);
        {
            let el = arena.get_mut(&2).unwrap();
            el.layout.left = 5.0;
            el.layout.top = 5.0;
            el.layout.width = 50.0;
            el.layout.height = 50.0;
        }
        tree.attach(&arena, &mut queue, 1);
        tree.attach(&arena, &mut queue, 2);
        tree.update_layout(&arena, &mut queue, 0);

        let op = queue
            .ops()
            .iter()
            .find_map(|op| match op {
                PaintOp::UpdateLayout { id: 2, left, top, .. } => Some((*left, *top)),
                _ => None,
            })
            .expect("layout op for child");
        assert_eq!(op, (15.0, 25.0));

        // A second pass with nothing changed emits nothing new.
        let before = queue.len();
        tree.update_layout(&arena, &mut queue, 0);
        assert_eq!(queue.len(), before);
    }
}
