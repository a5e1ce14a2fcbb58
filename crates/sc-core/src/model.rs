//! The live visual tree.
//!
//! A `VisualTree` mirrors the canvas DOM: a single canvas root, element
//! nodes nested under it, and text/comment leaves. Edges go parent → child;
//! sibling order is kept explicitly per parent because DOM order is
//! observable (paint order, SVG path indices, export order).
//!
//! Geometry lives in each element's inline style and is always expressed in
//! the immediate parent's frame. Canvas-absolute and viewport boxes are
//! derived on demand by [`VisualTree::bounding_rect`] and never stored.
//!
//! Every method that changes the tree takes a [`StageCrew`] capability.

use crate::contract::StageCrew;
use crate::error::{CoreError, CoreResult};
use crate::geometry::Rect;
use crate::id::NodeId;
use crate::style::InlineStyle;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

/// Id of the canvas root node.
pub const CANVAS_ID: &str = "rx-canvas";

// ─── Nodes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The canvas root. Exactly one per tree.
    Canvas,
    /// A regular element (`div`, `svg`, `rect`, ...).
    Element,
    /// Character data. Never counted as an element child.
    Text(String),
    /// Comment. Never counted as an element child.
    Comment(String),
}

/// A live node on the canvas.
#[derive(Debug, Clone)]
pub struct VisualNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub tag: String,
    pub classes: SmallVec<[String; 4]>,
    /// Inline style, the authoritative source of position and size.
    pub style: InlineStyle,
    pub attributes: BTreeMap<String, String>,
    /// Box reported by the host layout engine, in viewport coordinates.
    /// Only consulted when inline geometry is incomplete.
    pub rendered: Option<Rect>,
}

impl VisualNode {
    pub fn element(id: NodeId, tag: &str) -> Self {
        Self {
            id,
            kind: NodeKind::Element,
            tag: tag.to_ascii_lowercase(),
            classes: SmallVec::new(),
            style: InlineStyle::new(),
            attributes: BTreeMap::new(),
            rendered: None,
        }
    }

    pub fn text(content: &str) -> Self {
        Self {
            kind: NodeKind::Text(content.to_string()),
            tag: "#text".into(),
            ..Self::element(NodeId::anonymous(), "#text")
        }
    }

    pub fn comment(content: &str) -> Self {
        Self {
            kind: NodeKind::Comment(content.to_string()),
            tag: "#comment".into(),
            ..Self::element(NodeId::anonymous(), "#comment")
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Position and size from inline style, in the parent's frame.
    /// `None` unless all four of `left/top/width/height` are usable pixels.
    pub fn inline_box(&self) -> Option<Rect> {
        Some(Rect::new(
            self.style.get_px("left")?,
            self.style.get_px("top")?,
            self.style.get_px("width")?,
            self.style.get_px("height")?,
        ))
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VisualTree {
    graph: StableDiGraph<VisualNode, ()>,
    root: NodeIndex,
    id_index: HashMap<NodeId, NodeIndex>,
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    /// Where the canvas sits in the viewport.
    canvas_frame: Rect,
}

impl VisualTree {
    /// Create a tree holding only the canvas root, placed at `canvas_frame`
    /// in viewport coordinates.
    #[must_use]
    pub fn new(canvas_frame: Rect) -> Self {
        let mut graph = StableDiGraph::new();
        let canvas_id = NodeId::intern(CANVAS_ID);
        let mut canvas = VisualNode::element(canvas_id, "div");
        canvas.kind = NodeKind::Canvas;
        canvas.classes.push("rx-canvas".into());
        let root = graph.add_node(canvas);

        let mut id_index = HashMap::new();
        id_index.insert(canvas_id, root);

        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
            canvas_frame,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// The canvas box in viewport coordinates.
    pub fn canvas_rect(&self) -> Rect {
        self.canvas_frame
    }

    pub fn set_canvas_frame(&mut self, _cap: &StageCrew, frame: Rect) {
        self.canvas_frame = frame;
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() <= 1
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn get(&self, idx: NodeIndex) -> Option<&VisualNode> {
        self.graph.node_weight(idx)
    }

    pub fn get_by_id(&self, id: NodeId) -> Option<&VisualNode> {
        self.id_index.get(&id).and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    /// Resolve an id or report it as not found.
    pub fn require(&self, id: NodeId) -> CoreResult<NodeIndex> {
        self.index_of(id).ok_or(CoreError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, _cap: &StageCrew, idx: NodeIndex) -> Option<&mut VisualNode> {
        self.graph.node_weight_mut(idx)
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// All children in DOM order, text and comments included.
    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.child_order.get(&idx).map_or(&[], Vec::as_slice)
    }

    /// Element children only, in DOM order.
    pub fn element_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.children(idx)
            .iter()
            .copied()
            .filter(|c| self.graph[*c].is_element())
            .collect()
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeIndex, descendant: NodeIndex) -> bool {
        let mut current = descendant;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Pre-order walk of the subtree under `idx` (excluding `idx`).
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.children(idx).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Concatenated direct text children.
    pub fn text_content(&self, idx: NodeIndex) -> Option<String> {
        let text: String = self
            .children(idx)
            .iter()
            .filter_map(|c| match &self.graph[*c].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        (!text.is_empty()).then_some(text)
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Live bounding box of a node in viewport coordinates, the analogue of
    /// `getBoundingClientRect()`.
    ///
    /// Positioned elements sit at their parent's box plus inline
    /// `left/top`. Elements without complete inline geometry report the box
    /// the host layout gave them, or collapse to their parent's origin.
    pub fn bounding_rect(&self, idx: NodeIndex) -> Option<Rect> {
        let node = self.graph.node_weight(idx)?;
        match node.kind {
            NodeKind::Canvas => return Some(self.canvas_frame),
            NodeKind::Text(_) | NodeKind::Comment(_) => return None,
            NodeKind::Element => {}
        }
        if let Some(inline) = node.inline_box() {
            let origin = self.parent_origin(idx);
            return Some(inline.translate(origin.0, origin.1));
        }
        if let Some(rendered) = node.rendered {
            return Some(rendered);
        }
        let origin = self.parent_origin(idx);
        Some(Rect::new(
            origin.0,
            origin.1,
            node.style.get_px("width").unwrap_or(0.0),
            node.style.get_px("height").unwrap_or(0.0),
        ))
    }

    fn parent_origin(&self, idx: NodeIndex) -> (f32, f32) {
        self.parent(idx)
            .and_then(|p| self.bounding_rect(p))
            .map_or((self.canvas_frame.x, self.canvas_frame.y), |r| (r.x, r.y))
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Append a new node as the last child of `parent`.
    pub fn add_node(
        &mut self,
        _cap: &StageCrew,
        parent: NodeIndex,
        node: VisualNode,
    ) -> CoreResult<NodeIndex> {
        if !self.graph.contains_node(parent) {
            return Err(CoreError::Malformed(format!("parent {parent:?} does not exist")));
        }
        if matches!(node.kind, NodeKind::Canvas) {
            return Err(CoreError::Malformed("a tree has exactly one canvas".into()));
        }
        if self.id_index.contains_key(&node.id) {
            return Err(CoreError::Malformed(format!("duplicate node id `{}`", node.id)));
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, ());
        self.child_order.entry(parent).or_default().push(idx);
        self.id_index.insert(id, idx);
        Ok(idx)
    }

    /// Move `child` (with its subtree) to the end of `new_parent`'s children.
    pub fn append_child(
        &mut self,
        _cap: &StageCrew,
        new_parent: NodeIndex,
        child: NodeIndex,
    ) -> CoreResult<()> {
        if child == self.root || !self.graph.contains_node(child) {
            return Err(CoreError::Malformed(format!("{child:?} cannot be moved")));
        }
        if !self.graph.contains_node(new_parent) {
            return Err(CoreError::Malformed(format!("parent {new_parent:?} does not exist")));
        }
        if child == new_parent || self.is_ancestor_of(child, new_parent) {
            return Err(CoreError::Malformed(format!(
                "moving `{}` under `{}` would create a cycle",
                self.graph[child].id, self.graph[new_parent].id
            )));
        }
        self.detach(child);
        self.graph.add_edge(new_parent, child, ());
        self.child_order.entry(new_parent).or_default().push(child);
        Ok(())
    }

    /// Replace the order of `parent`'s children. `order` must be a
    /// permutation of the current children; nodes are moved, not recreated.
    pub fn reorder_children(
        &mut self,
        _cap: &StageCrew,
        parent: NodeIndex,
        order: &[NodeIndex],
    ) -> CoreResult<()> {
        let current = self.children(parent);
        let mut a: Vec<NodeIndex> = current.to_vec();
        let mut b: Vec<NodeIndex> = order.to_vec();
        a.sort();
        b.sort();
        if a != b {
            return Err(CoreError::Malformed(format!(
                "reorder of `{}` is not a permutation of its children",
                self.graph[parent].id
            )));
        }
        self.child_order.insert(parent, order.to_vec());
        Ok(())
    }

    /// Remove a node and its whole subtree.
    pub fn remove_node(&mut self, _cap: &StageCrew, idx: NodeIndex) -> Option<VisualNode> {
        if idx == self.root {
            return None;
        }
        for d in self.descendants(idx) {
            self.child_order.remove(&d);
            if let Some(n) = self.graph.remove_node(d) {
                self.id_index.remove(&n.id);
            }
        }
        self.detach(idx);
        self.child_order.remove(&idx);
        let removed = self.graph.remove_node(idx)?;
        self.id_index.remove(&removed.id);
        Some(removed)
    }

    fn detach(&mut self, child: NodeIndex) {
        if let Some(old_parent) = self.parent(child) {
            if let Some(edge) = self.graph.find_edge(old_parent, child) {
                self.graph.remove_edge(edge);
            }
            if let Some(siblings) = self.child_order.get_mut(&old_parent) {
                siblings.retain(|s| *s != child);
            }
        }
    }

    pub fn set_style(&mut self, cap: &StageCrew, idx: NodeIndex, name: &str, value: &str) {
        if let Some(node) = self.node_mut(cap, idx) {
            node.style.set(name, value);
        }
    }

    pub fn remove_style(&mut self, cap: &StageCrew, idx: NodeIndex, name: &str) {
        if let Some(node) = self.node_mut(cap, idx) {
            node.style.remove(name);
        }
    }

    /// Write a box as inline `left/top/width/height` pixels, rounded to
    /// whole pixels. `rect` is in the parent's frame.
    pub fn set_inline_box(&mut self, cap: &StageCrew, idx: NodeIndex, rect: Rect) {
        let rect = rect.round();
        if let Some(node) = self.node_mut(cap, idx) {
            node.style.set_px("left", rect.x);
            node.style.set_px("top", rect.y);
            node.style.set_px("width", rect.width);
            node.style.set_px("height", rect.height);
        }
    }

    pub fn set_attribute(&mut self, cap: &StageCrew, idx: NodeIndex, name: &str, value: &str) {
        if let Some(node) = self.node_mut(cap, idx) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, cap: &StageCrew, idx: NodeIndex, name: &str) -> Option<String> {
        self.node_mut(cap, idx)?.attributes.remove(name)
    }

    pub fn add_class(&mut self, cap: &StageCrew, idx: NodeIndex, class: &str) {
        if let Some(node) = self.node_mut(cap, idx)
            && !node.has_class(class)
        {
            node.classes.push(class.to_string());
        }
    }
}

impl Default for VisualTree {
    fn default() -> Self {
        Self::new(Rect::new(0.0, 0.0, 800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Beat;

    fn crew() -> StageCrew {
        StageCrew::mint(&Beat::stage_crew("test.fixture")).unwrap()
    }

    fn positioned(id: &str, style: &str) -> VisualNode {
        let mut n = VisualNode::element(NodeId::intern(id), "div");
        n.style = InlineStyle::parse(style);
        n
    }

    #[test]
    fn children_keep_dom_order() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let a = tree.add_node(&cap, root, positioned("order_a", "")).unwrap();
        let t = tree.add_node(&cap, root, VisualNode::text("hello")).unwrap();
        let b = tree.add_node(&cap, root, positioned("order_b", "")).unwrap();

        assert_eq!(tree.children(root), &[a, t, b]);
        assert_eq!(tree.element_children(root), vec![a, b]);

        tree.reorder_children(&cap, root, &[b, t, a]).unwrap();
        assert_eq!(tree.element_children(root), vec![b, a]);
        assert!(tree.reorder_children(&cap, root, &[b, a]).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        tree.add_node(&cap, root, positioned("dup_id", "")).unwrap();
        assert!(tree.add_node(&cap, root, positioned("dup_id", "")).is_err());
    }

    #[test]
    fn append_child_moves_and_refuses_cycles() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let outer = tree.add_node(&cap, root, positioned("mv_outer", "")).unwrap();
        let inner = tree.add_node(&cap, root, positioned("mv_inner", "")).unwrap();

        tree.append_child(&cap, outer, inner).unwrap();
        assert_eq!(tree.parent(inner), Some(outer));
        assert_eq!(tree.children(root), &[outer]);
        assert!(tree.is_ancestor_of(outer, inner));
        assert!(tree.append_child(&cap, inner, outer).is_err());
        assert!(tree.append_child(&cap, inner, inner).is_err());
    }

    #[test]
    fn bounding_rect_accumulates_parent_offsets() {
        let cap = crew();
        let mut tree = VisualTree::new(Rect::new(100.0, 50.0, 800.0, 600.0));
        let root = tree.root();
        let outer = tree
            .add_node(&cap, root, positioned("br_outer", "left: 10px; top: 20px; width: 300px; height: 300px"))
            .unwrap();
        let inner = tree
            .add_node(&cap, outer, positioned("br_inner", "left: 5px; top: 7px; width: 40px; height: 30px"))
            .unwrap();

        assert_eq!(tree.bounding_rect(inner), Some(Rect::new(115.0, 77.0, 40.0, 30.0)));
    }

    #[test]
    fn bounding_rect_falls_back_to_rendered_box() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let mut legacy = positioned("legacy_box", "width: 40px");
        legacy.rendered = Some(Rect::new(12.0, 13.0, 40.0, 22.0));
        let idx = tree.add_node(&cap, root, legacy).unwrap();
        assert_eq!(tree.bounding_rect(idx), Some(Rect::new(12.0, 13.0, 40.0, 22.0)));
    }

    #[test]
    fn remove_node_drops_subtree() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let outer = tree.add_node(&cap, root, positioned("rm_outer", "")).unwrap();
        tree.add_node(&cap, outer, positioned("rm_inner", "")).unwrap();

        assert!(tree.remove_node(&cap, outer).is_some());
        assert!(tree.get_by_id(NodeId::intern("rm_inner")).is_none());
        assert!(tree.children(root).is_empty());
        assert!(tree.remove_node(&cap, root).is_none());
    }

    #[test]
    fn set_inline_box_rounds() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let idx = tree.add_node(&cap, root, positioned("round_me", "")).unwrap();
        tree.set_inline_box(&cap, idx, Rect::new(1.4, 2.6, 10.5, 9.49));
        let node = tree.get(idx).unwrap();
        assert_eq!(node.style.get("left"), Some("1px"));
        assert_eq!(node.style.get("top"), Some("3px"));
        assert_eq!(node.style.get("width"), Some("11px"));
        assert_eq!(node.style.get("height"), Some("9px"));
    }
}
