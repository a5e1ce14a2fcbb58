//! Selection overlay: the floating box and resize handles drawn over the
//! selected node.
//!
//! The overlay lives in canvas coordinates. Its target is a weak reference
//! (a `NodeId` looked up in the `VisualTree` on every sync), so deleting the
//! target can never leave a dangling pointer, only a stale id that the next
//! sync notices.
//!
//! ## Geometry
//!
//! A node's inline `left/top` are relative to its immediate parent. When a
//! node has complete inline geometry, its overlay box is the parent's
//! canvas-relative offset plus the inline values, taken verbatim. This is the
//! same source of truth the resize and drag handlers write, so the overlay
//! tracks them exactly with no layout pass in between. Nodes without
//! complete inline geometry fall back to their live bounding box converted
//! to canvas space.

use sc_core::{Handle, NodeId, NodeIndex, Rect, ResizeConfig, StageCrew, VisualTree};

/// One of the eight handle squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayHandle {
    pub handle: Handle,
    pub visible: bool,
    /// Canvas-relative square centred on the handle anchor.
    pub rect: Rect,
}

/// The rendered chrome, created on first use and reused afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayChrome {
    pub rect: Rect,
    pub visible: bool,
    pub handles: [OverlayHandle; 8],
}

/// Canvas-wide singleton bound to at most one node.
#[derive(Debug, Clone)]
pub struct SelectionOverlay {
    target: Option<NodeId>,
    chrome: Option<OverlayChrome>,
    handle_size: f32,
}

impl SelectionOverlay {
    pub fn new(handle_size: f32) -> Self {
        Self {
            target: None,
            chrome: None,
            handle_size,
        }
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn chrome(&self) -> Option<&OverlayChrome> {
        self.chrome.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.chrome.as_ref().is_some_and(|c| c.visible)
    }

    /// Canvas-relative box of the overlay while visible.
    pub fn visible_rect(&self) -> Option<Rect> {
        self.chrome.as_ref().filter(|c| c.visible).map(|c| c.rect)
    }

    /// Bind the overlay to `target` and show it over the node. Binding a new
    /// target silently replaces the previous one. Unknown ids are a no-op.
    pub fn show(&mut self, _cap: &StageCrew, tree: &VisualTree, target: NodeId) -> bool {
        let Some(idx) = tree.index_of(target) else {
            log::warn!("show overlay: node `{target}` not found");
            return false;
        };
        let Some(rect) = overlay_box(tree, idx) else {
            log::warn!("show overlay: node `{target}` has no box");
            return false;
        };
        let config = tree
            .get(idx)
            .map(|n| ResizeConfig::from_attributes(&n.attributes))
            .unwrap_or_default();

        if self.chrome.is_none() {
            log::debug!("creating selection overlay");
        }
        self.chrome = Some(OverlayChrome {
            rect,
            visible: true,
            handles: layout_handles(rect, &config, self.handle_size),
        });
        self.target = Some(target);
        true
    }

    /// Hide the overlay. The chrome is kept for reuse.
    pub fn hide(&mut self, _cap: &StageCrew) {
        if let Some(chrome) = self.chrome.as_mut() {
            chrome.visible = false;
        }
        self.target = None;
    }

    /// Recompute the box after `changed` moved or resized. Only the bound
    /// target or one of its ancestors affects the overlay. Returns `true`
    /// when the overlay was updated.
    pub fn resync(&mut self, cap: &StageCrew, tree: &VisualTree, changed: NodeId) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        if target != changed {
            let (Some(changed_idx), Some(target_idx)) = (tree.index_of(changed), tree.index_of(target))
            else {
                return false;
            };
            if !tree.is_ancestor_of(changed_idx, target_idx) {
                return false;
            }
        }
        self.resync_bound(cap, tree)
    }

    /// Recompute the box for whatever target is bound. A target that no
    /// longer exists hides the overlay.
    pub fn resync_bound(&mut self, cap: &StageCrew, tree: &VisualTree) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let Some(rect) = tree.index_of(target).and_then(|idx| overlay_box(tree, idx)) else {
            log::warn!("overlay target `{target}` disappeared; hiding overlay");
            self.hide(cap);
            return false;
        };
        let handle_size = self.handle_size;
        if let Some(chrome) = self.chrome.as_mut() {
            chrome.rect = rect;
            for h in chrome.handles.iter_mut() {
                h.rect = handle_square(rect, h.handle, handle_size);
            }
        }
        true
    }
}

impl Default for SelectionOverlay {
    fn default() -> Self {
        Self::new(8.0)
    }
}

/// Canvas-relative box of a node.
pub fn overlay_box(tree: &VisualTree, idx: NodeIndex) -> Option<Rect> {
    let canvas = tree.canvas_rect();
    let node = tree.get(idx)?;
    if let Some(inline) = node.inline_box() {
        let parent_rect = tree
            .parent(idx)
            .and_then(|p| tree.bounding_rect(p))
            .unwrap_or(canvas);
        let offset = parent_rect.relative_to(&canvas);
        return Some(inline.translate(offset.x, offset.y));
    }
    tree.bounding_rect(idx).map(|r| r.relative_to(&canvas))
}

/// Starting box of a gesture, in the parent's frame: the inline box when it
/// is complete, otherwise the live box converted into the parent's frame.
pub fn gesture_baseline(tree: &VisualTree, idx: NodeIndex) -> Option<Rect> {
    let node = tree.get(idx)?;
    if let Some(inline) = node.inline_box() {
        return Some(inline);
    }
    let live = tree.bounding_rect(idx)?;
    let parent = tree
        .parent(idx)
        .and_then(|p| tree.bounding_rect(p))
        .unwrap_or_else(|| tree.canvas_rect());
    Some(live.relative_to(&parent))
}

fn layout_handles(rect: Rect, config: &ResizeConfig, size: f32) -> [OverlayHandle; 8] {
    Handle::ALL.map(|handle| OverlayHandle {
        handle,
        visible: config.allows(handle),
        rect: handle_square(rect, handle, size),
    })
}

fn handle_square(rect: Rect, handle: Handle, size: f32) -> Rect {
    let (fx, fy) = handle.anchor();
    let cx = rect.x + rect.width * fx;
    let cy = rect.y + rect.height * fy;
    Rect::new(cx - size / 2.0, cy - size / 2.0, size, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::direct_fallback;
    use sc_core::{InlineStyle, VisualNode};

    fn crew() -> StageCrew {
        direct_fallback("test.overlay").unwrap()
    }

    fn node(id: &str, style: &str) -> VisualNode {
        let mut n = VisualNode::element(NodeId::intern(id), "div");
        n.style = InlineStyle::parse(style);
        n
    }

    #[test]
    fn nested_box_sums_ancestor_offsets() {
        let cap = crew();
        let mut tree = VisualTree::new(Rect::new(240.0, 64.0, 1000.0, 800.0));
        let root = tree.root();
        let outer = tree
            .add_node(&cap, root, node("ov_outer", "left: 100px; top: 50px; width: 500px; height: 400px"))
            .unwrap();
        let mid = tree
            .add_node(&cap, outer, node("ov_mid", "left: 20px; top: 30px; width: 300px; height: 200px"))
            .unwrap();
        let leaf = tree
            .add_node(&cap, mid, node("ov_leaf", "left: 7px; top: 9px; width: 40px; height: 25px"))
            .unwrap();

        assert_eq!(overlay_box(&tree, leaf), Some(Rect::new(127.0, 89.0, 40.0, 25.0)));
    }

    #[test]
    fn incomplete_inline_geometry_uses_live_box() {
        let cap = crew();
        let mut tree = VisualTree::new(Rect::new(200.0, 100.0, 800.0, 600.0));
        let root = tree.root();
        let mut legacy = node("ov_legacy", "left: 10px");
        legacy.rendered = Some(Rect::new(260.0, 140.0, 50.0, 20.0));
        let idx = tree.add_node(&cap, root, legacy).unwrap();

        assert_eq!(overlay_box(&tree, idx), Some(Rect::new(60.0, 40.0, 50.0, 20.0)));
    }

    #[test]
    fn show_filters_handles_and_hide_keeps_chrome() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let mut n = node("ov_handles", "left: 0px; top: 0px; width: 100px; height: 50px");
        n.attributes.insert("data-resize-handles".into(), "e,se".into());
        tree.add_node(&cap, root, n).unwrap();

        let mut overlay = SelectionOverlay::default();
        assert!(overlay.show(&cap, &tree, NodeId::intern("ov_handles")));
        let visible: Vec<Handle> = overlay
            .chrome()
            .unwrap()
            .handles
            .iter()
            .filter(|h| h.visible)
            .map(|h| h.handle)
            .collect();
        assert_eq!(visible, vec![Handle::E, Handle::Se]);

        overlay.hide(&cap);
        assert!(!overlay.is_visible());
        assert!(overlay.chrome().is_some());
        assert_eq!(overlay.target(), None);
    }

    #[test]
    fn show_unknown_target_is_a_no_op() {
        let cap = crew();
        let tree = VisualTree::default();
        let mut overlay = SelectionOverlay::default();
        assert!(!overlay.show(&cap, &tree, NodeId::intern("ov_missing")));
        assert!(overlay.chrome().is_none());
    }

    #[test]
    fn resync_ignores_unbound_targets() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let a = tree
            .add_node(&cap, root, node("ov_a", "left: 0px; top: 0px; width: 10px; height: 10px"))
            .unwrap();
        tree.add_node(&cap, root, node("ov_b", "left: 0px; top: 0px; width: 10px; height: 10px"))
            .unwrap();

        let mut overlay = SelectionOverlay::default();
        overlay.show(&cap, &tree, NodeId::intern("ov_a"));
        tree.set_inline_box(&cap, a, Rect::new(5.0, 5.0, 30.0, 30.0));

        assert!(!overlay.resync(&cap, &tree, NodeId::intern("ov_b")));
        assert!(overlay.resync(&cap, &tree, NodeId::intern("ov_a")));
        assert_eq!(overlay.visible_rect(), Some(Rect::new(5.0, 5.0, 30.0, 30.0)));

        tree.remove_node(&cap, a);
        assert!(!overlay.resync_bound(&cap, &tree));
        assert!(!overlay.is_visible());
    }

    #[test]
    fn resync_follows_a_moved_ancestor() {
        let cap = crew();
        let mut tree = VisualTree::default();
        let root = tree.root();
        let parent = tree
            .add_node(&cap, root, node("ov_parent", "left: 500px; top: 0px; width: 200px; height: 100px"))
            .unwrap();
        tree.add_node(&cap, parent, node("ov_child", "left: 10px; top: 10px; width: 20px; height: 20px"))
            .unwrap();

        let mut overlay = SelectionOverlay::default();
        overlay.show(&cap, &tree, NodeId::intern("ov_child"));
        assert_eq!(overlay.visible_rect(), Some(Rect::new(510.0, 10.0, 20.0, 20.0)));

        tree.set_inline_box(&cap, parent, Rect::new(550.0, 0.0, 150.0, 100.0));
        assert!(overlay.resync(&cap, &tree, NodeId::intern("ov_parent")));
        assert_eq!(overlay.visible_rect(), Some(Rect::new(560.0, 10.0, 20.0, 20.0)));
    }
}
