//! Attribute edits on sub-nodes of vector content.
//!
//! A sub-node is addressed by its component's id plus an element-index
//! path (see [`SvgPath`]). Only attributes on the fixed whitelist can be
//! written; anything else is refused before the tree is touched.

use crate::error::CanvasResult;
use crate::stage::{Stage, SvgAttributeChange};
use sc_core::{
    CoreError, CoreResult, NodeId, NodeIndex, StageCrew, SvgPath, VisualTree, is_whitelisted_attribute,
    resolve_svg_path,
};

/// Resolve `path` under the component `root_id`.
pub fn resolve_svg_node(tree: &VisualTree, root_id: NodeId, path: &str) -> CoreResult<NodeIndex> {
    let root = tree.require(root_id)?;
    let path = SvgPath::parse(path)?;
    resolve_svg_path(tree, root, &path)
}

/// Set (or, for `None`, remove) `attribute` on the sub-node at `path` and
/// record the change on the stage.
pub fn set_svg_attribute(
    cap: &StageCrew,
    stage: &mut Stage,
    root_id: NodeId,
    path: &str,
    attribute: &str,
    value: Option<&str>,
) -> CanvasResult<SvgAttributeChange> {
    if !is_whitelisted_attribute(attribute) {
        log::warn!("refusing to set `{attribute}` on `{root_id}` at `{path}`: not an editable SVG attribute");
        return Err(CoreError::PolicyRejected(format!("`{attribute}` is not an editable SVG attribute")).into());
    }
    let idx = resolve_svg_node(&stage.tree, root_id, path).inspect_err(|err| {
        log::warn!("svg edit on `{root_id}`: {err}");
    })?;

    let value = value.filter(|v| !v.is_empty());
    match value {
        Some(v) => stage.tree.set_attribute(cap, idx, attribute, v),
        None => {
            stage.tree.remove_attribute(cap, idx, attribute);
        }
    }

    let change = SvgAttributeChange {
        id: root_id,
        path: path.to_string(),
        attribute: attribute.to_string(),
        value: value.map(str::to_string),
    };
    stage.record_svg_change(change.clone());
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanvasError;
    use pretty_assertions::assert_eq;
    use crate::dispatch::direct_fallback;
    use sc_core::VisualNode;

    fn crew() -> StageCrew {
        direct_fallback("test.svg").unwrap()
    }

    /// `svg_icon` > svg > [rect, g > [circle]]
    fn icon_stage() -> Stage {
        let cap = crew();
        let mut stage = Stage::default();
        let t = &mut stage.tree;
        let root = t.root();
        let icon = t
            .add_node(&cap, root, VisualNode::element(NodeId::intern("svg_icon"), "div"))
            .unwrap();
        let svg = t.add_node(&cap, icon, VisualNode::element(NodeId::anonymous(), "svg")).unwrap();
        let rect = t.add_node(&cap, svg, VisualNode::element(NodeId::anonymous(), "rect")).unwrap();
        t.set_attribute(&cap, rect, "fill", "red");
        let g = t.add_node(&cap, svg, VisualNode::element(NodeId::anonymous(), "g")).unwrap();
        t.add_node(&cap, g, VisualNode::element(NodeId::anonymous(), "circle")).unwrap();
        stage
    }

    #[test]
    fn set_records_change() {
        let mut stage = icon_stage();
        set_svg_attribute(&crew(), &mut stage, NodeId::intern("svg_icon"), "0/1/0", "r", Some("12")).unwrap();
        let idx = resolve_svg_node(&stage.tree, NodeId::intern("svg_icon"), "0/1/0").unwrap();
        assert_eq!(stage.tree.get(idx).unwrap().attribute("r"), Some("12"));
        assert_eq!(
            stage.take_svg_change(),
            Some(SvgAttributeChange {
                id: NodeId::intern("svg_icon"),
                path: "0/1/0".into(),
                attribute: "r".into(),
                value: Some("12".into()),
            })
        );
        assert_eq!(stage.take_svg_change(), None);
    }

    #[test]
    fn empty_value_removes() {
        let mut stage = icon_stage();
        set_svg_attribute(&crew(), &mut stage, NodeId::intern("svg_icon"), "0/0", "fill", Some("")).unwrap();
        let idx = resolve_svg_node(&stage.tree, NodeId::intern("svg_icon"), "0/0").unwrap();
        assert_eq!(stage.tree.get(idx).unwrap().attribute("fill"), None);
    }

    #[test]
    fn rejected_edits_leave_no_record() {
        let mut stage = icon_stage();
        let err = set_svg_attribute(&crew(), &mut stage, NodeId::intern("svg_icon"), "0/0", "onload", Some("x()"))
            .unwrap_err();
        assert!(matches!(err, CanvasError::Core(CoreError::PolicyRejected(_))));

        let err = set_svg_attribute(&crew(), &mut stage, NodeId::intern("svg_icon"), "0/7", "fill", Some("blue"))
            .unwrap_err();
        assert!(matches!(err, CanvasError::Core(CoreError::PathOutOfRange { .. })));
        assert_eq!(stage.last_svg_change(), None);
    }
}
