//! Integration tests: HierarchySpec JSON → validation, and live tree →
//! export.

use pretty_assertions::assert_eq;
use sc_core::hierarchy::{CssClassDef, Layout};
use sc_core::{
    Beat, HierarchySpec, InlineStyle, NodeId, Rect, StageCrew, VisualNode, VisualTree,
    export_hierarchy, validate,
};
use std::collections::BTreeMap;

fn crew() -> StageCrew {
    let _ = env_logger::builder().is_test(true).try_init();
    StageCrew::mint(&Beat::stage_crew("test.hierarchy")).expect("stage-crew beat")
}

// ─── Parsing ────────────────────────────────────────────────────────────

#[test]
fn card_fixture_parses_with_defaults() {
    let spec = HierarchySpec::from_json(include_str!("fixtures/card.json")).unwrap();
    assert_eq!(spec.components.len(), 2);

    let root = spec.component("card_root").unwrap();
    assert_eq!(root.component_type, "card");
    assert_eq!(root.template.tag, "article");
    assert_eq!(root.template.style["zIndex"], serde_json::json!(2));
    assert_eq!(root.layout.to_rect(), Rect::new(24.0, 16.0, 320.0, 180.0));
    assert_eq!(root.created_at, Some(serde_json::json!(1714644000000_u64)));

    let title = spec.component("card_title").unwrap();
    assert_eq!(title.parent_id.as_deref(), Some("card_root"));
    assert!(title.template.class_refs.is_empty());
    assert_eq!(title.content.as_deref(), Some("Quarterly"));

    assert!(validate(&spec, None).is_empty());
    let back = HierarchySpec::from_json(&spec.to_json().unwrap()).unwrap();
    assert_eq!(back, spec);
}

#[test]
fn malformed_json_is_reported() {
    assert!(HierarchySpec::from_json("{\"components\": [{\"id\": 3}]}").is_err());
    assert!(HierarchySpec::from_json("not json").is_err());
}

// ─── Validation ─────────────────────────────────────────────────────────

#[test]
fn broken_fixture_reports_every_rule() {
    let spec = HierarchySpec::from_json(include_str!("fixtures/broken_layout.json")).unwrap();
    let diags = validate(&spec, None);
    let found: Vec<(&str, &str)> = diags
        .iter()
        .map(|d| (d.rule, d.component_id.as_str()))
        .collect();

    assert_eq!(
        found,
        vec![
            ("duplicate-sibling-index", "bl_two"),
            ("duplicate-id", "bl_one"),
            ("dangling-parent", "bl_lost"),
            ("parent-cycle", "bl_ping"),
            ("parent-cycle", "bl_pong"),
            ("missing-id", ""),
        ]
    );
}

#[test]
fn duplicate_id_does_not_rewrite_the_parent_chain() {
    let spec = HierarchySpec::from_json(
        r#"{"components":[
            {"id":"hs_dup_a","parentId":null,"siblingIndex":0},
            {"id":"hs_dup_b","parentId":"hs_dup_a","siblingIndex":0},
            {"id":"hs_dup_a","parentId":"hs_dup_b","siblingIndex":1}
        ]}"#,
    )
    .unwrap();
    let diags = validate(&spec, None);
    let found: Vec<(&str, &str)> = diags
        .iter()
        .map(|d| (d.rule, d.component_id.as_str()))
        .collect();
    assert_eq!(found, vec![("duplicate-id", "hs_dup_a")]);
}

#[test]
fn live_parent_is_not_dangling() {
    let cap = crew();
    let mut tree = VisualTree::default();
    let root = tree.root();
    tree.add_node(&cap, root, VisualNode::element(NodeId::intern("hs_existing"), "div"))
        .unwrap();

    let spec = HierarchySpec::from_json(
        r#"{"components":[{"id":"hs_child","parentId":"hs_existing","siblingIndex":0}]}"#,
    )
    .unwrap();
    assert_eq!(validate(&spec, None)[0].rule, "dangling-parent");
    assert!(validate(&spec, Some(&tree)).is_empty());
}

// ─── Export ─────────────────────────────────────────────────────────────

#[test]
fn export_describes_nesting_order_and_geometry() {
    let cap = crew();
    let mut tree = VisualTree::default();
    let root = tree.root();

    let mut panel = VisualNode::element(NodeId::intern("hs_panel"), "section");
    panel.classes.push("rx-panel".into());
    panel.classes.push("rx-comp-panel-hs_panel".into());
    panel.style = InlineStyle::parse("left: 10px; top: 20px; width: 300px; height: 200px; color: red");
    panel.attributes.insert("data-component-type".into(), "panel".into());
    let panel = tree.add_node(&cap, root, panel).unwrap();

    let mut second = VisualNode::element(NodeId::intern("hs_second"), "p");
    second.style = InlineStyle::parse("left: 1px; top: 2px");
    tree.add_node(&cap, panel, VisualNode::text("lead ")).unwrap();
    let first = tree
        .add_node(&cap, panel, VisualNode::element(NodeId::intern("hs_first"), "p"))
        .unwrap();
    tree.add_node(&cap, panel, second).unwrap();
    tree.add_node(&cap, first, VisualNode::text("Hi")).unwrap();

    let css = BTreeMap::from([(
        "rx-panel".to_string(),
        CssClassDef {
            name: "rx-panel".into(),
            content: ".rx-panel {}".into(),
        },
    )]);
    let spec = export_hierarchy(&tree, &css);

    let summary: Vec<(&str, Option<&str>, i64)> = spec
        .components
        .iter()
        .map(|c| (c.id.as_str(), c.parent_id.as_deref(), c.sibling_index))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("hs_panel", None, 0),
            ("hs_first", Some("hs_panel"), 0),
            ("hs_second", Some("hs_panel"), 1),
        ]
    );

    let panel = &spec.components[0];
    assert_eq!(panel.component_type, "panel");
    assert_eq!(panel.template.class_refs, vec!["rx-panel".to_string()]);
    assert_eq!(
        panel.template.style,
        BTreeMap::from([("color".to_string(), serde_json::json!("red"))])
    );
    assert!(panel.template.attributes.is_empty());
    assert_eq!(
        panel.layout,
        Layout {
            x: 10.0,
            y: 20.0,
            width: 300.0,
            height: 200.0
        }
    );
    assert_eq!(panel.content.as_deref(), Some("lead "));

    assert_eq!(spec.components[1].component_type, "p");
    assert_eq!(spec.components[1].content.as_deref(), Some("Hi"));
    assert_eq!(spec.components[2].layout.width, 0.0);
    assert_eq!(spec.css_classes, css);
}
