//! Declarative layout description used for import and export.
//!
//! A `HierarchySpec` is a flat list of components. Nesting is expressed by
//! `parentId`, sibling order by `siblingIndex`, and geometry by `layout`
//! (always in the parent's frame, like inline style).

use crate::error::CoreResult;
use crate::geometry::Rect;
use crate::model::{NodeKind, VisualNode, VisualTree};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Class prefix of the per-instance class the creation pipeline adds.
pub const INSTANCE_CLASS_PREFIX: &str = "rx-comp";

/// Attribute recording the component type a node was created from.
pub const ATTR_COMPONENT_TYPE: &str = "data-component-type";

const GEOMETRY_PROPS: [&str; 4] = ["left", "top", "width", "height"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySpec {
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub css_classes: BTreeMap<String, CssClassDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub id: String,
    #[serde(rename = "type", default)]
    pub component_type: String,
    #[serde(default)]
    pub template: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sibling_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub class_refs: Vec<String>,
    /// Style values may be strings or bare numbers in the JSON.
    #[serde(default)]
    pub style: BTreeMap<String, serde_json::Value>,
    /// Extra attributes the creation pipeline applies (e.g. `data-resize-*`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            class_refs: Vec::new(),
            style: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }
}

fn default_tag() -> String {
    "div".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl Layout {
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CssClassDef {
    pub name: String,
    pub content: String,
}

impl HierarchySpec {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn component(&self, id: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// Render a JSON style value as CSS text. Bare numbers are emitted as-is.
pub fn style_value_to_css(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Instance class for a component, e.g. `rx-comp-button-hero_cta`.
pub fn instance_class(component_type: &str, id: &str) -> String {
    let kind = if component_type.is_empty() {
        "component"
    } else {
        component_type
    };
    format!("{INSTANCE_CLASS_PREFIX}-{kind}-{id}")
}

// ─── Validation ──────────────────────────────────────────────────────────

/// A structural finding in a `HierarchySpec`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDiagnostic {
    pub component_id: String,
    pub message: String,
    /// Short rule identifier (e.g. "dangling-parent").
    pub rule: &'static str,
}

/// Check a spec for duplicate ids, duplicate sibling indexes, dangling
/// parent references and parent cycles. A parent that is not in the spec
/// but already exists in `live` is not dangling.
#[must_use]
pub fn validate(spec: &HierarchySpec, live: Option<&VisualTree>) -> Vec<SpecDiagnostic> {
    let mut diags = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut siblings: HashSet<(Option<&str>, i64)> = HashSet::new();
    // First occurrence wins, matching what an import builds.
    let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
    for c in spec.components.iter().filter(|c| !c.id.trim().is_empty()) {
        parents.entry(c.id.as_str()).or_insert(c.parent_id.as_deref());
    }

    for c in &spec.components {
        if c.id.trim().is_empty() {
            diags.push(SpecDiagnostic {
                component_id: c.id.clone(),
                message: "component has an empty id".into(),
                rule: "missing-id",
            });
            continue;
        }
        if !seen.insert(c.id.as_str()) {
            diags.push(SpecDiagnostic {
                component_id: c.id.clone(),
                message: format!("id `{}` appears more than once; later entries are skipped", c.id),
                rule: "duplicate-id",
            });
            continue;
        }
        if !siblings.insert((c.parent_id.as_deref(), c.sibling_index)) {
            diags.push(SpecDiagnostic {
                component_id: c.id.clone(),
                message: format!(
                    "siblingIndex {} is already used under {}",
                    c.sibling_index,
                    c.parent_id.as_deref().map_or("the canvas".to_string(), |p| format!("`{p}`"))
                ),
                rule: "duplicate-sibling-index",
            });
        }
        if let Some(parent) = c.parent_id.as_deref() {
            let in_spec = parents.contains_key(parent);
            let in_live = live.is_some_and(|t| {
                crate::id::NodeId::get(parent).is_some_and(|id| t.index_of(id).is_some())
            });
            if !in_spec && !in_live {
                diags.push(SpecDiagnostic {
                    component_id: c.id.clone(),
                    message: format!("parentId `{parent}` does not exist"),
                    rule: "dangling-parent",
                });
            } else if in_spec && has_parent_cycle(&parents, c.id.as_str()) {
                diags.push(SpecDiagnostic {
                    component_id: c.id.clone(),
                    message: format!("parent chain of `{}` loops back on itself", c.id),
                    rule: "parent-cycle",
                });
            }
        }
    }
    diags
}

fn has_parent_cycle(parents: &HashMap<&str, Option<&str>>, start: &str) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = start;
    while let Some(Some(parent)) = parents.get(current) {
        if *parent == start || !visited.insert(*parent) {
            return true;
        }
        current = *parent;
    }
    false
}

// ─── Export ──────────────────────────────────────────────────────────────

/// Describe the live tree as a `HierarchySpec`.
///
/// Components are emitted parents-first in DOM order. `siblingIndex` is the
/// element position under the parent, so importing the result rebuilds the
/// same shape and order.
#[must_use]
pub fn export_hierarchy(
    tree: &VisualTree,
    css_classes: &BTreeMap<String, CssClassDef>,
) -> HierarchySpec {
    let mut components = Vec::new();
    for idx in tree.descendants(tree.root()) {
        let Some(node) = tree.get(idx) else { continue };
        if !node.is_element() {
            continue;
        }
        components.push(export_component(tree, idx, node));
    }
    HierarchySpec {
        components,
        css_classes: css_classes.clone(),
    }
}

fn export_component(tree: &VisualTree, idx: NodeIndex, node: &VisualNode) -> ComponentSpec {
    let parent = tree.parent(idx);
    let parent_id = parent
        .filter(|p| tree.get(*p).is_some_and(|n| !matches!(n.kind, NodeKind::Canvas)))
        .and_then(|p| tree.get(p))
        .map(|n| n.id.as_str().to_string());
    let sibling_index = parent
        .map(|p| tree.element_children(p).iter().position(|c| *c == idx).unwrap_or(0))
        .unwrap_or(0) as i64;

    let component_type = node
        .attribute(ATTR_COMPONENT_TYPE)
        .map_or_else(|| node.tag.clone(), str::to_string);

    let style = node
        .style
        .iter()
        .filter(|(name, _)| !GEOMETRY_PROPS.contains(name))
        .map(|(name, value)| (name.to_string(), serde_json::Value::String(value.to_string())))
        .collect();

    let attributes = node
        .attributes
        .iter()
        .filter(|(name, _)| name.as_str() != ATTR_COMPONENT_TYPE)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let instance_prefix = format!("{INSTANCE_CLASS_PREFIX}-");
    let class_refs = node
        .classes
        .iter()
        .filter(|c| !c.starts_with(&instance_prefix))
        .cloned()
        .collect();

    let layout = Layout {
        x: node.style.get_px("left").unwrap_or(0.0),
        y: node.style.get_px("top").unwrap_or(0.0),
        width: node.style.get_px("width").unwrap_or(0.0),
        height: node.style.get_px("height").unwrap_or(0.0),
    };

    ComponentSpec {
        id: node.id.as_str().to_string(),
        component_type,
        template: Template {
            tag: node.tag.clone(),
            class_refs,
            style,
            attributes,
        },
        content: tree.text_content(idx),
        layout,
        parent_id,
        sibling_index,
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn component(id: &str, parent: Option<&str>, sibling_index: i64) -> ComponentSpec {
        ComponentSpec {
            id: id.to_string(),
            component_type: "box".into(),
            template: Template::default(),
            content: None,
            layout: Layout::default(),
            parent_id: parent.map(str::to_string),
            sibling_index,
            created_at: None,
        }
    }

    #[test]
    fn parses_the_documented_shape() {
        let json = r#"{
            "components": [{
                "id": "hero",
                "type": "card",
                "template": { "tag": "section", "classRefs": ["card"], "style": { "zIndex": 3, "color": "red" } },
                "content": "Hello",
                "layout": { "x": 10, "y": 20, "width": 300, "height": 120 },
                "parentId": null,
                "siblingIndex": 0,
                "createdAt": 1712000000
            }],
            "cssClasses": { "card": { "name": "card", "content": ".card { padding: 8px; }" } }
        }"#;
        let spec = HierarchySpec::from_json(json).unwrap();
        let hero = spec.component("hero").unwrap();
        assert_eq!(hero.component_type, "card");
        assert_eq!(hero.template.tag, "section");
        assert_eq!(hero.layout.to_rect(), Rect::new(10.0, 20.0, 300.0, 120.0));
        assert_eq!(hero.parent_id, None);
        assert_eq!(style_value_to_css(&hero.template.style["zIndex"]).as_deref(), Some("3"));
        assert_eq!(spec.css_classes["card"].content, ".card { padding: 8px; }");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(HierarchySpec::from_json("{ \"components\": 4 }").is_err());
    }

    #[test]
    fn validate_flags_structural_problems() {
        let spec = HierarchySpec {
            components: vec![
                component("p", None, 0),
                component("a", Some("p"), 0),
                component("b", Some("p"), 0),
                component("orphan", Some("ghost"), 0),
                component("a", None, 4),
                component("x", Some("y"), 0),
                component("y", Some("x"), 0),
            ],
            css_classes: BTreeMap::new(),
        };
        let rules: Vec<(String, &str)> = validate(&spec, None)
            .into_iter()
            .map(|d| (d.component_id, d.rule))
            .collect();
        assert_eq!(
            rules,
            vec![
                ("b".to_string(), "duplicate-sibling-index"),
                ("orphan".to_string(), "dangling-parent"),
                ("a".to_string(), "duplicate-id"),
                ("x".to_string(), "parent-cycle"),
                ("y".to_string(), "parent-cycle"),
            ]
        );
    }

    #[test]
    fn instance_class_naming() {
        assert_eq!(instance_class("button", "cta"), "rx-comp-button-cta");
        assert_eq!(instance_class("", "cta"), "rx-comp-component-cta");
    }
}
