//! Rebuilding a live tree from a [`HierarchySpec`].
//!
//! Every component is created through the same `canvas.component.create`
//! dispatch as interactive creation, so class injection, instance-class
//! naming and attribute application never diverge. Once all components
//! exist, the builder assembles them: reparent, reorder by `siblingIndex`,
//! then apply each `layout` in the parent's frame.

use crate::dispatch::{Dispatcher, KEY_COMPONENT, KEY_CSS_CLASSES, Payload, Route, direct_fallback};
use crate::stage::Stage;
use sc_core::hierarchy::{ComponentSpec, SpecDiagnostic, validate};
use sc_core::{HierarchySpec, NodeId, NodeIndex};
use std::collections::{HashMap, HashSet};

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Components that were created, in spec order.
    pub created: Vec<NodeId>,
    /// Structural findings from validation.
    pub diagnostics: Vec<SpecDiagnostic>,
    /// Recoverable problems met while building.
    pub warnings: Vec<String>,
}

impl ImportReport {
    fn warn(&mut self, message: String) {
        log::warn!("import: {message}");
        self.warnings.push(message);
    }
}

const ASSEMBLE_HANDLER: &str = "import.assemble";

#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder;

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `spec` into `stage`. Never fails as a whole: each problem is
    /// logged and reported, and the rest of the import carries on.
    pub fn build(&self, spec: &HierarchySpec, stage: &mut Stage, dispatcher: &mut dyn Dispatcher) -> ImportReport {
        let mut report = ImportReport {
            diagnostics: validate(spec, Some(&stage.tree)),
            ..ImportReport::default()
        };
        for d in &report.diagnostics {
            log::warn!("import: `{}`: {} [{}]", d.component_id, d.message, d.rule);
        }
        let root_bound: HashSet<String> = report
            .diagnostics
            .iter()
            .filter(|d| matches!(d.rule, "dangling-parent" | "parent-cycle"))
            .map(|d| d.component_id.clone())
            .collect();

        // Create.
        let css_classes = match serde_json::to_value(&spec.css_classes) {
            Ok(v) => v,
            Err(err) => {
                report.warn(format!("stylesheet could not be encoded: {err}"));
                serde_json::Value::Null
            }
        };
        let mut seen = HashSet::new();
        let mut built: Vec<(usize, &ComponentSpec, NodeIndex)> = Vec::new();
        for (order, component) in spec.components.iter().enumerate() {
            if component.id.trim().is_empty() || !seen.insert(component.id.as_str()) {
                continue;
            }
            if let Some(idx) = self.create(component, &css_classes, stage, dispatcher, &mut report) {
                built.push((order, component, idx));
            }
        }

        let Some(cap) = direct_fallback(ASSEMBLE_HANDLER) else {
            report.warn(format!("`{ASSEMBLE_HANDLER}` could not be granted the stage"));
            return report;
        };

        // Reparent.
        let root = stage.tree.root();
        let mut parents: HashMap<NodeIndex, Vec<(i64, usize, NodeIndex)>> = HashMap::new();
        for &(order, component, idx) in &built {
            let parent = match component.parent_id.as_deref() {
                None => root,
                Some(_) if root_bound.contains(component.id.as_str()) => {
                    report.warn(format!("`{}` attached at canvas root", component.id));
                    root
                }
                Some(parent_id) => match NodeId::get(parent_id).and_then(|id| stage.tree.index_of(id)) {
                    Some(parent) => match stage.tree.append_child(&cap, parent, idx) {
                        Ok(()) => parent,
                        Err(err) => {
                            report.warn(format!("`{}` attached at canvas root: {err}", component.id));
                            root
                        }
                    },
                    None => {
                        report.warn(format!(
                            "`{}` attached at canvas root: parent `{parent_id}` was not built",
                            component.id
                        ));
                        root
                    }
                },
            };
            let parent = stage.tree.parent(idx).unwrap_or(parent);
            parents
                .entry(parent)
                .or_default()
                .push((component.sibling_index, order, idx));
        }

        // Reorder. Children that were already there keep their place in
        // front; imported ones follow, sorted by siblingIndex then spec order.
        for (parent, mut imported) in parents {
            imported.sort_by_key(|&(sibling_index, order, _)| (sibling_index, order));
            let imported_set: HashSet<NodeIndex> = imported.iter().map(|&(_, _, idx)| idx).collect();
            let order: Vec<NodeIndex> = stage
                .tree
                .children(parent)
                .iter()
                .copied()
                .filter(|c| !imported_set.contains(c))
                .chain(imported.iter().map(|&(_, _, idx)| idx))
                .collect();
            if let Err(err) = stage.tree.reorder_children(&cap, parent, &order) {
                report.warn(format!("children could not be reordered: {err}"));
            }
        }

        // Layout.
        for &(_, component, idx) in &built {
            stage.tree.set_inline_box(&cap, idx, component.layout.to_rect());
        }

        stage.overlay.resync_bound(&cap, &stage.tree);
        log::debug!(
            "import built {} of {} components",
            report.created.len(),
            spec.components.len()
        );
        report
    }

    fn create(
        &self,
        component: &ComponentSpec,
        css_classes: &serde_json::Value,
        stage: &mut Stage,
        dispatcher: &mut dyn Dispatcher,
        report: &mut ImportReport,
    ) -> Option<NodeIndex> {
        let encoded = match serde_json::to_value(component) {
            Ok(v) => v,
            Err(err) => {
                report.warn(format!("`{}` could not be encoded: {err}", component.id));
                return None;
            }
        };
        let mut payload = Payload::new();
        payload.insert(KEY_COMPONENT.into(), encoded);
        payload.insert(KEY_CSS_CLASSES.into(), css_classes.clone());

        if let Err(err) = dispatcher.dispatch(stage, Route::ComponentCreate, &payload) {
            report.warn(format!("`{}` was not created: {err}", component.id));
            return None;
        }
        let id = NodeId::intern(&component.id);
        match stage.tree.index_of(id) {
            Some(idx) => {
                report.created.push(id);
                Some(idx)
            }
            None => {
                report.warn(format!("create of `{}` reported success but no node exists", component.id));
                None
            }
        }
    }
}
