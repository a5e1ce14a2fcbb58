//! The visual surface handed to stage-crew handlers.

use crate::config::EngineConfig;
use crate::overlay::SelectionOverlay;
use sc_core::hierarchy::CssClassDef;
use sc_core::{NodeId, StageCrew, VisualTree};
use serde::Serialize;
use std::collections::BTreeMap;

/// Record of an applied SVG attribute change, for panels that mirror the
/// selected sub-node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgAttributeChange {
    pub id: NodeId,
    pub path: String,
    pub attribute: String,
    /// `None` when the attribute was removed.
    pub value: Option<String>,
}

/// Everything on the visual side of the contract: the live tree, the
/// overlay chrome, and the injected stylesheet.
#[derive(Debug, Clone)]
pub struct Stage {
    pub tree: VisualTree,
    pub overlay: SelectionOverlay,
    /// CSS classes injected by the creation pipeline, keyed by class name.
    pub stylesheet: BTreeMap<String, CssClassDef>,
    svg_change: Option<SvgAttributeChange>,
}

impl Stage {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tree: VisualTree::new(config.canvas_frame),
            overlay: SelectionOverlay::new(config.handle_size),
            stylesheet: BTreeMap::new(),
            svg_change: None,
        }
    }

    /// Inject a CSS class unless one with the same name is already present.
    pub fn inject_css(&mut self, _cap: &StageCrew, def: CssClassDef) -> bool {
        if self.stylesheet.contains_key(&def.name) {
            return false;
        }
        log::debug!("injecting css class `{}`", def.name);
        self.stylesheet.insert(def.name.clone(), def);
        true
    }

    pub(crate) fn record_svg_change(&mut self, change: SvgAttributeChange) {
        self.svg_change = Some(change);
    }

    /// Latest SVG change without consuming it.
    pub fn last_svg_change(&self) -> Option<&SvgAttributeChange> {
        self.svg_change.as_ref()
    }

    /// Consume the latest SVG change. This is the notification step: panels
    /// call it after an edit to decide whether to refresh.
    pub fn take_svg_change(&mut self) -> Option<SvgAttributeChange> {
        self.svg_change.take()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
