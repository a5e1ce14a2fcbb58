//! The canvas engine: one stage, one dispatcher, one gesture at a time.
//!
//! This is the surface a host shell drives. It owns the stage, routes every
//! operation through the mounted dispatcher, and recovers locally when the
//! dispatcher is missing or fails.

use crate::config::EngineConfig;
use crate::dispatch::{
    Dispatcher, KEY_ATTRIBUTE, KEY_ID, KEY_PATH, KEY_VALUE, Payload, Route, SequenceRegistry,
    direct_fallback,
};
use crate::error::CanvasResult;
use crate::import::{HierarchyBuilder, ImportReport};
use crate::input::{PointerEvent, PointerTarget};
use crate::notify::{GeometryNotice, GestureOutcome};
use crate::overlay::SelectionOverlay;
use crate::stage::{Stage, SvgAttributeChange};
use crate::tools::{GestureController, GestureStep};
use sc_core::{HierarchySpec, NodeId, export_hierarchy};
use serde_json::Value;
use std::collections::VecDeque;

const SELECTION_DIRECT: &str = "selection.direct";

pub struct CanvasEngine {
    stage: Stage,
    dispatcher: Box<dyn Dispatcher>,
    gestures: GestureController,
    importer: HierarchyBuilder,
    /// Final notices from finished gestures, one per node, oldest first.
    finished: VecDeque<GeometryNotice>,
}

impl CanvasEngine {
    /// Engine with the built-in canvas plugin mounted.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_dispatcher(config, Box::new(SequenceRegistry::with_canvas_plugin()))
    }

    pub fn with_dispatcher(config: EngineConfig, dispatcher: Box<dyn Dispatcher>) -> Self {
        Self {
            stage: Stage::new(&config),
            dispatcher,
            gestures: GestureController::new(&config),
            importer: HierarchyBuilder::new(),
            finished: VecDeque::new(),
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Mutable access to the stage, for hosts that mirror layout results
    /// (e.g. `rendered` boxes) into the tree.
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn overlay(&self) -> &SelectionOverlay {
        &self.stage.overlay
    }

    /// Swap the mounted dispatcher.
    pub fn mount(&mut self, dispatcher: Box<dyn Dispatcher>) {
        self.dispatcher = dispatcher;
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select `id`, binding the overlay to it. The previous target is
    /// dropped; a gesture on another node is ended first. Returns whether
    /// the overlay is now bound to `id`.
    pub fn select(&mut self, id: NodeId) -> bool {
        if self.gestures.active_target().is_some_and(|t| t != id) {
            self.end_gesture();
        }
        let payload = id_payload(id);
        if let Err(err) = self.dispatcher.dispatch(&mut self.stage, Route::ComponentSelect, &payload) {
            log::warn!("select `{id}` not dispatched ({err}); showing overlay directly");
            if let Some(cap) = direct_fallback(SELECTION_DIRECT) {
                self.stage.overlay.show(&cap, &self.stage.tree, id);
            }
        }
        self.stage.overlay.target() == Some(id)
    }

    pub fn deselect(&mut self) {
        if let Err(err) = self
            .dispatcher
            .dispatch(&mut self.stage, Route::ComponentDeselect, &Payload::new())
        {
            log::warn!("deselect not dispatched ({err}); hiding overlay directly");
            if let Some(cap) = direct_fallback(SELECTION_DIRECT) {
                self.stage.overlay.hide(&cap);
            }
        }
    }

    // ─── Import / export ─────────────────────────────────────────────────

    pub fn import(&mut self, spec: &HierarchySpec) -> ImportReport {
        self.importer.build(spec, &mut self.stage, &mut *self.dispatcher)
    }

    pub fn import_json(&mut self, json: &str) -> CanvasResult<ImportReport> {
        let spec = HierarchySpec::from_json(json)?;
        Ok(self.import(&spec))
    }

    pub fn export(&self) -> HierarchySpec {
        export_hierarchy(&self.stage.tree, &self.stage.stylesheet)
    }

    pub fn export_json(&self) -> CanvasResult<String> {
        Ok(self.export().to_json()?)
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Feed one pointer event. A pointer-down on a node body selects it
    /// before the move gesture starts.
    pub fn pointer(&mut self, event: PointerEvent) -> GestureStep {
        if let PointerEvent::Down {
            target: PointerTarget::Node(id),
            ..
        } = event
        {
            self.select(id);
        }
        let step = self
            .gestures
            .handle(&event, &mut self.stage, &mut *self.dispatcher);
        match &step {
            GestureStep::Finished(outcome)
            | GestureStep::Started {
                superseded: Some(outcome),
                ..
            } => self.queue(outcome),
            _ => {}
        }
        step
    }

    pub fn is_gesture_attached(&self) -> bool {
        self.gestures.is_attached()
    }

    /// End the active gesture, if any, as a pointer-up would.
    pub fn end_gesture(&mut self) -> Option<GestureOutcome> {
        let outcome = self
            .gestures
            .end_active(&mut self.stage, &mut *self.dispatcher)?;
        self.queue(&outcome);
        Some(outcome)
    }

    /// Animation-frame tick: at most one geometry notice. Final boxes of
    /// finished gestures go out first, one per frame in the order the
    /// gestures ended; the live gesture's notice stays pending until they
    /// are drained.
    pub fn flush_frame(&mut self) -> Option<GeometryNotice> {
        self.finished.pop_front().or_else(|| self.gestures.flush())
    }

    /// Whether a notice is waiting for the next frame.
    pub fn has_pending_notice(&self) -> bool {
        !self.finished.is_empty() || self.gestures.has_pending_notice()
    }

    fn queue(&mut self, outcome: &GestureOutcome) {
        let Some(notice) = outcome.notice else {
            return;
        };
        match self.finished.iter_mut().find(|queued| queued.id == notice.id) {
            Some(queued) => queued.rect = notice.rect,
            None => self.finished.push_back(notice),
        }
    }

    // ─── SVG ─────────────────────────────────────────────────────────────

    /// Set or remove an attribute on a vector sub-node. Returns whether the
    /// edit was applied. Failures are logged; there is no direct fallback.
    pub fn set_svg_attribute(&mut self, id: NodeId, path: &str, attribute: &str, value: Option<&str>) -> bool {
        let mut payload = id_payload(id);
        payload.insert(KEY_PATH.into(), Value::from(path));
        payload.insert(KEY_ATTRIBUTE.into(), Value::from(attribute));
        payload.insert(KEY_VALUE.into(), value.map_or(Value::Null, Value::from));
        match self
            .dispatcher
            .dispatch(&mut self.stage, Route::SvgSetAttribute, &payload)
        {
            Ok(()) => true,
            Err(err) => {
                log::warn!("svg edit on `{id}` not applied: {err}");
                false
            }
        }
    }

    pub fn take_svg_change(&mut self) -> Option<SvgAttributeChange> {
        self.stage.take_svg_change()
    }
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn id_payload(id: NodeId) -> Payload {
    let mut p = Payload::new();
    p.insert(KEY_ID.into(), Value::from(id.as_str()));
    p
}
