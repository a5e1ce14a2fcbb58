//! WASM bridge for Stagecraft: exposes the canvas engine to a browser host.
//!
//! Compiled via `wasm-pack build --target web`. The host owns the DOM; it
//! feeds pointer events in, pulls geometry notices out once per animation
//! frame, and mirrors the overlay box onto its own chrome element.

use sc_core::{Handle, NodeId, Rect};
use sc_editor::{CanvasEngine, EngineConfig, GestureStep, ImportReport, PointerEvent, SelectionOverlay};
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;

/// The browser-facing canvas controller.
#[wasm_bindgen]
pub struct StageCanvas {
    engine: CanvasEngine,
}

#[wasm_bindgen]
impl StageCanvas {
    /// Create a controller for a canvas placed at the given viewport frame.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_x: f32, canvas_y: f32, width: f32, height: f32) -> Self {
        install_console_hooks();

        let config = EngineConfig {
            canvas_frame: Rect::new(canvas_x, canvas_y, width, height),
            ..EngineConfig::default()
        };
        Self {
            engine: CanvasEngine::new(config),
        }
    }

    /// Import a hierarchy JSON document.
    /// Returns `{"ok":true,"created":[...],"diagnostics":[...],"warnings":[...]}`
    /// or `{"ok":false,"error":"..."}`.
    pub fn import_json(&mut self, json: &str) -> String {
        match self.engine.import_json(json) {
            Ok(report) => report_json(&report),
            Err(e) => error_json(&e.to_string()),
        }
    }

    /// Export the live tree as hierarchy JSON. Empty string on failure.
    pub fn export_json(&self) -> String {
        self.engine.export_json().unwrap_or_else(|e| {
            log::error!("export failed: {e}");
            String::new()
        })
    }

    /// Bind the overlay to `id`. Returns whether it is now bound there.
    pub fn select(&mut self, id: &str) -> bool {
        match NodeId::get(id) {
            Some(id) => self.engine.select(id),
            None => false,
        }
    }

    pub fn deselect(&mut self) {
        self.engine.deselect();
    }

    /// Pointer went down on a resize handle of `id`. `handle` is a compass
    /// token (`"n"`, `"se"`, ...). Returns whether a gesture started.
    pub fn pointer_down_handle(&mut self, x: f32, y: f32, id: &str, handle: &str) -> bool {
        let (Some(id), Some(handle)) = (NodeId::get(id), Handle::parse(handle)) else {
            return false;
        };
        let step = self.engine.pointer(PointerEvent::down_on_handle(x, y, id, handle));
        matches!(step, GestureStep::Started { .. })
    }

    /// Pointer went down on the body of `id`: select it and start a move.
    pub fn pointer_down_body(&mut self, x: f32, y: f32, id: &str) -> bool {
        let Some(id) = NodeId::get(id) else {
            return false;
        };
        let step = self.engine.pointer(PointerEvent::down_on_node(x, y, id));
        matches!(step, GestureStep::Started { .. })
    }

    /// Returns the box now in effect as JSON, or an empty string when the
    /// move was ignored.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> String {
        match self.engine.pointer(PointerEvent::Move { x, y }) {
            GestureStep::Updated(rect) => to_json(&rect),
            _ => String::new(),
        }
    }

    /// Returns the gesture outcome as JSON, or an empty string when no
    /// gesture was attached.
    pub fn pointer_up(&mut self, x: f32, y: f32) -> String {
        step_outcome(self.engine.pointer(PointerEvent::Up { x, y }))
    }

    /// Pointer cancelled or capture lost. Same result shape as `pointer_up`.
    pub fn pointer_cancel(&mut self) -> String {
        step_outcome(self.engine.pointer(PointerEvent::Cancel))
    }

    pub fn is_gesture_attached(&self) -> bool {
        self.engine.is_gesture_attached()
    }

    /// Call once per animation frame. Returns `{"id":...,"rect":{...}}` or
    /// an empty string when nothing changed since the last frame.
    pub fn flush_frame(&mut self) -> String {
        self.engine
            .flush_frame()
            .map(|notice| to_json(&notice))
            .unwrap_or_default()
    }

    /// Overlay state: `{"visible":bool,"target":id|null,"rect":...,"handles":[...]}`.
    pub fn overlay_json(&self) -> String {
        overlay_value(self.engine.overlay()).to_string()
    }

    /// Set an attribute on the SVG sub-node at `path` (e.g. `"0/1"`) inside
    /// `id`. A missing or empty `value` removes the attribute.
    pub fn set_svg_attribute(&mut self, id: &str, path: &str, attribute: &str, value: Option<String>) -> bool {
        let Some(id) = NodeId::get(id) else {
            return false;
        };
        self.engine
            .set_svg_attribute(id, path, attribute, value.as_deref())
    }

    /// The last applied SVG change as JSON, or an empty string.
    pub fn take_svg_change(&mut self) -> String {
        self.engine
            .take_svg_change()
            .map(|change| to_json(&change))
            .unwrap_or_default()
    }
}

fn step_outcome(step: GestureStep) -> String {
    match step {
        GestureStep::Finished(outcome) => to_json(&outcome),
        _ => String::new(),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("serialization failed: {e}");
        String::new()
    })
}

fn error_json(message: &str) -> String {
    json!({ "ok": false, "error": message }).to_string()
}

fn report_json(report: &ImportReport) -> String {
    let diagnostics: Vec<_> = report
        .diagnostics
        .iter()
        .map(|d| json!({ "componentId": d.component_id, "rule": d.rule, "message": d.message }))
        .collect();
    json!({
        "ok": true,
        "created": report.created,
        "diagnostics": diagnostics,
        "warnings": report.warnings,
    })
    .to_string()
}

fn overlay_value(overlay: &SelectionOverlay) -> serde_json::Value {
    let Some(chrome) = overlay.chrome() else {
        return json!({ "visible": false, "target": null });
    };
    let handles: Vec<_> = chrome
        .handles
        .iter()
        .map(|h| json!({ "handle": h.handle, "visible": h.visible, "rect": h.rect }))
        .collect();
    json!({
        "visible": chrome.visible,
        "target": overlay.target(),
        "rect": chrome.rect,
        "handles": handles,
    })
}

/// Route panics and `log` records to the browser console. Native builds
/// (tests) keep the default hook and no logger.
fn install_console_hooks() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::debug!("console logger already installed");
        }
    }
}

// ─── Standalone validation (no canvas needed) ───────────────────────────

/// Validate hierarchy JSON without importing it.
/// Returns `{"ok":true,"diagnostics":[...]}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_hierarchy(json: &str) -> String {
    match sc_core::HierarchySpec::from_json(json) {
        Ok(spec) => {
            let diagnostics: Vec<_> = sc_core::validate(&spec, None)
                .iter()
                .map(|d| json!({ "componentId": d.component_id, "rule": d.rule, "message": d.message }))
                .collect();
            json!({ "ok": true, "diagnostics": diagnostics }).to_string()
        }
        Err(e) => error_json(&e.to_string()),
    }
}
