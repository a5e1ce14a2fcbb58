//! The orchestration boundary.
//!
//! Canvas operations never call handlers directly. They issue
//! `dispatch(route, payload)` and the mounted [`Dispatcher`] decides which
//! plugin sequence runs. The call is fallible at all times: the orchestrator
//! may not be mounted, a route may be unknown, or a beat may fail.
//!
//! [`SequenceRegistry`] is the in-process dispatcher. Routes are a closed
//! enum rather than free-form strings, and each beat's handler is stored in
//! a shape that matches its kind, so a pure or io handler cannot be handed
//! the stage at all.

use crate::error::{CanvasError, DispatchError};
use crate::stage::Stage;
use sc_core::contract::{Beat, HandlerKind, StageCrew, lint_beats};
use sc_core::{CoreError, Handle, NodeId, Rect};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Flat key/value payload. Alias to reduce noise in signatures.
pub type Payload = Map<String, Value>;

// ─── Payload keys ────────────────────────────────────────────────────────

pub const KEY_ID: &str = "id";
pub const KEY_HANDLE: &str = "handle";
pub const KEY_START_LEFT: &str = "startLeft";
pub const KEY_START_TOP: &str = "startTop";
pub const KEY_START_WIDTH: &str = "startWidth";
pub const KEY_START_HEIGHT: &str = "startHeight";
pub const KEY_DX: &str = "dx";
pub const KEY_DY: &str = "dy";
pub const KEY_PATH: &str = "path";
pub const KEY_ATTRIBUTE: &str = "attribute";
pub const KEY_VALUE: &str = "value";
pub const KEY_COMPONENT: &str = "component";
pub const KEY_CSS_CLASSES: &str = "cssClasses";

// ─── Routes ──────────────────────────────────────────────────────────────

/// Semantic operation keys understood by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ComponentCreate,
    ComponentSelect,
    ComponentDeselect,
    ResizeStart,
    ResizeMove,
    ResizeEnd,
    DragMove,
    SvgSetAttribute,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::ComponentCreate,
        Route::ComponentSelect,
        Route::ComponentDeselect,
        Route::ResizeStart,
        Route::ResizeMove,
        Route::ResizeEnd,
        Route::DragMove,
        Route::SvgSetAttribute,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Route::ComponentCreate => "canvas.component.create",
            Route::ComponentSelect => "canvas.component.select",
            Route::ComponentDeselect => "canvas.component.deselect",
            Route::ResizeStart => "canvas.component.resize.start",
            Route::ResizeMove => "canvas.component.resize.move",
            Route::ResizeEnd => "canvas.component.resize.end",
            Route::DragMove => "canvas.component.drag.move",
            Route::SvgSetAttribute => "canvas.component.svg.set-attribute",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.key() == key)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The fallible routing call every canvas operation goes through.
pub trait Dispatcher {
    fn dispatch(&mut self, stage: &mut Stage, route: Route, payload: &Payload) -> Result<(), DispatchError>;
}

/// A dispatcher that is never mounted. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmountedDispatcher;

impl Dispatcher for UnmountedDispatcher {
    fn dispatch(&mut self, _stage: &mut Stage, route: Route, _payload: &Payload) -> Result<(), DispatchError> {
        log::trace!("dropping `{route}`: no dispatcher mounted");
        Err(DispatchError::Unmounted)
    }
}

// ─── Step context ────────────────────────────────────────────────────────

/// Data shared by the beats of one sequence run.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub route: Route,
    /// The payload the sequence was dispatched with.
    pub payload: Payload,
    /// Scratch space beats use to hand results to later beats.
    pub scratch: Payload,
}

impl StepContext {
    pub fn new(route: Route, payload: Payload) -> Self {
        Self {
            route,
            payload,
            scratch: Payload::new(),
        }
    }

    pub fn str(&self, key: &'static str) -> Result<&str, CanvasError> {
        payload_str(&self.payload, key).ok_or(CanvasError::Payload(key))
    }

    pub fn id(&self) -> Result<NodeId, CanvasError> {
        self.str(KEY_ID).map(NodeId::intern)
    }

    pub fn handle(&self) -> Result<Handle, CanvasError> {
        self.str(KEY_HANDLE)
            .ok()
            .and_then(Handle::parse)
            .ok_or(CanvasError::Payload(KEY_HANDLE))
    }

    /// Baseline box from `startLeft/Top/Width/Height`.
    pub fn baseline(&self) -> Result<Rect, CanvasError> {
        let get = |key: &'static str| payload_f32(&self.payload, key).ok_or(CanvasError::Payload(key));
        Ok(Rect::new(
            get(KEY_START_LEFT)?,
            get(KEY_START_TOP)?,
            get(KEY_START_WIDTH)?,
            get(KEY_START_HEIGHT)?,
        ))
    }

    /// A delta component. Missing or non-numeric reads as NaN, which the
    /// resize math treats as "no usable delta".
    pub fn delta(&self, key: &'static str) -> f32 {
        payload_f32(&self.payload, key).unwrap_or(f32::NAN)
    }
}

pub fn payload_str<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

/// Numbers, and strings that parse as numbers, both count.
pub fn payload_f32(payload: &Payload, key: &str) -> Option<f32> {
    match payload.get(key)? {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Payload fields describing a baseline box.
pub fn baseline_fields(payload: &mut Payload, rect: Rect) {
    payload.insert(KEY_START_LEFT.into(), Value::from(rect.x));
    payload.insert(KEY_START_TOP.into(), Value::from(rect.y));
    payload.insert(KEY_START_WIDTH.into(), Value::from(rect.width));
    payload.insert(KEY_START_HEIGHT.into(), Value::from(rect.height));
}

// ─── Handlers ────────────────────────────────────────────────────────────

pub type HandlerResult = Result<(), CanvasError>;
type DataFn = Box<dyn Fn(&mut StepContext) -> HandlerResult>;
type StageFn = Box<dyn Fn(&StageCrew, &mut Stage, &mut StepContext) -> HandlerResult>;

/// A handler in the shape its kind allows. Only `StageCrew` receives the
/// stage and a capability token.
pub enum Handler {
    Pure(DataFn),
    StageCrew(StageFn),
    Io(DataFn),
}

impl Handler {
    pub fn pure(f: impl Fn(&mut StepContext) -> HandlerResult + 'static) -> Self {
        Handler::Pure(Box::new(f))
    }

    pub fn stage_crew(f: impl Fn(&StageCrew, &mut Stage, &mut StepContext) -> HandlerResult + 'static) -> Self {
        Handler::StageCrew(Box::new(f))
    }

    pub fn io(f: impl Fn(&mut StepContext) -> HandlerResult + 'static) -> Self {
        Handler::Io(Box::new(f))
    }

    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Pure(_) => HandlerKind::Pure,
            Handler::StageCrew(_) => HandlerKind::StageCrew,
            Handler::Io(_) => HandlerKind::Io,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{}", self.kind())
    }
}

/// A registered plugin sequence: ordered beats, each with its handler.
#[derive(Debug)]
pub struct Sequence {
    pub plugin_id: String,
    pub sequence_id: String,
    beats: Vec<(Beat, Handler)>,
}

impl Sequence {
    pub fn new(plugin_id: impl Into<String>, sequence_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            sequence_id: sequence_id.into(),
            beats: Vec::new(),
        }
    }

    pub fn beat(mut self, beat: Beat, handler: Handler) -> Self {
        self.beats.push((beat, handler));
        self
    }

    pub fn beats(&self) -> impl Iterator<Item = &Beat> {
        self.beats.iter().map(|(b, _)| b)
    }

    fn qualified_name(&self) -> String {
        format!("{}/{}", self.plugin_id, self.sequence_id)
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Routing table from `Route` to a kind-checked sequence.
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    routes: HashMap<Route, Sequence>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in canvas plugin.
    pub fn with_canvas_plugin() -> Self {
        let mut registry = Self::new();
        for (route, sequence) in crate::handlers::canvas_plugin() {
            if let Err(err) = registry.register(route, sequence) {
                log::error!("built-in canvas plugin failed to register `{route}`: {err}");
            }
        }
        registry
    }

    /// Register `sequence` for `route`, replacing any previous one.
    ///
    /// Refused when a beat's handler shape differs from its binding, in
    /// particular when an unbound beat is given a stage-crew handler.
    pub fn register(&mut self, route: Route, sequence: Sequence) -> Result<(), DispatchError> {
        let beats: Vec<Beat> = sequence.beats().cloned().collect();
        let shapes: Vec<(&str, HandlerKind)> = sequence
            .beats
            .iter()
            .map(|(b, h)| (b.handler.as_str(), h.kind()))
            .collect();
        for diag in lint_beats(&beats, &shapes) {
            match diag.severity {
                sc_core::contract::ContractSeverity::Error => {
                    log::error!("{}: {}", sequence.qualified_name(), diag.message);
                    return Err(DispatchError::Contract(CoreError::ContractViolation(diag.message)));
                }
                sc_core::contract::ContractSeverity::Warning => {
                    log::warn!("{}: {}", sequence.qualified_name(), diag.message);
                }
            }
        }
        log::debug!("registered `{route}` → {}", sequence.qualified_name());
        self.routes.insert(route, sequence);
        Ok(())
    }

    pub fn is_registered(&self, route: Route) -> bool {
        self.routes.contains_key(&route)
    }

    pub fn unregister(&mut self, route: Route) -> Option<Sequence> {
        self.routes.remove(&route)
    }
}

impl Dispatcher for SequenceRegistry {
    fn dispatch(&mut self, stage: &mut Stage, route: Route, payload: &Payload) -> Result<(), DispatchError> {
        let sequence = self
            .routes
            .get(&route)
            .ok_or_else(|| DispatchError::UnknownRoute(route.key().to_string()))?;
        log::trace!("dispatch `{route}` → {}", sequence.qualified_name());

        let mut ctx = StepContext::new(route, payload.clone());
        for (beat, handler) in &sequence.beats {
            let result = match handler {
                Handler::Pure(f) | Handler::Io(f) => f(&mut ctx),
                Handler::StageCrew(f) => match StageCrew::mint(beat) {
                    Some(cap) => f(&cap, stage, &mut ctx),
                    None => Err(CanvasError::Core(CoreError::ContractViolation(format!(
                        "`{}` is not bound to stage-crew",
                        beat.handler
                    )))),
                },
            };
            if let Err(err) = result {
                return Err(DispatchError::BeatFailed {
                    sequence: sequence.qualified_name(),
                    beat: beat.handler.clone(),
                    message: err.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Surface token for the direct path an operation takes when dispatch is
/// unavailable or failed. Apart from [`SequenceRegistry`], this is the only
/// place the crate mints one.
pub(crate) fn direct_fallback(handler: &str) -> Option<StageCrew> {
    log::trace!("direct fallback `{handler}`");
    StageCrew::mint(&Beat::stage_crew(handler))
}
