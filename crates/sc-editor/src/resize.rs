//! Resize gestures.
//!
//! A gesture is `start`, any number of `on_move`, then `end`. Every phase is
//! dispatched. If a `move` or `end` dispatch fails, the session switches to
//! direct stage mutation with the same math for the rest of the gesture, so
//! a broken orchestrator never freezes or reverts an in-progress resize.
//!
//! All per-gesture state (baseline, fallback flag, notification gate) lives
//! in [`ResizeSession`], which the caller threads through the phases.

use crate::config::EngineConfig;
use crate::dispatch::{
    Dispatcher, KEY_DX, KEY_DY, KEY_HANDLE, KEY_ID, Payload, Route, baseline_fields, direct_fallback,
};
use crate::handlers::{apply_resize, finish_gesture};
use crate::notify::{GeometryNotice, GestureOutcome, NoticeGate};
use crate::overlay::gesture_baseline;
use crate::stage::Stage;
use sc_core::{Handle, NodeId, Rect, ResizeConfig, VisualNode};
use serde_json::Value;
use std::fmt;

const FALLBACK_HANDLER: &str = "resize.fallback";

/// Phase reported to a session observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePhase {
    Start,
    Move,
    End,
}

pub type ResizeObserver = Box<dyn FnMut(ResizePhase, &Rect)>;

/// State of one resize gesture.
pub struct ResizeSession {
    target: NodeId,
    handle: Handle,
    baseline: Rect,
    last: Rect,
    fallback: bool,
    listeners_attached: bool,
    gate: NoticeGate,
    observer: Option<ResizeObserver>,
}

impl ResizeSession {
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn baseline(&self) -> Rect {
        self.baseline
    }

    /// Box after the most recent applied move.
    pub fn last(&self) -> Rect {
        self.last
    }

    /// Whether the session has given up on the dispatcher.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Whether the session still listens for pointer moves. Cleared by `end`.
    pub fn is_attached(&self) -> bool {
        self.listeners_attached
    }

    pub fn has_pending_notice(&self) -> bool {
        self.gate.has_pending()
    }

    /// Drain the coalesced notice at frame time.
    pub fn flush(&mut self) -> Option<GeometryNotice> {
        self.gate.flush()
    }

    fn notify(&mut self, phase: ResizePhase, rect: Rect) {
        if let Some(observer) = self.observer.as_mut() {
            observer(phase, &rect);
        }
    }

    fn payload(&self) -> Payload {
        let mut p = Payload::new();
        p.insert(KEY_ID.into(), Value::from(self.target.as_str()));
        p.insert(KEY_HANDLE.into(), Value::from(self.handle.as_str()));
        baseline_fields(&mut p, self.baseline);
        p
    }
}

impl fmt::Debug for ResizeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeSession")
            .field("target", &self.target)
            .field("handle", &self.handle)
            .field("baseline", &self.baseline)
            .field("last", &self.last)
            .field("fallback", &self.fallback)
            .field("listeners_attached", &self.listeners_attached)
            .finish_non_exhaustive()
    }
}

/// Drives resize sessions against a stage and a dispatcher.
#[derive(Debug, Clone)]
pub struct ResizeEngine {
    dead_zone_px: f32,
}

impl ResizeEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            dead_zone_px: config.dead_zone_px,
        }
    }

    /// Begin a gesture on `target` via `handle`.
    ///
    /// Returns `None`, without dispatching, when the node does not exist or
    /// its resize config rejects the handle.
    pub fn start(
        &self,
        stage: &mut Stage,
        dispatcher: &mut dyn Dispatcher,
        target: NodeId,
        handle: Handle,
    ) -> Option<ResizeSession> {
        self.start_observed(stage, dispatcher, target, handle, None)
    }

    /// Like [`start`](Self::start), reporting every phase to `observer`.
    pub fn start_observed(
        &self,
        stage: &mut Stage,
        dispatcher: &mut dyn Dispatcher,
        target: NodeId,
        handle: Handle,
        observer: Option<ResizeObserver>,
    ) -> Option<ResizeSession> {
        let Some(idx) = stage.tree.index_of(target) else {
            log::warn!("resize start: node `{target}` not found");
            return None;
        };
        let config = stage
            .tree
            .get(idx)
            .map(|n| ResizeConfig::from_attributes(&n.attributes))
            .unwrap_or_default();
        if !config.allows(handle) {
            log::warn!("resize start: `{target}` does not allow the {handle} handle");
            return None;
        }
        let baseline = gesture_baseline(&stage.tree, idx)?;

        let mut session = ResizeSession {
            target,
            handle,
            baseline,
            last: baseline,
            fallback: false,
            listeners_attached: true,
            gate: NoticeGate::new(self.dead_zone_px),
            observer,
        };
        if let Err(err) = dispatcher.dispatch(stage, Route::ResizeStart, &session.payload()) {
            log::warn!("resize start for `{target}` not dispatched: {err}");
        }
        session.notify(ResizePhase::Start, baseline);
        log::debug!("resize `{target}` via {handle} from {baseline:?}");
        Some(session)
    }

    /// Apply one pointer move of `(dx, dy)` from the gesture origin. Returns
    /// the box now in effect and never fails.
    pub fn on_move(
        &self,
        session: &mut ResizeSession,
        stage: &mut Stage,
        dispatcher: &mut dyn Dispatcher,
        dx: f32,
        dy: f32,
    ) -> Rect {
        if !session.listeners_attached {
            return session.last;
        }
        if !dx.is_finite() || !dy.is_finite() {
            log::debug!("resize `{}`: dropping non-finite move ({dx}, {dy})", session.target);
            return session.last;
        }

        if !session.fallback {
            let mut payload = session.payload();
            payload.insert(KEY_DX.into(), Value::from(dx));
            payload.insert(KEY_DY.into(), Value::from(dy));
            if let Err(err) = dispatcher.dispatch(stage, Route::ResizeMove, &payload) {
                log::warn!(
                    "resize move for `{}` failed ({err}); applying directly for the rest of the gesture",
                    session.target
                );
                session.fallback = true;
            }
        }
        if session.fallback {
            self.apply_direct(session, stage, dx, dy);
        }

        let Some(current) = self.inline_box(stage, session.target) else {
            return session.last;
        };
        session.last = current;
        session.notify(ResizePhase::Move, current);
        session.gate.offer(
            dx,
            dy,
            GeometryNotice {
                id: session.target,
                rect: current,
            },
        );
        current
    }

    /// Finish the gesture and detach its listeners. Calling `end` on a
    /// session that already ended returns `None`.
    pub fn end(
        &self,
        session: &mut ResizeSession,
        stage: &mut Stage,
        dispatcher: &mut dyn Dispatcher,
    ) -> Option<GestureOutcome> {
        if !session.listeners_attached {
            return None;
        }
        let target = session.target;

        if !session.fallback
            && let Err(err) = dispatcher.dispatch(stage, Route::ResizeEnd, &session.payload())
        {
            log::warn!("resize end for `{target}` failed ({err}); finalizing directly");
            session.fallback = true;
        }
        if session.fallback {
            if let Some(cap) = direct_fallback(FALLBACK_HANDLER)
                && let Err(err) = finish_gesture(&cap, stage, target)
            {
                log::warn!("resize end for `{target}`: {err}");
            }
        }

        session.listeners_attached = false;
        let rect = self.inline_box(stage, target).unwrap_or(session.last);
        session.last = rect;
        session.notify(ResizePhase::End, rect);

        let pending = session.gate.flush();
        let notice = (rect != session.baseline)
            .then_some(GeometryNotice { id: target, rect })
            .or(pending);
        log::debug!("resize `{target}` ended at {rect:?}");
        Some(GestureOutcome {
            id: target,
            rect,
            fallback: session.fallback,
            notice,
        })
    }

    fn apply_direct(&self, session: &ResizeSession, stage: &mut Stage, dx: f32, dy: f32) {
        let Some(cap) = direct_fallback(FALLBACK_HANDLER) else {
            return;
        };
        if let Err(err) = apply_resize(&cap, stage, session.target, session.handle, session.baseline, dx, dy) {
            log::warn!("resize fallback for `{}`: {err}", session.target);
        }
    }

    fn inline_box(&self, stage: &Stage, id: NodeId) -> Option<Rect> {
        stage.tree.get_by_id(id).and_then(VisualNode::inline_box)
    }
}

impl Default for ResizeEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{SequenceRegistry, UnmountedDispatcher};
    use pretty_assertions::assert_eq;
    use sc_core::InlineStyle;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stage_with(id: &str, style: &str, attrs: &[(&str, &str)]) -> Stage {
        let cap = direct_fallback("test.setup").unwrap();
        let mut stage = Stage::default();
        let mut node = VisualNode::element(NodeId::intern(id), "div");
        node.style = InlineStyle::parse(style);
        for (k, v) in attrs {
            node.attributes.insert(k.to_string(), v.to_string());
        }
        let root = stage.tree.root();
        stage.tree.add_node(&cap, root, node).unwrap();
        stage
    }

    #[test]
    fn dispatched_gesture_resizes_and_tracks_overlay() {
        let mut stage = stage_with("rs_box", "left: 10px; top: 10px; width: 100px; height: 50px", &[]);
        let mut registry = SequenceRegistry::with_canvas_plugin();
        let cap = direct_fallback("test.select").unwrap();
        stage.overlay.show(&cap, &stage.tree, NodeId::intern("rs_box"));

        let engine = ResizeEngine::default();
        let mut session = engine
            .start(&mut stage, &mut registry, NodeId::intern("rs_box"), Handle::Se)
            .unwrap();
        assert_eq!(
            engine.on_move(&mut session, &mut stage, &mut registry, 20.0, 10.0),
            Rect::new(10.0, 10.0, 120.0, 60.0)
        );
        assert_eq!(stage.overlay.visible_rect(), Some(Rect::new(10.0, 10.0, 120.0, 60.0)));

        let outcome = engine.end(&mut session, &mut stage, &mut registry).unwrap();
        assert!(!outcome.fallback);
        assert_eq!(outcome.rect, Rect::new(10.0, 10.0, 120.0, 60.0));
        assert!(!session.is_attached());
        assert_eq!(engine.end(&mut session, &mut stage, &mut registry), None);
    }

    #[test]
    fn unmounted_dispatcher_falls_back_and_keeps_last_move() {
        let mut stage = stage_with("rs_fallback", "left: 0px; top: 0px; width: 100px; height: 100px", &[]);
        let engine = ResizeEngine::default();
        let mut dispatcher = UnmountedDispatcher;
        let mut session = engine
            .start(&mut stage, &mut dispatcher, NodeId::intern("rs_fallback"), Handle::E)
            .unwrap();

        engine.on_move(&mut session, &mut stage, &mut dispatcher, 10.0, 0.0);
        assert!(session.is_fallback());
        engine.on_move(&mut session, &mut stage, &mut dispatcher, 37.0, 0.0);
        let outcome = engine.end(&mut session, &mut stage, &mut dispatcher).unwrap();

        assert!(outcome.fallback);
        assert_eq!(outcome.rect, Rect::new(0.0, 0.0, 137.0, 100.0));
        let node = stage.tree.get_by_id(NodeId::intern("rs_fallback")).unwrap();
        assert_eq!(node.inline_box(), Some(Rect::new(0.0, 0.0, 137.0, 100.0)));
    }

    #[test]
    fn non_finite_move_is_dropped() {
        let mut stage = stage_with("rs_nan", "left: 0px; top: 0px; width: 40px; height: 40px", &[]);
        let engine = ResizeEngine::default();
        let mut dispatcher = UnmountedDispatcher;
        let mut session = engine
            .start(&mut stage, &mut dispatcher, NodeId::intern("rs_nan"), Handle::S)
            .unwrap();
        engine.on_move(&mut session, &mut stage, &mut dispatcher, 0.0, 12.0);
        let after = engine.on_move(&mut session, &mut stage, &mut dispatcher, f32::NAN, 5.0);
        assert_eq!(after, Rect::new(0.0, 0.0, 40.0, 52.0));
    }

    #[test]
    fn disabled_node_never_starts() {
        let mut stage = stage_with(
            "rs_disabled",
            "left: 0px; top: 0px; width: 40px; height: 40px",
            &[("data-resize-enabled", "false")],
        );
        let engine = ResizeEngine::default();
        assert!(
            engine
                .start(&mut stage, &mut UnmountedDispatcher, NodeId::intern("rs_disabled"), Handle::E)
                .is_none()
        );
        assert!(
            engine
                .start(&mut stage, &mut UnmountedDispatcher, NodeId::intern("rs_missing"), Handle::E)
                .is_none()
        );
    }

    #[test]
    fn observer_sees_every_phase() {
        let mut stage = stage_with("rs_observed", "left: 0px; top: 0px; width: 10px; height: 10px", &[]);
        let phases = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&phases);
        let engine = ResizeEngine::default();
        let mut registry = SequenceRegistry::with_canvas_plugin();
        let mut session = engine
            .start_observed(
                &mut stage,
                &mut registry,
                NodeId::intern("rs_observed"),
                Handle::E,
                Some(Box::new(move |phase: ResizePhase, rect: &Rect| sink.borrow_mut().push((phase, rect.width)))),
            )
            .unwrap();
        engine.on_move(&mut session, &mut stage, &mut registry, 5.0, 0.0);
        engine.end(&mut session, &mut stage, &mut registry);

        assert_eq!(
            phases.borrow().as_slice(),
            &[
                (ResizePhase::Start, 10.0),
                (ResizePhase::Move, 15.0),
                (ResizePhase::End, 15.0)
            ]
        );
    }
}
