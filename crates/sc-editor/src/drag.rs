//! Drag-move gestures.
//!
//! Same shape as a resize: a baseline captured at pointer-down, moves
//! relative to the gesture origin, dispatch first and direct mutation once
//! the dispatcher has failed.

use crate::dispatch::{
    Dispatcher, KEY_DX, KEY_DY, KEY_ID, Payload, Route, baseline_fields, direct_fallback,
};
use crate::handlers::{apply_move, finish_gesture};
use crate::notify::{GeometryNotice, GestureOutcome, NoticeGate};
use crate::overlay::gesture_baseline;
use crate::stage::Stage;
use sc_core::{NodeId, Rect, VisualNode};
use serde_json::Value;

const FALLBACK_HANDLER: &str = "drag.direct";

/// State of one drag gesture.
#[derive(Debug, Clone)]
pub struct MoveSession {
    target: NodeId,
    baseline: Rect,
    last: Rect,
    fallback: bool,
    listeners_attached: bool,
    gate: NoticeGate,
}

impl MoveSession {
    /// Capture the baseline of `target`. `None` if the node does not exist.
    pub fn begin(stage: &Stage, target: NodeId, dead_zone_px: f32) -> Option<Self> {
        let Some(idx) = stage.tree.index_of(target) else {
            log::warn!("move start: node `{target}` not found");
            return None;
        };
        let baseline = gesture_baseline(&stage.tree, idx)?;
        Some(Self {
            target,
            baseline,
            last: baseline,
            fallback: false,
            listeners_attached: true,
            gate: NoticeGate::new(dead_zone_px),
        })
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn last(&self) -> Rect {
        self.last
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn is_attached(&self) -> bool {
        self.listeners_attached
    }

    pub fn has_pending_notice(&self) -> bool {
        self.gate.has_pending()
    }

    pub fn flush(&mut self) -> Option<GeometryNotice> {
        self.gate.flush()
    }

    /// Detach and settle the gesture: resync the overlay from the node's
    /// final inline style. Returns `None` if it already ended.
    pub fn end(&mut self, stage: &mut Stage) -> Option<GestureOutcome> {
        if !std::mem::replace(&mut self.listeners_attached, false) {
            return None;
        }
        if let Some(cap) = direct_fallback(FALLBACK_HANDLER)
            && let Err(err) = finish_gesture(&cap, stage, self.target)
        {
            log::warn!("move end for `{}`: {err}", self.target);
        }
        let rect = stage
            .tree
            .get_by_id(self.target)
            .and_then(VisualNode::inline_box)
            .unwrap_or(self.last);
        let pending = self.gate.flush();
        Some(GestureOutcome {
            id: self.target,
            rect,
            fallback: self.fallback,
            notice: (rect != self.baseline)
                .then_some(GeometryNotice { id: self.target, rect })
                .or(pending),
        })
    }
}

/// Move the session's node by `(dx, dy)` from the gesture origin. Returns
/// the box now in effect.
pub fn move_node(
    session: &mut MoveSession,
    stage: &mut Stage,
    dispatcher: &mut dyn Dispatcher,
    dx: f32,
    dy: f32,
) -> Rect {
    if !session.listeners_attached || !dx.is_finite() || !dy.is_finite() {
        return session.last;
    }
    let target = session.target;

    if !session.fallback {
        let mut payload = Payload::new();
        payload.insert(KEY_ID.into(), Value::from(target.as_str()));
        baseline_fields(&mut payload, session.baseline);
        payload.insert(KEY_DX.into(), Value::from(dx));
        payload.insert(KEY_DY.into(), Value::from(dy));
        if let Err(err) = dispatcher.dispatch(stage, Route::DragMove, &payload) {
            log::warn!("drag move for `{target}` failed ({err}); moving directly for the rest of the gesture");
            session.fallback = true;
        }
    }
    if session.fallback {
        if let Some(cap) = direct_fallback(FALLBACK_HANDLER)
            && let Err(err) = apply_move(&cap, stage, target, session.baseline, dx, dy)
        {
            log::warn!("drag fallback for `{target}`: {err}");
        }
    }

    if let Some(rect) = stage.tree.get_by_id(target).and_then(VisualNode::inline_box) {
        session.last = rect;
        session.gate.offer(dx, dy, GeometryNotice { id: target, rect });
    }
    session.last
}
