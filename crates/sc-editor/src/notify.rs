//! Downstream geometry notification.
//!
//! The stage updates on every pointer move. Observers such as a properties
//! panel only hear about it once per animation frame, and always get the
//! latest box.

use sc_core::{NodeId, Rect};
use serde::Serialize;

/// Latest geometry of a node, in its parent's frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeometryNotice {
    pub id: NodeId,
    pub rect: Rect,
}

/// Last-write-wins slot drained once per frame.
#[derive(Debug, Clone)]
pub struct FrameCoalescer<T> {
    latest: Option<T>,
    scheduled: bool,
}

impl<T> Default for FrameCoalescer<T> {
    fn default() -> Self {
        Self {
            latest: None,
            scheduled: false,
        }
    }
}

impl<T> FrameCoalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing anything pending. Returns `true` when the
    /// caller should request an animation frame (nothing was scheduled yet).
    pub fn push(&mut self, value: T) -> bool {
        self.latest = Some(value);
        !std::mem::replace(&mut self.scheduled, true)
    }

    /// Drain the pending value at frame time.
    pub fn flush(&mut self) -> Option<T> {
        self.scheduled = false;
        self.latest.take()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }
}

/// Per-gesture notification gate: a dead zone on the first move, then
/// frame coalescing.
#[derive(Debug, Clone)]
pub struct NoticeGate {
    dead_zone_px: f32,
    armed: bool,
    coalescer: FrameCoalescer<GeometryNotice>,
}

impl NoticeGate {
    pub fn new(dead_zone_px: f32) -> Self {
        Self {
            dead_zone_px,
            armed: false,
            coalescer: FrameCoalescer::new(),
        }
    }

    /// Offer a notice produced by a move of `(dx, dy)` from the gesture
    /// origin. Returns `true` when a frame should be requested.
    pub fn offer(&mut self, dx: f32, dy: f32, notice: GeometryNotice) -> bool {
        if !self.armed {
            if dx.abs().max(dy.abs()) < self.dead_zone_px {
                return false;
            }
            self.armed = true;
        }
        self.coalescer.push(notice)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn has_pending(&self) -> bool {
        self.coalescer.is_scheduled()
    }

    pub fn flush(&mut self) -> Option<GeometryNotice> {
        self.coalescer.flush()
    }
}

/// Summary of a finished gesture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureOutcome {
    pub id: NodeId,
    /// Final inline box, in the parent's frame.
    pub rect: Rect,
    /// Whether any step ran on the direct-mutation fallback.
    pub fallback: bool,
    /// Final notice for observers, if the geometry changed.
    pub notice: Option<GeometryNotice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(w: f32) -> GeometryNotice {
        GeometryNotice {
            id: NodeId::intern("notify_n"),
            rect: Rect::new(0.0, 0.0, w, 10.0),
        }
    }

    #[test]
    fn coalescer_keeps_latest_and_requests_one_frame() {
        let mut c = FrameCoalescer::new();
        assert!(c.push(1));
        assert!(!c.push(2));
        assert!(!c.push(3));
        assert!(c.is_scheduled());
        assert_eq!(c.flush(), Some(3));
        assert_eq!(c.flush(), None);
        assert!(c.push(4));
    }

    #[test]
    fn dead_zone_only_gates_the_first_move() {
        let mut gate = NoticeGate::new(3.0);
        assert!(!gate.offer(1.0, 2.0, notice(11.0)));
        assert_eq!(gate.flush(), None);

        assert!(gate.offer(0.0, -3.5, notice(12.0)));
        assert!(gate.is_armed());
        // Once armed, small moves still replace the pending notice.
        assert!(!gate.offer(0.5, 0.0, notice(13.0)));
        assert_eq!(gate.flush(), Some(notice(13.0)));
    }
}
