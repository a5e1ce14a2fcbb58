//! Gesture controller for canvas interactions.
//!
//! Turns normalized pointer events into resize or move gestures. The
//! "global listeners" of a gesture are its session: present from
//! pointer-down until any terminal event (up, cancel, lost capture) ends it.
//! A pointer-down while a gesture is still attached ends that gesture first.

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::drag::{MoveSession, move_node};
use crate::input::{PointerEvent, PointerTarget};
use crate::notify::{GeometryNotice, GestureOutcome};
use crate::resize::{ResizeEngine, ResizeSession};
use crate::stage::Stage;
use sc_core::{NodeId, Rect};

/// What handling one event did.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureStep {
    /// Nothing to do for this event.
    Ignored,
    /// A gesture began on `id`. `superseded` is the gesture it replaced.
    Started {
        id: NodeId,
        superseded: Option<GestureOutcome>,
    },
    /// The active gesture applied a move; the box now in effect.
    Updated(Rect),
    Finished(GestureOutcome),
}

#[derive(Debug)]
enum ActiveGesture {
    Resize(ResizeSession),
    Move(MoveSession),
}

impl ActiveGesture {
    fn target(&self) -> NodeId {
        match self {
            ActiveGesture::Resize(s) => s.target(),
            ActiveGesture::Move(s) => s.target(),
        }
    }
}

#[derive(Debug)]
pub struct GestureController {
    active: Option<ActiveGesture>,
    origin: (f32, f32),
    dead_zone_px: f32,
    resize: ResizeEngine,
}

impl GestureController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            active: None,
            origin: (0.0, 0.0),
            dead_zone_px: config.dead_zone_px,
            resize: ResizeEngine::new(config),
        }
    }

    /// Whether a gesture currently holds the pointer.
    pub fn is_attached(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_target(&self) -> Option<NodeId> {
        self.active.as_ref().map(ActiveGesture::target)
    }

    pub fn handle(
        &mut self,
        event: &PointerEvent,
        stage: &mut Stage,
        dispatcher: &mut dyn Dispatcher,
    ) -> GestureStep {
        match *event {
            PointerEvent::Down { x, y, target } => {
                let superseded = self.end_active(stage, dispatcher);
                if superseded.is_some() {
                    log::debug!("pointer down while a gesture was attached; ended it first");
                }
                let started = match target {
                    PointerTarget::Handle { id, handle } => self
                        .resize
                        .start(stage, dispatcher, id, handle)
                        .map(ActiveGesture::Resize),
                    PointerTarget::Node(id) => {
                        MoveSession::begin(stage, id, self.dead_zone_px).map(ActiveGesture::Move)
                    }
                    PointerTarget::Canvas => None,
                };
                match started {
                    Some(gesture) => {
                        let id = gesture.target();
                        self.origin = (x, y);
                        self.active = Some(gesture);
                        GestureStep::Started { id, superseded }
                    }
                    None => superseded.map_or(GestureStep::Ignored, GestureStep::Finished),
                }
            }
            PointerEvent::Move { x, y } => {
                let (dx, dy) = (x - self.origin.0, y - self.origin.1);
                match self.active.as_mut() {
                    Some(ActiveGesture::Resize(session)) => {
                        GestureStep::Updated(self.resize.on_move(session, stage, dispatcher, dx, dy))
                    }
                    Some(ActiveGesture::Move(session)) => {
                        GestureStep::Updated(move_node(session, stage, dispatcher, dx, dy))
                    }
                    None => GestureStep::Ignored,
                }
            }
            PointerEvent::Up { .. } | PointerEvent::Cancel | PointerEvent::LostCapture => self
                .end_active(stage, dispatcher)
                .map_or(GestureStep::Ignored, GestureStep::Finished),
        }
    }

    /// End whatever gesture is attached.
    pub fn end_active(&mut self, stage: &mut Stage, dispatcher: &mut dyn Dispatcher) -> Option<GestureOutcome> {
        match self.active.take()? {
            ActiveGesture::Resize(mut session) => self.resize.end(&mut session, stage, dispatcher),
            ActiveGesture::Move(mut session) => session.end(stage),
        }
    }

    pub fn has_pending_notice(&self) -> bool {
        match self.active.as_ref() {
            Some(ActiveGesture::Resize(session)) => session.has_pending_notice(),
            Some(ActiveGesture::Move(session)) => session.has_pending_notice(),
            None => false,
        }
    }

    /// Drain the active gesture's coalesced notice at frame time.
    pub fn flush(&mut self) -> Option<GeometryNotice> {
        match self.active.as_mut()? {
            ActiveGesture::Resize(session) => session.flush(),
            ActiveGesture::Move(session) => session.flush(),
        }
    }
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{SequenceRegistry, direct_fallback};
    use pretty_assertions::assert_eq;
    use sc_core::{Handle, InlineStyle, VisualNode};

    fn stage() -> Stage {
        let cap = direct_fallback("test.setup").unwrap();
        let mut stage = Stage::default();
        let root = stage.tree.root();
        for (id, style) in [
            ("tool_a", "left: 0px; top: 0px; width: 50px; height: 50px"),
            ("tool_b", "left: 100px; top: 0px; width: 50px; height: 50px"),
        ] {
            let mut n = VisualNode::element(NodeId::intern(id), "div");
            n.style = InlineStyle::parse(style);
            stage.tree.add_node(&cap, root, n).unwrap();
        }
        stage
    }

    #[test]
    fn every_terminal_event_detaches() {
        for terminal in [
            PointerEvent::Up { x: 10.0, y: 0.0 },
            PointerEvent::Cancel,
            PointerEvent::LostCapture,
        ] {
            let mut stage = stage();
            let mut registry = SequenceRegistry::with_canvas_plugin();
            let mut tools = GestureController::default();
            let a = NodeId::intern("tool_a");

            tools.handle(&PointerEvent::down_on_handle(0.0, 0.0, a, Handle::E), &mut stage, &mut registry);
            assert!(tools.is_attached());
            tools.handle(&PointerEvent::Move { x: 10.0, y: 0.0 }, &mut stage, &mut registry);
            let step = tools.handle(&terminal, &mut stage, &mut registry);

            assert!(matches!(step, GestureStep::Finished(ref o) if o.rect.width == 60.0));
            assert!(!tools.is_attached());
            assert_eq!(
                tools.handle(&PointerEvent::Move { x: 40.0, y: 0.0 }, &mut stage, &mut registry),
                GestureStep::Ignored
            );
        }
    }

    #[test]
    fn new_pointer_down_ends_previous_gesture() {
        let mut stage = stage();
        let mut registry = SequenceRegistry::with_canvas_plugin();
        let mut tools = GestureController::default();

        tools.handle(
            &PointerEvent::down_on_node(0.0, 0.0, NodeId::intern("tool_a")),
            &mut stage,
            &mut registry,
        );
        tools.handle(&PointerEvent::Move { x: 5.0, y: 5.0 }, &mut stage, &mut registry);
        let step = tools.handle(
            &PointerEvent::down_on_node(200.0, 200.0, NodeId::intern("tool_b")),
            &mut stage,
            &mut registry,
        );

        let GestureStep::Started { id, superseded } = step else {
            panic!("expected a new gesture, got {step:?}");
        };
        assert_eq!(id, NodeId::intern("tool_b"));
        assert_eq!(superseded.map(|o| o.rect), Some(Rect::new(5.0, 5.0, 50.0, 50.0)));
        assert_eq!(tools.active_target(), Some(NodeId::intern("tool_b")));
    }

    #[test]
    fn canvas_down_starts_nothing() {
        let mut stage = stage();
        let mut registry = SequenceRegistry::with_canvas_plugin();
        let mut tools = GestureController::default();
        let step = tools.handle(
            &PointerEvent::Down {
                x: 1.0,
                y: 1.0,
                target: PointerTarget::Canvas,
            },
            &mut stage,
            &mut registry,
        );
        assert_eq!(step, GestureStep::Ignored);
        assert!(!tools.is_attached());
    }
}
