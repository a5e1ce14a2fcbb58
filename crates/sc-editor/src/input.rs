//! Input abstraction layer.
//!
//! Normalizes browser pointer events into a `PointerEvent` enum consumed by
//! the gesture controller. Coordinates are viewport pixels; gestures only
//! ever use differences between them.

use sc_core::{Handle, NodeId};

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// One of the overlay's resize handles, for the node it is bound to.
    Handle { id: NodeId, handle: Handle },
    /// The body of a node.
    Node(NodeId),
    /// Empty canvas.
    Canvas,
}

/// A normalized pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, target: PointerTarget },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    /// The platform cancelled the pointer (touch interrupted, etc.).
    Cancel,
    /// Pointer capture was lost without an up event.
    LostCapture,
}

impl PointerEvent {
    pub fn down_on_handle(x: f32, y: f32, id: NodeId, handle: Handle) -> Self {
        Self::Down {
            x,
            y,
            target: PointerTarget::Handle { id, handle },
        }
    }

    pub fn down_on_node(x: f32, y: f32, id: NodeId) -> Self {
        Self::Down {
            x,
            y,
            target: PointerTarget::Node(id),
        }
    }

    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::Down { x, y, .. } | Self::Move { x, y } | Self::Up { x, y } => Some((*x, *y)),
            Self::Cancel | Self::LostCapture => None,
        }
    }

    /// Whether this event ends any gesture in progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Up { .. } | Self::Cancel | Self::LostCapture)
    }
}
