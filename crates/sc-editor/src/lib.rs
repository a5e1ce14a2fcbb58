pub mod config;
pub mod dispatch;
pub mod drag;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod import;
pub mod input;
pub mod notify;
pub mod overlay;
pub mod resize;
pub mod stage;
pub mod svg_edit;
pub mod tools;

pub use config::EngineConfig;
pub use dispatch::{Dispatcher, Payload, Route, Sequence, SequenceRegistry, UnmountedDispatcher};
pub use drag::{MoveSession, move_node};
pub use engine::CanvasEngine;
pub use error::{CanvasError, CanvasResult, DispatchError};
pub use import::{HierarchyBuilder, ImportReport};
pub use input::{PointerEvent, PointerTarget};
pub use notify::{FrameCoalescer, GeometryNotice, GestureOutcome};
pub use overlay::SelectionOverlay;
pub use resize::{ResizeEngine, ResizePhase, ResizeSession};
pub use stage::{Stage, SvgAttributeChange};
pub use svg_edit::{resolve_svg_node, set_svg_attribute};
pub use tools::{GestureController, GestureStep};
