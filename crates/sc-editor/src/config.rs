use sc_core::Rect;

/// Tunables for the interaction engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Where the canvas sits in the viewport.
    pub canvas_frame: Rect,
    /// Pointer travel (px) the first move of a gesture must exceed before
    /// downstream observers hear about it.
    pub dead_zone_px: f32,
    /// Side length of an overlay handle square.
    pub handle_size: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_frame: Rect::new(0.0, 0.0, 800.0, 600.0),
            dead_zone_px: 3.0,
            handle_size: 8.0,
        }
    }
}
