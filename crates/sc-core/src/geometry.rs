//! Boxes and compass handles.
//!
//! All boxes are plain `f32` pixel rectangles. Which frame a box lives in
//! (parent, canvas, viewport) is a property of where it came from, never
//! of the type, so function docs always name the frame.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// An axis-aligned box in some coordinate frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Shift the box by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Express this box relative to the origin of `frame`.
    pub fn relative_to(&self, frame: &Rect) -> Self {
        self.translate(-frame.x, -frame.y)
    }

    /// Snap every component to the nearest whole pixel.
    pub fn round(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            width: self.width.round(),
            height: self.height.round(),
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

// ─── Handles ─────────────────────────────────────────────────────────────

/// One of the eight compass resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

/// A small set of handles. Eight at most, so it never spills.
pub type HandleSet = SmallVec<[Handle; 8]>;

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::N,
        Handle::S,
        Handle::E,
        Handle::W,
        Handle::Ne,
        Handle::Nw,
        Handle::Se,
        Handle::Sw,
    ];

    /// Parse a compass token (`"n"`, `"se"`, ...). Case and surrounding
    /// whitespace are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" => Some(Handle::N),
            "s" => Some(Handle::S),
            "e" => Some(Handle::E),
            "w" => Some(Handle::W),
            "ne" => Some(Handle::Ne),
            "nw" => Some(Handle::Nw),
            "se" => Some(Handle::Se),
            "sw" => Some(Handle::Sw),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Handle::N => "n",
            Handle::S => "s",
            Handle::E => "e",
            Handle::W => "w",
            Handle::Ne => "ne",
            Handle::Nw => "nw",
            Handle::Se => "se",
            Handle::Sw => "sw",
        }
    }

    pub fn has_n(&self) -> bool {
        matches!(self, Handle::N | Handle::Ne | Handle::Nw)
    }

    pub fn has_s(&self) -> bool {
        matches!(self, Handle::S | Handle::Se | Handle::Sw)
    }

    pub fn has_e(&self) -> bool {
        matches!(self, Handle::E | Handle::Ne | Handle::Se)
    }

    pub fn has_w(&self) -> bool {
        matches!(self, Handle::W | Handle::Nw | Handle::Sw)
    }

    /// Handle anchor as fractions of the box (0.0 = left/top, 1.0 = right/bottom).
    pub fn anchor(&self) -> (f32, f32) {
        let fx = if self.has_w() {
            0.0
        } else if self.has_e() {
            1.0
        } else {
            0.5
        };
        let fy = if self.has_n() {
            0.0
        } else if self.has_s() {
            1.0
        } else {
            0.5
        };
        (fx, fy)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma list of handles. Unknown tokens are dropped; duplicates
/// collapse to one entry.
pub fn parse_handle_list(s: &str) -> HandleSet {
    let mut out = HandleSet::new();
    for token in s.split(',') {
        match Handle::parse(token) {
            Some(h) if !out.contains(&h) => out.push(h),
            Some(_) => {}
            None => {
                if !token.trim().is_empty() {
                    log::debug!("ignoring unknown resize handle `{}`", token.trim());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compass_components() {
        assert!(Handle::Ne.has_n() && Handle::Ne.has_e());
        assert!(!Handle::Ne.has_s() && !Handle::Ne.has_w());
        assert!(Handle::Sw.has_s() && Handle::Sw.has_w());
        assert!(Handle::W.has_w() && !Handle::W.has_n());
    }

    #[test]
    fn handle_list_parsing() {
        let set = parse_handle_list(" se, E ,bogus,se,n");
        assert_eq!(set.as_slice(), &[Handle::Se, Handle::E, Handle::N]);
        assert!(parse_handle_list("").is_empty());
    }

    #[test]
    fn rect_rounding_and_frames() {
        let r = Rect::new(10.4, 10.6, 99.5, 20.49).round();
        assert_eq!(r, Rect::new(10.0, 11.0, 100.0, 20.0));

        let canvas = Rect::new(200.0, 50.0, 800.0, 600.0);
        let rel = Rect::new(230.0, 70.0, 10.0, 10.0).relative_to(&canvas);
        assert_eq!(rel, Rect::new(30.0, 20.0, 10.0, 10.0));
    }

    #[test]
    fn anchors() {
        assert_eq!(Handle::Nw.anchor(), (0.0, 0.0));
        assert_eq!(Handle::S.anchor(), (0.5, 1.0));
        assert_eq!(Handle::E.anchor(), (1.0, 0.5));
    }
}
