//! Directional resize math.
//!
//! Pure functions only: given a baseline box, a handle and a pointer delta,
//! produce the new box. Applying it to the tree is the editor's job.

use crate::geometry::{Handle, HandleSet, Rect, parse_handle_list};
use std::collections::BTreeMap;

pub const ATTR_ENABLED: &str = "data-resize-enabled";
pub const ATTR_HANDLES: &str = "data-resize-handles";
pub const ATTR_MIN_W: &str = "data-resize-min-w";
pub const ATTR_MIN_H: &str = "data-resize-min-h";

const DEFAULT_MIN: f32 = 1.0;

/// Per-node resize configuration, read from `data-resize-*` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeConfig {
    pub enabled: bool,
    pub min_width: f32,
    pub min_height: f32,
    pub allowed_handles: HandleSet,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_width: DEFAULT_MIN,
            min_height: DEFAULT_MIN,
            allowed_handles: Handle::ALL.iter().copied().collect(),
        }
    }
}

impl ResizeConfig {
    /// Derive the configuration from a node's attributes. Missing or
    /// unparseable values take their defaults.
    pub fn from_attributes(attrs: &BTreeMap<String, String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = attrs.get(ATTR_ENABLED) {
            config.enabled = !v.trim().eq_ignore_ascii_case("false");
        }
        if let Some(v) = attrs.get(ATTR_HANDLES) {
            let handles = parse_handle_list(v);
            if handles.is_empty() {
                log::debug!("`{ATTR_HANDLES}=\"{v}\"` names no valid handle, keeping all eight");
            } else {
                config.allowed_handles = handles;
            }
        }
        config.min_width = parse_min(attrs.get(ATTR_MIN_W));
        config.min_height = parse_min(attrs.get(ATTR_MIN_H));
        config
    }

    pub fn allows(&self, handle: Handle) -> bool {
        self.enabled && self.allowed_handles.contains(&handle)
    }
}

/// A minimum below one pixel would allow a zero-sized node, so it is
/// treated like an unparseable value.
fn parse_min(value: Option<&String>) -> f32 {
    value
        .and_then(|v| v.trim().trim_end_matches("px").parse::<f32>().ok())
        .filter(|n| n.is_finite() && *n >= DEFAULT_MIN)
        .unwrap_or(DEFAULT_MIN)
}

/// Compute the box produced by dragging `handle` by `(dx, dy)` from
/// `baseline`.
///
/// The result never goes below the configured minimum size. When a west or
/// north drag clamps, the opposite edge stays where it was. A disabled
/// config, a handle outside the allowed set, or a non-finite delta returns
/// `baseline` unchanged.
pub fn compute_resize(
    handle: Handle,
    baseline: Rect,
    dx: f32,
    dy: f32,
    config: &ResizeConfig,
) -> Rect {
    if !config.allows(handle) {
        return baseline;
    }
    if !dx.is_finite() || !dy.is_finite() {
        log::debug!("ignoring non-finite resize delta ({dx}, {dy})");
        return baseline;
    }

    let mut out = baseline;

    if handle.has_e() {
        out.width = (baseline.width + dx).max(config.min_width);
    }
    if handle.has_s() {
        out.height = (baseline.height + dy).max(config.min_height);
    }
    if handle.has_w() {
        let width = baseline.width - dx;
        if width < config.min_width {
            out.width = config.min_width;
            out.x = baseline.x + (baseline.width - config.min_width);
        } else {
            out.width = width;
            out.x = baseline.x + dx;
        }
    }
    if handle.has_n() {
        let height = baseline.height - dy;
        if height < config.min_height {
            out.height = config.min_height;
            out.y = baseline.y + (baseline.height - config.min_height);
        } else {
            out.height = height;
            out.y = baseline.y + dy;
        }
    }

    out
}

/// Snap a box from [`compute_resize`] to whole pixels. A fractional
/// minimum rounds up, so snapping never undercuts it. West and north edges
/// are placed from the rounded opposite edge so that edge stays put.
pub fn snap_resize(handle: Handle, baseline: Rect, resized: Rect, config: &ResizeConfig) -> Rect {
    let mut out = resized.round();

    if handle.has_e() || handle.has_w() {
        out.width = out.width.max(config.min_width.ceil());
    }
    if handle.has_w() {
        out.x = baseline.right().round() - out.width;
    }
    if handle.has_n() || handle.has_s() {
        out.height = out.height.max(config.min_height.ceil());
    }
    if handle.has_n() {
        out.y = baseline.bottom().round() - out.height;
    }
    out
}
