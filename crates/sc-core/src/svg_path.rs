//! Index paths into vector-graphic content.
//!
//! An `SvgPath` such as `0/1/0` selects, at each depth, the Nth *element*
//! child of the current node. Text and comment nodes are invisible to the
//! path, so whitespace between tags never shifts an index.

use crate::error::{CoreError, CoreResult};
use crate::model::VisualTree;
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;
use std::fmt;

/// Attributes that may be set on SVG sub-nodes. Fixed: event handlers,
/// `href` and `style` are deliberately absent.
pub const SVG_ATTRIBUTE_WHITELIST: [&str; 19] = [
    "fill",
    "stroke",
    "stroke-width",
    "stroke-dasharray",
    "stroke-linecap",
    "stroke-linejoin",
    "opacity",
    "fill-opacity",
    "stroke-opacity",
    "x",
    "y",
    "width",
    "height",
    "cx",
    "cy",
    "r",
    "rx",
    "ry",
    "transform",
];

pub fn is_whitelisted_attribute(name: &str) -> bool {
    SVG_ATTRIBUTE_WHITELIST.contains(&name)
}

/// A parsed `/`-separated list of element-child indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SvgPath {
    segments: SmallVec<[usize; 8]>,
}

impl SvgPath {
    /// Parse `"0/1/0"`. The empty string is the root itself. Leading and
    /// trailing slashes are tolerated; empty or non-numeric segments are not.
    pub fn parse(path: &str) -> CoreResult<Self> {
        let trimmed = path.trim().trim_matches('/');
        let mut segments = SmallVec::new();
        if trimmed.is_empty() {
            return Ok(Self { segments });
        }
        for (i, raw) in trimmed.split('/').enumerate() {
            let seg = raw.trim();
            if seg.is_empty() || !seg.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CoreError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("segment {i} (`{raw}`) is not a non-negative integer"),
                });
            }
            let n = seg.parse::<usize>().map_err(|e| CoreError::InvalidPath {
                path: path.to_string(),
                reason: format!("segment {i}: {e}"),
            })?;
            segments.push(n);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for SvgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(usize::to_string).collect();
        f.write_str(&parts.join("/"))
    }
}

/// Walk `path` down from `root`. Deterministic and side-effect free.
pub fn resolve_svg_path(tree: &VisualTree, root: NodeIndex, path: &SvgPath) -> CoreResult<NodeIndex> {
    let mut current = root;
    for (depth, &index) in path.segments().iter().enumerate() {
        let children = tree.element_children(current);
        current = *children.get(index).ok_or_else(|| CoreError::PathOutOfRange {
            path: path.to_string(),
            segment: depth,
            index,
            available: children.len(),
        })?;
    }
    Ok(current)
}
