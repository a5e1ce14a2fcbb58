pub mod contract;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod id;
pub mod model;
pub mod resize;
pub mod style;
pub mod svg_path;

pub use contract::{Beat, ContractDiagnostic, HandlerKind, StageCrew, lint_beats};
pub use error::{CoreError, CoreResult};
pub use geometry::{Handle, HandleSet, Rect};
pub use hierarchy::{HierarchySpec, SpecDiagnostic, export_hierarchy, validate};
pub use id::NodeId;
pub use model::*;
pub use resize::{ResizeConfig, compute_resize, snap_resize};
pub use style::InlineStyle;
pub use svg_path::{SvgPath, is_whitelisted_attribute, resolve_svg_path};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
