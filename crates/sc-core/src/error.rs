//! Error taxonomy shared by every crate in the workspace.
//!
//! None of these are fatal. Callers at the interaction boundary log them
//! and leave the canvas untouched.

use crate::id::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A node id did not resolve in the live tree.
    #[error("node `{0}` not found")]
    NodeNotFound(NodeId),

    /// An SVG path segment indexed past the available element children.
    #[error("svg path `{path}`: segment {segment} asks for child {index} but only {available} exist")]
    PathOutOfRange {
        path: String,
        segment: usize,
        index: usize,
        available: usize,
    },

    /// An SVG path string that is not `/`-separated non-negative integers.
    #[error("svg path `{path}` is malformed: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The operation is refused by a fixed policy (whitelist, disabled resize).
    #[error("rejected by policy: {0}")]
    PolicyRejected(String),

    /// Input data that could not be interpreted.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// A handler was bound to a beat whose kind it does not match.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Malformed(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
