use sc_core::CoreError;
use thiserror::Error;

/// Failure of a dispatch call. Callers treat every variant as recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// No orchestrator is mounted to route the call.
    #[error("dispatcher is not mounted")]
    Unmounted,

    #[error("no sequence registered for `{0}`")]
    UnknownRoute(String),

    /// A beat of the routed sequence failed.
    #[error("beat `{beat}` of `{sequence}` failed: {message}")]
    BeatFailed {
        sequence: String,
        beat: String,
        message: String,
    },

    /// A handler's shape does not match its beat binding.
    #[error(transparent)]
    Contract(#[from] CoreError),
}

/// Failure of a canvas operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("orchestration failed: {0}")]
    Orchestration(#[from] DispatchError),

    #[error("payload field `{0}` is missing or invalid")]
    Payload(&'static str),
}

pub type CanvasResult<T> = Result<T, CanvasError>;
