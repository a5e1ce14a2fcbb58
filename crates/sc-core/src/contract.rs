//! Handler classification contract.
//!
//! Every beat of an orchestrated sequence is bound to one handler kind.
//! Only `stage-crew` handlers may read or write the visual surface, and the
//! rule is carried by the type system: every mutation primitive on
//! [`VisualTree`](crate::model::VisualTree) takes a `&StageCrew`, and a token
//! only exists for a beat bound to `stage-crew`. Tokens are minted by the
//! dispatch layer and lent to handlers; pure and io handlers are never
//! handed the tree or a token.
//!
//! A beat without any binding is treated like `pure`: unmapped is not
//! trusted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind a handler is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerKind {
    /// Data transformation only. May write into the step context.
    Pure,
    /// The only kind allowed to touch the live visual tree.
    StageCrew,
    /// Persistence and network. Never touches the visual tree.
    Io,
}

impl HandlerKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pure" => Some(HandlerKind::Pure),
            "stage-crew" => Some(HandlerKind::StageCrew),
            "io" => Some(HandlerKind::Io),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Pure => "pure",
            HandlerKind::StageCrew => "stage-crew",
            HandlerKind::Io => "io",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete unit of orchestrated work and its binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beat {
    /// Handler name, e.g. `resize.apply`.
    pub handler: String,
    /// `None` when the handler is not bound to any kind.
    pub kind: Option<HandlerKind>,
}

impl Beat {
    pub fn new(handler: impl Into<String>, kind: Option<HandlerKind>) -> Self {
        Self {
            handler: handler.into(),
            kind,
        }
    }

    pub fn stage_crew(handler: impl Into<String>) -> Self {
        Self::new(handler, Some(HandlerKind::StageCrew))
    }

    pub fn pure(handler: impl Into<String>) -> Self {
        Self::new(handler, Some(HandlerKind::Pure))
    }

    pub fn io(handler: impl Into<String>) -> Self {
        Self::new(handler, Some(HandlerKind::Io))
    }

    /// The kind this beat is effectively held to. Unbound beats get the
    /// strictest non-io treatment.
    pub fn effective_kind(&self) -> HandlerKind {
        self.kind.unwrap_or(HandlerKind::Pure)
    }

    pub fn may_touch_surface(&self) -> bool {
        self.kind == Some(HandlerKind::StageCrew)
    }
}

/// Capability to read and mutate the visual surface.
///
/// Neither `Clone` nor `Copy`: a handler borrows the token for the duration
/// of its call and cannot stash a copy for later.
#[derive(Debug)]
pub struct StageCrew {
    handler: String,
}

impl StageCrew {
    /// Mint the capability for `beat`. Beats bound to anything other than
    /// `stage-crew`, including unbound beats, get `None`.
    ///
    /// Reserved for the dispatch layer. Surface code borrows a token from
    /// its caller and never mints one.
    #[doc(hidden)]
    pub fn mint(beat: &Beat) -> Option<Self> {
        if beat.may_touch_surface() {
            Some(Self {
                handler: beat.handler.clone(),
            })
        } else {
            log::debug!(
                "refusing surface capability to `{}` ({})",
                beat.handler,
                beat.kind.map_or("unmapped", |k| k.as_str())
            );
            None
        }
    }

    /// Name of the handler the token was granted to.
    pub fn handler(&self) -> &str {
        &self.handler
    }
}

// ─── Lint ────────────────────────────────────────────────────────────────

/// Severity of a contract finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractSeverity {
    /// The binding is wrong; registration will be refused.
    Error,
    /// Allowed, but probably not what the author meant.
    Warning,
}

/// A single contract finding for a beat.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDiagnostic {
    pub handler: String,
    pub message: String,
    pub severity: ContractSeverity,
    /// Short rule identifier (e.g. "unmapped-handler").
    pub rule: &'static str,
}

/// Check a catalog of beats against the handler shapes registered for them.
///
/// `implemented` gives, per handler name, the kind of handler that was
/// actually supplied (the shape of its signature). A beat is consistent when
/// the shape matches its effective kind.
#[must_use]
pub fn lint_beats(beats: &[Beat], implemented: &[(&str, HandlerKind)]) -> Vec<ContractDiagnostic> {
    let mut diags = Vec::new();
    for beat in beats {
        if beat.kind.is_none() {
            diags.push(ContractDiagnostic {
                handler: beat.handler.clone(),
                message: format!(
                    "handler `{}` has no kind binding and is treated as pure",
                    beat.handler
                ),
                severity: ContractSeverity::Warning,
                rule: "unmapped-handler",
            });
        }
        if let Some((_, shape)) = implemented.iter().find(|(name, _)| *name == beat.handler)
            && *shape != beat.effective_kind()
        {
            diags.push(ContractDiagnostic {
                handler: beat.handler.clone(),
                message: format!(
                    "handler `{}` is implemented as {} but bound as {}",
                    beat.handler,
                    shape,
                    beat.kind.map_or("unmapped", |k| k.as_str())
                ),
                severity: ContractSeverity::Error,
                rule: "kind-mismatch",
            });
        }
    }
    diags
}
