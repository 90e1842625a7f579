//! Unified error type bridging subsystem errors.

use thiserror::Error;

use crate::patch::Conflict;

/// Unified error type for host-facing results.
///
/// Subsystem errors convert into this type before crossing the host
/// boundary. Note that most analysis failures are deliberately NOT errors:
/// a missing framework identifier, an unresolvable handler body, or a
/// malformed route template all degrade to "no finding" per the engine's
/// failure-scoping rules.
#[derive(Debug, Error)]
pub enum GantryError {
    /// A required framework identifier is missing from the program.
    ///
    /// The session is a guaranteed no-op in this state; this variant exists
    /// so hosts that want to distinguish "clean program" from "framework not
    /// referenced" can do so.
    #[error("framework identifier not found: {0}")]
    MissingIdentifier(String),

    /// A batch apply was rejected.
    #[error("patch apply failed with {} conflict(s)", .0.len())]
    ApplyFailed(Vec<Conflict>),
}

impl From<Vec<Conflict>> for GantryError {
    fn from(conflicts: Vec<Conflict>) -> Self {
        GantryError::ApplyFailed(conflicts)
    }
}
