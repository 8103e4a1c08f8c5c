//! Error types for the traceability and versioning engine
//!
//! Every failure here is a "nothing to do" outcome: the operation that
//! reports it has left all state untouched.

use thiserror::Error;

use crate::models::ArtifactKind;

/// Errors that can occur during engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("{kind} not found: {id}")]
    ArtifactNotFound { kind: ArtifactKind, id: String },

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Test case {0} is locked")]
    ArtifactLocked(String),
}

impl TraceError {
    pub(crate) fn not_found(kind: ArtifactKind, id: &str) -> Self {
        TraceError::ArtifactNotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true for the not-found family of outcomes
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TraceError::VersionNotFound(_) | TraceError::ArtifactNotFound { .. }
        )
    }
}
