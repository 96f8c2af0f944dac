//! Error taxonomy for the orchestrator.

use thiserror::Error;

/// Errors that can occur anywhere in the orchestrator domain.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Missing or invalid bearer token, or bad login credentials.
    #[error("auth error: {0}")]
    Auth(String),

    /// Caller is not the owner of the resource.
    #[error("not the owner: {0}")]
    Authz(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body failed shape validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Placement Engine or Monitoring Adapter unreachable or erroring.
    #[error("dependency unavailable: {0}")]
    Dependency(String),

    /// SSH session or provisioning script failed.
    #[error("remote execution failed: {0}")]
    Remote(String),

    /// Operation attempted from an illegal slice/VM state.
    #[error("illegal state transition: {0}")]
    State(String),

    /// Data-model constraint violated; indicates a bug.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Result type for orchestrator domain operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
