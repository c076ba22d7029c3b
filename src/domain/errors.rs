//! Domain-level error types for the town orchestration engine.
//!
//! Every repository/service call returns `TownResult<T>`. The HTTP edge
//! (`api/error.rs`) maps each variant onto a status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single structural-validation failure on an inbound request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, e.g. `"labels.0"`.
    pub path: String,
    /// Human-readable description of what was wrong.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// Errors that can occur anywhere in the town's domain and service layers.
#[derive(Debug, Error)]
pub enum TownError {
    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A precondition was violated that the caller can resolve by retrying
    /// differently (e.g. unhooking before re-hooking).
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// Inbound request body failed structural validation.
    #[error("validation failed")]
    Validation(Vec<ValidationIssue>),

    /// The container runtime returned a non-2xx response or could not be reached.
    #[error("container runtime error: {0}")]
    Container(#[from] ContainerError),

    /// A JWT could not be minted or verified.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The underlying SQL store returned an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored JSON column failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An external collaborator other than the container runtime (e.g. the
    /// rig registry) returned an error or was unreachable.
    #[error("upstream error: {0}")]
    Upstream(String),
}

pub type TownResult<T> = Result<T, TownError>;

impl TownError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Errors returned by the container runtime HTTP client.
#[derive(Debug, Error, Clone)]
pub enum ContainerError {
    #[error("request to container runtime timed out")]
    Timeout,

    #[error("container runtime returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("container runtime unreachable: {0}")]
    Transport(String),
}

impl ContainerError {
    /// All container errors in this model are recoverable: the scheduler
    /// leaves state as-is and relies on the next tick to retry.
    pub const fn is_recoverable(&self) -> bool {
        true
    }
}

/// Errors from the JWT codec boundary.
#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token audience {expected} does not match route {actual}")]
    AudienceMismatch { expected: String, actual: String },
}
