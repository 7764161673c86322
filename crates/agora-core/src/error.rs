//! Error types
//!
//! Each collaborator seam has its own error enum so callers can decide per
//! layer whether a failure abandons a turn, becomes tool-result text, or is
//! fatal to the host process. [`AgoraError`] unifies them for binaries.

use crate::identifiers::{ActorHandle, ActorId, IdValidationError, PersonaType, ToolName};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for tool registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for durable substrate operations
pub type HostResult<T> = Result<T, HostError>;

/// Result type for completion service calls
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Result type for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the tool registry
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(ToolName),

    #[error("invalid tool name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: IdValidationError,
    },
}

/// Errors raised by the durable substrate hosting actors
#[derive(Debug, Error)]
pub enum HostError {
    #[error("actor not found: {0}")]
    NotFound(ActorHandle),

    #[error("failed to start actor {handle}: {reason}")]
    StartFailed { handle: ActorHandle, reason: String },

    #[error("actor {0} is not accepting signals")]
    Unavailable(ActorHandle),

    #[error("host is shutting down")]
    ShuttingDown,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by the completion service
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion service not configured: {0}")]
    NotConfigured(String),
}

/// Errors raised by state, reminder and config persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background I/O task failed: {0}")]
    Join(String),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("no configuration for {persona_type} actor {actor_id}")]
    NotFound {
        persona_type: PersonaType,
        actor_id: ActorId,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Umbrella error for binaries and the facade crate
#[derive(Debug, Error)]
pub enum AgoraError {
    #[error(transparent)]
    Id(#[from] IdValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_names_the_tool() {
        let err = RegistryError::Duplicate(ToolName::new_unchecked("calculator"));
        assert_eq!(err.to_string(), "tool 'calculator' is already registered");
    }

    #[test]
    fn config_errors_lift_into_host_errors() {
        let err: HostError = ConfigError::ValidationError("bad".into()).into();
        assert!(matches!(err, HostError::Config(_)));
        assert!(err.to_string().contains("bad"));
    }
}
