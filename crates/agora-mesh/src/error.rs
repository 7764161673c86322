//! Error types for directory and delivery operations

use agora_core::error::HostError;
use agora_core::host::ActorStatus;
use agora_core::identifiers::ActorHandle;
use std::time::Duration;
use thiserror::Error;

/// Result type for mesh operations
pub type MeshResult<T> = Result<T, MeshError>;

#[derive(Error, Debug)]
pub enum MeshError {
    /// Destination never reported `Running` within the polling ceiling
    #[error("actor {handle} not ready after {polls} status checks (last status: {last_status})")]
    NotReady {
        handle: ActorHandle,
        polls: u32,
        last_status: ActorStatus,
    },

    /// Signal delivery failed after the destination was running
    #[error("send to {handle} failed: {source}")]
    SendFailed {
        handle: ActorHandle,
        #[source]
        source: HostError,
    },

    /// Operation timed out
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}
