//! The durable substrate actors run on

use crate::error::HostResult;
use crate::identifiers::{ActorHandle, ActorIdentity};
use crate::message::InboundMessage;
use crate::state::ConversationSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an actor as reported by its host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    /// Start requested, not yet accepting signals
    Starting,
    Running,
    Terminated,
    Failed,
    NotFound,
}

impl ActorStatus {
    /// Whether a sender must start a fresh instance before signalling
    pub fn needs_start(&self) -> bool {
        matches!(
            self,
            ActorStatus::NotFound | ActorStatus::Terminated | ActorStatus::Failed
        )
    }
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActorStatus::Starting => "starting",
            ActorStatus::Running => "running",
            ActorStatus::Terminated => "terminated",
            ActorStatus::Failed => "failed",
            ActorStatus::NotFound => "not_found",
        };
        f.write_str(s)
    }
}

/// Directory, signal and query operations of the actor host.
///
/// Implementations guarantee that at most one turn runs per actor at a time
/// and that actor state survives host restarts. `start_actor` must be
/// idempotent: starting a handle whose actor is already live is a no-op.
#[async_trait]
pub trait ActorHost: Send + Sync {
    async fn start_actor(&self, identity: &ActorIdentity) -> HostResult<()>;

    async fn status(&self, handle: &ActorHandle) -> HostResult<ActorStatus>;

    async fn signal(&self, handle: &ActorHandle, message: InboundMessage) -> HostResult<()>;

    async fn query(&self, handle: &ActorHandle) -> HostResult<ConversationSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_dead_or_absent_actors_need_start() {
        assert!(ActorStatus::NotFound.needs_start());
        assert!(ActorStatus::Terminated.needs_start());
        assert!(ActorStatus::Failed.needs_start());
        assert!(!ActorStatus::Running.needs_start());
        assert!(!ActorStatus::Starting.needs_start());
    }
}
