//! Operator notification seam

use crate::identifiers::ActorIdentity;
use async_trait::async_trait;

/// Channel to the human operator behind an actor.
///
/// Fire-and-forget: delivery guarantees belong to the implementation.
#[async_trait]
pub trait OperatorChannel: Send + Sync {
    async fn notify(&self, actor: &ActorIdentity, message: &str);
}

/// Writes operator notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOperatorChannel;

#[async_trait]
impl OperatorChannel for LogOperatorChannel {
    async fn notify(&self, actor: &ActorIdentity, message: &str) {
        tracing::info!(actor = %actor, text = message, "Operator notified");
    }
}
