//! Messaging Protocol: deliver a peer message, bootstrapping the recipient

use crate::directory::ActorDirectory;
use crate::error::{MeshError, MeshResult};
use agora_core::identifiers::{ActorId, ActorIdentity};
use agora_core::message::{InboundMessage, PeerMessage};
use async_trait::async_trait;
use tracing::info;

/// Acknowledgment returned to the sender once a message is handed over
pub fn delivery_acknowledgment(to_id: &ActorId) -> String {
    format!(
        "Message sent to agent id: {to_id}. You will be invoked/notified if/when they respond.\n"
    )
}

/// Delivery of peer messages.
///
/// Delivery is fire-and-forget: `Ok` means the recipient was running and
/// accepted the signal, not that it replied.
#[async_trait]
pub trait PeerDelivery: Send + Sync {
    async fn deliver(&self, message: &PeerMessage) -> MeshResult<String>;
}

#[derive(Clone)]
pub struct Messenger {
    directory: ActorDirectory,
}

impl Messenger {
    pub fn new(directory: ActorDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &ActorDirectory {
        &self.directory
    }

    /// Signal `identity`, starting it first if it is not running
    pub async fn signal(&self, identity: &ActorIdentity, message: InboundMessage) -> MeshResult<()> {
        let handle = self.directory.ensure_running(identity).await?;
        self.directory
            .host()
            .signal(&handle, message)
            .await
            .map_err(|source| MeshError::SendFailed { handle, source })
    }
}

#[async_trait]
impl PeerDelivery for Messenger {
    async fn deliver(&self, message: &PeerMessage) -> MeshResult<String> {
        let destination = message.destination();
        info!(from = %message.from_id, to = %destination, "Delivering peer message");
        self.signal(&destination, message.to_signal()).await?;
        Ok(delivery_acknowledgment(&message.to_id))
    }
}
