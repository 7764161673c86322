//! Conversation state owned by a single actor

use crate::config::ActorConfig;
use crate::decision::Decision;
use crate::error::RegistryResult;
use crate::identifiers::{ActorId, ActorIdentity, PersonaType};
use crate::message::InboundMessage;
use crate::tool::{ToolDescriptor, ToolRegistry};
use crate::transcript::{Transcript, Turn};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// What an actor knows about one of its peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    #[serde(rename = "type")]
    pub persona_type: PersonaType,
    #[serde(alias = "about", default)]
    pub description: String,
}

impl PeerInfo {
    pub fn new(persona_type: PersonaType, description: impl Into<String>) -> Self {
        Self {
            persona_type,
            description: description.into(),
        }
    }
}

/// Peer id to peer info, ordered by id
pub type Peers = BTreeMap<ActorId, PeerInfo>;

/// Pending inbound signals.
///
/// Producers append; the owning actor takes the most recent one per turn,
/// leaving older ones queued for later turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundQueue {
    pending: Vec<InboundMessage>,
}

impl InboundQueue {
    pub fn enqueue(&mut self, message: InboundMessage) {
        self.pending.push(message);
    }

    pub fn dequeue_latest(&mut self) -> Option<InboundMessage> {
        self.pending.pop()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InboundMessage> {
        self.pending.iter()
    }
}

/// The durable record of one actor's conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub identity: ActorIdentity,
    pub system_prompt: String,
    pub language: String,
    pub transcript: Transcript,
    pub tools: ToolRegistry,
    pub peers: Peers,
    pub inbound: InboundQueue,
}

impl ConversationState {
    /// Build the initial state from persisted configuration.
    ///
    /// `defaults` are registered first; configured tools follow in order. A
    /// configured tool whose name is already taken is skipped.
    pub fn new(identity: ActorIdentity, config: &ActorConfig, defaults: ToolRegistry) -> Self {
        let mut tools = defaults;
        for descriptor in &config.tools {
            if let Err(e) = tools.register(descriptor.clone()) {
                warn!(actor = %identity, error = %e, "Skipping configured tool");
            }
        }

        Self {
            system_prompt: config.compose_system_prompt(&identity.actor_id),
            language: config.language.clone(),
            transcript: Transcript::new(),
            tools,
            peers: config.peers.clone(),
            inbound: InboundQueue::default(),
            identity,
        }
    }

    pub fn peer(&self, id: &ActorId) -> Option<&PeerInfo> {
        self.peers.get(id)
    }

    /// Take the most recent pending message and fold it in as a `user` turn
    pub fn fold_latest(&mut self, now: NaiveDateTime) -> Option<InboundMessage> {
        let message = self.inbound.dequeue_latest()?;
        self.transcript.push(Turn::user_text(message.fold(now)));
        Some(message)
    }

    pub fn record_decision(&mut self, decision: &Decision) {
        self.transcript.push(Turn::assistant(decision.content.clone()));
    }

    pub fn record_tool_result(&mut self, decision: &Decision, aggregate: impl Into<String>) {
        let mut ids = decision.tool_invocations().map(|inv| inv.id);
        let correlation_id = ids.next();
        let others: Vec<&str> = ids.collect();
        self.transcript
            .push(Turn::tool_result(correlation_id, &others, aggregate));
    }

    pub fn register_tool(&mut self, descriptor: ToolDescriptor) -> RegistryResult<()> {
        self.tools.register(descriptor)
    }

    pub fn snapshot(&self, turns_completed: u64) -> ConversationSnapshot {
        ConversationSnapshot {
            state: self.clone(),
            turns_completed,
            taken_at: Utc::now(),
        }
    }
}

/// Read-only copy of a conversation taken at a quiescent point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    #[serde(flatten)]
    pub state: ConversationState,
    pub turns_completed: u64,
    pub taken_at: DateTime<Utc>,
}
