//! Signals delivered into actor inbound queues, and the requests that
//! produce them

use crate::identifiers::{ActorId, ActorIdentity, PersonaType, RunId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Timestamp format recorded with every folded inbound message
pub const FOLD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Payload of a signal delivered to an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Message from another actor
    Peer { from: ActorId, message: String },
    /// A reminder this actor scheduled for itself
    Reminder { message: String },
    /// Input typed by the human operator
    Operator { message: String },
    /// Anything else, recorded verbatim
    Raw { payload: Value },
}

impl InboundMessage {
    pub fn peer(from: ActorId, message: impl Into<String>) -> Self {
        InboundMessage::Peer {
            from,
            message: message.into(),
        }
    }

    pub fn operator(message: impl Into<String>) -> Self {
        InboundMessage::Operator {
            message: message.into(),
        }
    }

    pub fn sender(&self) -> Option<&ActorId> {
        match self {
            InboundMessage::Peer { from, .. } => Some(from),
            _ => None,
        }
    }

    fn source_label(&self) -> &'static str {
        match self {
            InboundMessage::Peer { .. } | InboundMessage::Raw { .. } => "agent",
            InboundMessage::Reminder { .. } => "reminder",
            InboundMessage::Operator { .. } => "operator",
        }
    }

    /// Text of the `user` turn this message folds into
    pub fn fold(&self, now: NaiveDateTime) -> String {
        let mut record = Map::new();
        record.insert("from".into(), json!(self.source_label()));
        record.insert(
            "current time".into(),
            json!(now.format(FOLD_TIME_FORMAT).to_string()),
        );
        if let Some(sender) = self.sender() {
            record.insert("agent_id".into(), json!(sender));
        }
        let body = match self {
            InboundMessage::Peer { message, .. }
            | InboundMessage::Reminder { message }
            | InboundMessage::Operator { message } => json!(message),
            InboundMessage::Raw { payload } => payload.clone(),
        };
        record.insert("message".into(), body);

        let record = Value::Object(record);
        serde_json::to_string_pretty(&record).unwrap_or_else(|_| record.to_string())
    }
}

/// A message one actor sends to a peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMessage {
    pub from_id: ActorId,
    pub to_id: ActorId,
    pub body: String,
    pub run_id: RunId,
    pub destination_persona_type: PersonaType,
}

impl PeerMessage {
    pub fn destination(&self) -> ActorIdentity {
        ActorIdentity::new(
            self.destination_persona_type.clone(),
            self.to_id.clone(),
            self.run_id.clone(),
        )
    }

    pub fn to_signal(&self) -> InboundMessage {
        InboundMessage::peer(self.from_id.clone(), self.body.clone())
    }
}

/// A delayed self-signal requested by an actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub delay_seconds: u64,
    pub body: String,
    pub owner: ActorIdentity,
}

impl ReminderRequest {
    pub fn to_signal(&self) -> InboundMessage {
        InboundMessage::Reminder {
            message: format!(
                "message scheduled {} seconds ago: {}",
                self.delay_seconds, self.body
            ),
        }
    }
}
