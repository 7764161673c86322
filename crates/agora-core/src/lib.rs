//! # Agora Core
//!
//! Types and collaborator traits shared by the Agora actor runtime:
//!
//! - [`identifiers`]: validated ids and the deterministic actor handle
//! - [`tool`]: tool descriptors, the per-actor registry, dispatch decoding
//! - [`transcript`] and [`decision`]: the closed content-block model
//! - [`state`]: conversation state, inbound queue, snapshots
//! - [`config`]: persisted actor configuration and its stores
//! - [`host`], [`completion`], [`operator`]: the external collaborator seams

pub mod completion;
pub mod config;
pub mod decision;
pub mod error;
pub mod host;
pub mod identifiers;
pub mod message;
pub mod operator;
pub mod persist;
pub mod state;
pub mod tool;
pub mod transcript;

pub use completion::{CompletionRequest, CompletionService};
pub use config::{ActorConfig, ActorConfigStore, FileConfigStore, InMemoryConfigStore};
pub use decision::{Decision, ToolInvocation};
pub use error::{
    AgoraError, CompletionError, CompletionResult, ConfigError, HostError, HostResult,
    RegistryError, RegistryResult, StoreError, StoreResult,
};
pub use host::{ActorHost, ActorStatus};
pub use identifiers::{
    ActorHandle, ActorId, ActorIdentity, IdValidationError, PersonaType, RunId, ToolName,
};
pub use message::{InboundMessage, PeerMessage, ReminderRequest};
pub use operator::{LogOperatorChannel, OperatorChannel};
pub use state::{ConversationSnapshot, ConversationState, InboundQueue, PeerInfo, Peers};
pub use tool::{BuiltinTool, ToolDescriptor, ToolDispatch, ToolRegistry};
pub use transcript::{ContentBlock, Role, Transcript, Turn};
