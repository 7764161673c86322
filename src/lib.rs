//! # Agora
//!
//! A durable runtime for LLM-driven agent actors that negotiate with each
//! other on behalf of human operators.
//!
//! Each actor is identified by a persona type, an actor id and a run id.
//! It folds inbound messages into its conversation, asks a completion
//! service for a structured decision, and executes the tools that decision
//! invokes: messages to peer actors (started on demand), operator
//! notifications, detached reminders, arithmetic, and custom tools.
//!
//! The workspace is split into:
//!
//! - [`agora_core`]: identifiers, conversation state, tool registry and
//!   the collaborator traits
//! - [`agora_tools`]: builtin tool catalogue, calculator, custom tool
//!   handlers
//! - [`agora_mesh`]: actor directory and peer messaging
//! - [`agora_runtime`]: the actor turn loop, dispatch, reminders, the
//!   Anthropic client and the in-process [`LocalHost`]

pub use agora_core;
pub use agora_mesh;
pub use agora_runtime;
pub use agora_tools;

pub use agora_core::{
    ActorConfig, ActorHandle, ActorHost, ActorId, ActorIdentity, ActorStatus, AgoraError,
    CompletionService, ConversationSnapshot, ConversationState, Decision, InboundMessage,
    OperatorChannel, PersonaType, RunId, ToolDescriptor, ToolRegistry,
};
pub use agora_mesh::{ActorDirectory, Messenger};
pub use agora_runtime::{AnthropicClient, AnthropicConfig, LocalHost, RuntimeSettings};
pub use agora_tools::{ExecutionResult, ToolHandler};
