//! # Agora Runtime
//!
//! Runs agent actors: the per-identity turn loop, tool dispatch, detached
//! reminders, the Anthropic completion client, and [`LocalHost`], an
//! in-process durable host implementing
//! [`ActorHost`](agora_core::ActorHost).
//!
//! ```no_run
//! use agora_runtime::{AnthropicClient, AnthropicConfig, LocalHost, RuntimeSettings};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let completion = AnthropicClient::new(AnthropicConfig::from_env()?);
//! let host = LocalHost::builder(Arc::new(completion))
//!     .settings(RuntimeSettings::from_env()?)
//!     .file_stores()
//!     .build();
//! # let _ = host;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod completion;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod reminder;
pub mod settings;
pub mod store;

pub use actor::{ActorCommand, ActorPhase, AgentActor, TurnOutcome};
pub use completion::{AnthropicClient, AnthropicConfig};
pub use dispatch::{OPERATOR_ACKNOWLEDGMENT, ToolDispatcher};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{LocalHost, LocalHostBuilder};
pub use reminder::{
    FileReminderStore, InMemoryReminderStore, PendingReminder, REMINDER_ACKNOWLEDGMENT,
    ReminderHandle, ReminderScheduler, ReminderStore,
};
pub use settings::{RuntimeSettings, RuntimeSettingsBuilder};
pub use store::{ActorRecord, FileStateStore, InMemoryStateStore, StateStore};
