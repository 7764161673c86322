//! # Agora Testing
//!
//! Test doubles for the collaborator seams of the actor runtime:
//!
//! - [`MockHost`]: `ActorHost` with scripted status answers, recording
//!   starts and signals
//! - [`MockCompletion`]: `CompletionService` returning scripted decisions
//! - [`RecordingOperator`]: `OperatorChannel` that keeps every notification
//! - [`fixtures`]: identities, configs, decisions, and an `eventually` poller

pub mod fixtures;
pub mod mock_completion;
pub mod mock_host;
pub mod operator;

pub use mock_completion::{MockCompletion, RecordedRequest};
pub use mock_host::{LookupStep, MockHost};
pub use operator::RecordingOperator;
