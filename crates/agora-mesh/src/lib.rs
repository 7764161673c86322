//! # Agora Mesh
//!
//! Locating and signalling peer actors.
//!
//! [`ActorDirectory`] resolves an identity to its handle, starts the actor in
//! the background when it is absent, terminated or failed, and polls with a
//! fixed backoff until the host reports it running. [`Messenger`] builds on
//! it to deliver a [`PeerMessage`](agora_core::PeerMessage) and return the
//! acknowledgment text the sender's model sees.

pub mod directory;
pub mod error;
pub mod messenger;

pub use directory::{ActorDirectory, DirectoryConfig};
pub use error::{MeshError, MeshResult};
pub use messenger::{Messenger, PeerDelivery, delivery_acknowledgment};
