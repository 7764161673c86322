//! Durable actor state
//!
//! The host saves an [`ActorRecord`] at every quiescent point of an actor:
//! after construction, after each completed or abandoned turn, and after
//! each tool registration. A restarted host resumes actors from these
//! records instead of from their configuration.

use agora_core::error::StoreResult;
use agora_core::identifiers::ActorHandle;
use agora_core::persist;
use agora_core::state::{ConversationSnapshot, ConversationState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub state: ConversationState,
    pub turns_completed: u64,
    pub updated_at: DateTime<Utc>,
}

impl ActorRecord {
    pub fn new(state: ConversationState, turns_completed: u64) -> Self {
        Self {
            state,
            turns_completed,
            updated_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> ActorHandle {
        self.state.identity.handle()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            state: self.state.clone(),
            turns_completed: self.turns_completed,
            taken_at: self.updated_at,
        }
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, record: &ActorRecord) -> StoreResult<()>;

    async fn load(&self, handle: &ActorHandle) -> StoreResult<Option<ActorRecord>>;

    /// Every stored record, in no particular order
    async fn load_all(&self) -> StoreResult<Vec<ActorRecord>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    records: Arc<DashMap<ActorHandle, ActorRecord>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, record: &ActorRecord) -> StoreResult<()> {
        self.records.insert(record.handle(), record.clone());
        Ok(())
    }

    async fn load(&self, handle: &ActorHandle) -> StoreResult<Option<ActorRecord>> {
        Ok(self.records.get(handle).map(|r| r.value().clone()))
    }

    async fn load_all(&self) -> StoreResult<Vec<ActorRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }
}

/// One JSON file per actor under `<dir>/<handle>.json`
#[derive(Debug, Clone)]
pub struct FileStateStore {
    directory: PathBuf,
}

impl FileStateStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        info!(directory = %directory.display(), "Using file state store");
        Self { directory }
    }

    fn record_path(&self, handle: &ActorHandle) -> PathBuf {
        self.directory.join(format!("{handle}.json"))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn save(&self, record: &ActorRecord) -> StoreResult<()> {
        persist::write_json_atomic(&self.record_path(&record.handle()), record).await
    }

    async fn load(&self, handle: &ActorHandle) -> StoreResult<Option<ActorRecord>> {
        persist::read_json(&self.record_path(handle)).await
    }

    async fn load_all(&self) -> StoreResult<Vec<ActorRecord>> {
        let mut records = Vec::new();
        for path in persist::list_json_files(&self.directory).await? {
            match persist::read_json::<ActorRecord>(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable actor record"),
            }
        }
        Ok(records)
    }
}
