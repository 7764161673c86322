//! Persisted per-actor configuration
//!
//! An [`ActorConfig`] is written by a launcher before the actor first starts
//! and consumed, as a plain value, when the actor's state is constructed. The
//! runtime never writes it back.

use crate::error::ConfigError;
use crate::identifiers::{ActorId, PersonaType};
use crate::persist;
use crate::state::{PeerInfo, Peers};
use crate::tool::ToolDescriptor;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_LANGUAGE: &str = "English";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Persona prompt template; actor id, peers and language are appended
    #[serde(alias = "system_msg")]
    pub system_prompt: String,
    #[serde(alias = "agents", default)]
    pub peers: Peers,
    #[serde(default = "default_language")]
    pub language: String,
    /// Extra tools offered on top of the builtin set
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl ActorConfig {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            peers: Peers::new(),
            language: default_language(),
            tools: Vec::new(),
        }
    }

    pub fn with_peer(mut self, id: ActorId, info: PeerInfo) -> Self {
        self.peers.insert(id, info);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_tool(mut self, descriptor: ToolDescriptor) -> Self {
        self.tools.push(descriptor);
        self
    }

    /// Final system prompt for `actor_id`: the template followed by the
    /// operator id, the peers it may contact, and the reply language.
    pub fn compose_system_prompt(&self, actor_id: &ActorId) -> String {
        let peers = serde_json::to_string_pretty(&self.peers).unwrap_or_default();
        format!(
            "{}\nUser/Operator ID: {}\nAgents you can communicate with\n{}\nReply to your operator in {}.\n",
            self.system_prompt.trim(),
            actor_id,
            peers,
            self.language
        )
    }
}

/// External store the actor configuration is read from
#[async_trait]
pub trait ActorConfigStore: Send + Sync {
    async fn load(
        &self,
        persona_type: &PersonaType,
        actor_id: &ActorId,
    ) -> Result<ActorConfig, ConfigError>;

    async fn save(
        &self,
        persona_type: &PersonaType,
        actor_id: &ActorId,
        config: &ActorConfig,
    ) -> Result<(), ConfigError>;
}

fn config_key(persona_type: &PersonaType, actor_id: &ActorId) -> String {
    format!("{}_{}", persona_type.canonical(), actor_id)
}

/// Configurations kept in memory, for tests and embedded hosts
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    configs: Arc<DashMap<String, ActorConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActorConfigStore for InMemoryConfigStore {
    async fn load(
        &self,
        persona_type: &PersonaType,
        actor_id: &ActorId,
    ) -> Result<ActorConfig, ConfigError> {
        self.configs
            .get(&config_key(persona_type, actor_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ConfigError::NotFound {
                persona_type: persona_type.clone(),
                actor_id: actor_id.clone(),
            })
    }

    async fn save(
        &self,
        persona_type: &PersonaType,
        actor_id: &ActorId,
        config: &ActorConfig,
    ) -> Result<(), ConfigError> {
        self.configs
            .insert(config_key(persona_type, actor_id), config.clone());
        Ok(())
    }
}

/// One JSON file per actor: `<dir>/<persona>_<actor_id>.json`
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    directory: PathBuf,
}

impl FileConfigStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn config_path(&self, persona_type: &PersonaType, actor_id: &ActorId) -> PathBuf {
        self.directory
            .join(format!("{}.json", config_key(persona_type, actor_id)))
    }
}

#[async_trait]
impl ActorConfigStore for FileConfigStore {
    async fn load(
        &self,
        persona_type: &PersonaType,
        actor_id: &ActorId,
    ) -> Result<ActorConfig, ConfigError> {
        let path = self.config_path(persona_type, actor_id);
        let config = persist::read_json::<ActorConfig>(&path).await?;
        debug!(path = ?path, found = config.is_some(), "Loaded actor config");
        config.ok_or_else(|| ConfigError::NotFound {
            persona_type: persona_type.clone(),
            actor_id: actor_id.clone(),
        })
    }

    async fn save(
        &self,
        persona_type: &PersonaType,
        actor_id: &ActorId,
        config: &ActorConfig,
    ) -> Result<(), ConfigError> {
        let path = self.config_path(persona_type, actor_id);
        persist::write_json_atomic(&path, config).await?;
        info!(path = %path.display(), "Actor config written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids() -> (PersonaType, ActorId) {
        (
            PersonaType::parse("Issuer").unwrap(),
            ActorId::parse("HDFCBank").unwrap(),
        )
    }

    #[test]
    fn composed_prompt_names_operator_and_peers() {
        let config = ActorConfig::new("  You are a banking assistant.  ")
            .with_peer(
                ActorId::parse("Amazon").unwrap(),
                PeerInfo::new(PersonaType::parse("Merchant").unwrap(), "e-commerce"),
            )
            .with_language("Bengali");

        let prompt = config.compose_system_prompt(&ActorId::parse("HDFCBank").unwrap());
        assert!(prompt.starts_with("You are a banking assistant.\nUser/Operator ID: HDFCBank\n"));
        assert!(prompt.contains("\"Amazon\""));
        assert!(prompt.ends_with("Reply to your operator in Bengali.\n"));
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let config: ActorConfig = serde_json::from_value(json!({
            "system_msg": "prompt",
            "agents": {"Anil": {"type": "Consumer", "about": "premium user"}}
        }))
        .unwrap();
        assert_eq!(config.language, DEFAULT_LANGUAGE);
        assert_eq!(
            config.peers[&ActorId::parse("Anil").unwrap()].description,
            "premium user"
        );
    }

    #[tokio::test]
    async fn file_store_roundtrips_under_persona_prefixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path());
        let (persona, actor) = ids();
        let config = ActorConfig::new("prompt");

        store.save(&persona, &actor, &config).await.unwrap();

        assert!(dir.path().join("issuer_HDFCBank.json").exists());
        assert_eq!(store.load(&persona, &actor).await.unwrap(), config);
    }

    #[tokio::test]
    async fn missing_config_is_reported() {
        let store = InMemoryConfigStore::new();
        let (persona, actor) = ids();
        let err = store.load(&persona, &actor).await.unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
