//! Builders for identities, configs and scripted decisions

use agora_core::config::ActorConfig;
use agora_core::decision::Decision;
use agora_core::identifiers::{ActorId, ActorIdentity, PersonaType, RunId};
use agora_core::state::PeerInfo;
use agora_core::transcript::ContentBlock;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Identity from string literals; panics on invalid ids
pub fn identity(persona: &str, actor: &str, run: &str) -> ActorIdentity {
    ActorIdentity::new(
        PersonaType::parse(persona).unwrap(),
        ActorId::parse(actor).unwrap(),
        RunId::parse(run).unwrap(),
    )
}

pub fn actor_id(id: &str) -> ActorId {
    ActorId::parse(id).unwrap()
}

/// Consumer config that knows one issuer peer
pub fn consumer_config(issuer: &str) -> ActorConfig {
    ActorConfig::new("You are a dedicated personal shopping assistant.").with_peer(
        actor_id(issuer),
        PeerInfo::new(PersonaType::parse("Issuer").unwrap(), "Bank issuing payment plans"),
    )
}

/// Issuer config that knows one consumer peer
pub fn issuer_config(consumer: &str) -> ActorConfig {
    ActorConfig::new("You are a banking assistant.").with_peer(
        actor_id(consumer),
        PeerInfo::new(PersonaType::parse("Consumer").unwrap(), "Premium user"),
    )
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

/// Decision invoking the given `(name, input)` tools with ids `toolu_0..`
pub fn decision_with_tools(calls: Vec<(&str, Value)>) -> Decision {
    Decision::new(
        calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, input))| tool_use(&format!("toolu_{i}"), name, input))
            .collect(),
    )
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
///
/// Works with paused tokio time: the sleeps auto-advance the clock.
pub async fn eventually<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
