//! Scripted actor host for directory and messaging tests

use agora_core::error::{HostError, HostResult};
use agora_core::host::{ActorHost, ActorStatus};
use agora_core::identifiers::{ActorHandle, ActorIdentity};
use agora_core::message::InboundMessage;
use agora_core::state::ConversationSnapshot;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One scripted answer to a status lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStep {
    Status(ActorStatus),
    /// The lookup itself fails
    Fail,
}

#[derive(Debug, Default)]
struct HostLog {
    scripts: HashMap<ActorHandle, VecDeque<LookupStep>>,
    lookups: Vec<ActorHandle>,
    starts: Vec<ActorIdentity>,
    signals: Vec<(ActorHandle, InboundMessage)>,
    snapshots: HashMap<ActorHandle, ConversationSnapshot>,
}

/// An `ActorHost` whose status answers are scripted per handle.
///
/// Each lookup consumes the next scripted step; the last step repeats once
/// the script is exhausted. Handles without a script report `NotFound`.
/// Starts and signals are recorded, never executed.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    log: Arc<Mutex<HostLog>>,
    fail_signals: bool,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, handle: &ActorHandle, steps: Vec<LookupStep>) -> Self {
        self.log
            .lock()
            .unwrap()
            .scripts
            .insert(handle.clone(), steps.into());
        self
    }

    pub fn with_statuses(self, handle: &ActorHandle, statuses: Vec<ActorStatus>) -> Self {
        let steps = statuses.into_iter().map(LookupStep::Status).collect();
        self.with_script(handle, steps)
    }

    pub fn with_snapshot(self, snapshot: ConversationSnapshot) -> Self {
        let handle = snapshot.state.identity.handle();
        self.log.lock().unwrap().snapshots.insert(handle, snapshot);
        self
    }

    /// Every signal fails with `HostError::Unavailable`
    pub fn with_failing_signals(mut self) -> Self {
        self.fail_signals = true;
        self
    }

    pub fn start_calls(&self) -> Vec<ActorIdentity> {
        self.log.lock().unwrap().starts.clone()
    }

    pub fn signals(&self) -> Vec<(ActorHandle, InboundMessage)> {
        self.log.lock().unwrap().signals.clone()
    }

    pub fn signals_to(&self, handle: &ActorHandle) -> Vec<InboundMessage> {
        self.signals()
            .into_iter()
            .filter(|(h, _)| h == handle)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn lookup_count(&self, handle: &ActorHandle) -> usize {
        self.log
            .lock()
            .unwrap()
            .lookups
            .iter()
            .filter(|h| *h == handle)
            .count()
    }
}

#[async_trait]
impl ActorHost for MockHost {
    async fn start_actor(&self, identity: &ActorIdentity) -> HostResult<()> {
        self.log.lock().unwrap().starts.push(identity.clone());
        Ok(())
    }

    async fn status(&self, handle: &ActorHandle) -> HostResult<ActorStatus> {
        let mut log = self.log.lock().unwrap();
        log.lookups.push(handle.clone());
        let step = match log.scripts.get_mut(handle) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().copied(),
            None => None,
        };
        match step {
            Some(LookupStep::Status(status)) => Ok(status),
            Some(LookupStep::Fail) => Err(HostError::NotFound(handle.clone())),
            None => Ok(ActorStatus::NotFound),
        }
    }

    async fn signal(&self, handle: &ActorHandle, message: InboundMessage) -> HostResult<()> {
        if self.fail_signals {
            return Err(HostError::Unavailable(handle.clone()));
        }
        self.log
            .lock()
            .unwrap()
            .signals
            .push((handle.clone(), message));
        Ok(())
    }

    async fn query(&self, handle: &ActorHandle) -> HostResult<ConversationSnapshot> {
        self.log
            .lock()
            .unwrap()
            .snapshots
            .get(handle)
            .cloned()
            .ok_or_else(|| HostError::NotFound(handle.clone()))
    }
}
