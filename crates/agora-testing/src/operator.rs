//! Operator channel that records notifications

use agora_core::identifiers::{ActorHandle, ActorIdentity};
use agora_core::operator::OperatorChannel;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct RecordingOperator {
    notifications: Arc<Mutex<Vec<(ActorHandle, String)>>>,
}

impl RecordingOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(ActorHandle, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|(_, message)| message)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

#[async_trait]
impl OperatorChannel for RecordingOperator {
    async fn notify(&self, actor: &ActorIdentity, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((actor.handle(), message.to_string()));
    }
}
