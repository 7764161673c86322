//! Scripted completion service

use agora_core::completion::{CompletionRequest, CompletionService};
use agora_core::decision::Decision;
use agora_core::error::{CompletionError, CompletionResult};
use agora_core::transcript::Transcript;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Owned copy of a request the mock received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub transcript: Transcript,
    pub tool_names: Vec<String>,
    pub force_tool_use: bool,
}

#[derive(Debug)]
enum Scripted {
    Decision(Decision),
    Error(String),
    /// Never answers within any reasonable timeout
    Hang,
}

/// Returns scripted decisions in order, recording every request.
///
/// Once the script is exhausted every call fails with `InvalidResponse`.
#[derive(Debug, Clone, Default)]
pub struct MockCompletion {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decision(self, decision: Decision) -> Self {
        self.push(Scripted::Decision(decision));
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Error(message.into()));
        self
    }

    pub fn with_hang(self) -> Self {
        self.push(Scripted::Hang);
        self
    }

    /// Append a decision to a mock that is already shared
    pub fn push_decision(&self, decision: Decision) {
        self.push(Scripted::Decision(decision));
    }

    fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: CompletionRequest<'_>) -> CompletionResult<Decision> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system_prompt: request.system_prompt.to_string(),
            transcript: request.transcript.clone(),
            tool_names: request.tools.names().into_iter().map(String::from).collect(),
            force_tool_use: request.force_tool_use,
        });

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Scripted::Decision(decision)) => Ok(decision),
            Some(Scripted::Error(message)) => Err(CompletionError::Network(message)),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(CompletionError::Timeout(Duration::from_secs(24 * 60 * 60)))
            }
            None => Err(CompletionError::InvalidResponse(
                "no scripted decision left".to_string(),
            )),
        }
    }
}
