//! Completion service seam

use crate::decision::Decision;
use crate::error::CompletionResult;
use crate::tool::ToolRegistry;
use crate::transcript::Transcript;
use async_trait::async_trait;

/// Everything the model sees for one decision
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub transcript: &'a Transcript,
    pub tools: &'a ToolRegistry,
    /// Require the reply to invoke at least one tool
    pub force_tool_use: bool,
}

/// A language-model service returning structured decisions.
///
/// Errors are faults; a partially decoded decision is never returned.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> CompletionResult<Decision>;
}
