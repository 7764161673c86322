//! Handlers for tools registered at runtime
//!
//! A custom tool is two halves: the [`ToolDescriptor`] the model sees, kept
//! in the actor's conversation state, and a [`ToolHandler`] that executes
//! invocations, kept in a [`HandlerRegistry`] next to the dispatcher.

use agora_core::identifiers::{IdValidationError, ToolName};
use agora_core::tool::ToolDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of one handler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success { output: String },
    Failure { reason: String },
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        ExecutionResult::Success {
            output: output.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Text contributed to the aggregate tool result
    pub fn into_text(self) -> String {
        match self {
            ExecutionResult::Success { output } => output,
            ExecutionResult::Failure { reason } => format!("Error: {reason}"),
        }
    }
}

/// Executes invocations of one custom tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Descriptor advertised to the model when the handler is registered
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool on the raw invocation input
    async fn call(&self, input: Value) -> ExecutionResult;
}

/// Handler built from a synchronous closure
pub struct FnHandler<F> {
    descriptor: ToolDescriptor,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(Value) -> ExecutionResult + Send + Sync,
{
    pub fn new(descriptor: ToolDescriptor, func: F) -> Self {
        Self { descriptor, func }
    }
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> ExecutionResult + Send + Sync,
{
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn call(&self, input: Value) -> ExecutionResult {
        (self.func)(input)
    }
}

/// Custom tool handlers keyed by tool name
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ToolName, Arc<dyn ToolHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its descriptor's name, replacing any
    /// previous handler for that name
    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.insert(handler);
        self
    }

    /// Register a handler under an explicit, unvalidated name
    pub fn try_with_named_handler(
        mut self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, IdValidationError> {
        self.handlers.insert(ToolName::parse(name)?, handler);
        Ok(self)
    }

    pub fn insert(&mut self, handler: Arc<dyn ToolHandler>) -> Option<Arc<dyn ToolHandler>> {
        let name = handler.descriptor().name;
        self.handlers.insert(name, handler)
    }

    pub fn get(&self, name: &ToolName) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &ToolName) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .keys()
            .map(|name| name.as_str().to_string())
            .collect();
        names.sort();
        names
    }

    /// Descriptors of every handler, sorted by name
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.handlers.values().map(|h| h.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
