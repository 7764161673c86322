//! Tool descriptors, the per-actor tool registry, and tool-name dispatch

use crate::error::{RegistryError, RegistryResult};
use crate::identifiers::{IdValidationError, ToolName};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tools every actor is seeded with.
///
/// Their effects are implemented by the runtime's dispatcher; the registry
/// only carries their descriptors so the completion service can see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    /// Send one or more messages to peer actors
    SendAgentsMessage,
    /// Notify the human operator
    SendOperatorMessage,
    /// Schedule a delayed reminder to oneself
    ScheduleReminder,
    /// Evaluate an arithmetic expression
    Calculator,
    /// Tell the operator the actor is waiting for assistance
    WaitForAssistance,
}

impl BuiltinTool {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTool::SendAgentsMessage => "send_agents_message",
            BuiltinTool::SendOperatorMessage => "send_operator_message",
            BuiltinTool::ScheduleReminder => "schedule_reminder",
            BuiltinTool::Calculator => "calculator",
            BuiltinTool::WaitForAssistance => "wait_for_assistance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "send_agents_message" => Some(BuiltinTool::SendAgentsMessage),
            "send_operator_message" => Some(BuiltinTool::SendOperatorMessage),
            "schedule_reminder" => Some(BuiltinTool::ScheduleReminder),
            "calculator" => Some(BuiltinTool::Calculator),
            "wait_for_assistance" => Some(BuiltinTool::WaitForAssistance),
            _ => None,
        }
    }

    /// All builtin tools in registry seeding order
    pub fn all() -> &'static [BuiltinTool] {
        &[
            BuiltinTool::SendAgentsMessage,
            BuiltinTool::SendOperatorMessage,
            BuiltinTool::ScheduleReminder,
            BuiltinTool::WaitForAssistance,
            BuiltinTool::Calculator,
        ]
    }

    pub fn tool_name(&self) -> ToolName {
        ToolName::new_unchecked(self.name())
    }
}

/// How a tool invocation named by the model is routed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolDispatch {
    /// One of the runtime's builtin effects
    Builtin(BuiltinTool),
    /// A tool registered at runtime, served by an external handler
    Custom(ToolName),
}

impl ToolDispatch {
    /// Decode a tool name once at the completion boundary.
    pub fn from_name(name: &str) -> Result<Self, IdValidationError> {
        match BuiltinTool::from_name(name) {
            Some(builtin) => Ok(ToolDispatch::Builtin(builtin)),
            None => Ok(ToolDispatch::Custom(ToolName::parse(name)?)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ToolDispatch::Builtin(tool) => tool.name(),
            ToolDispatch::Custom(name) => name.as_str(),
        }
    }
}

/// A callable tool as advertised to the completion service.
///
/// Descriptors are never mutated after they enter a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: String,
    /// JSON schema of the tool's input object
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: ToolName, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name,
            description: description.into(),
            input_schema,
        }
    }

    /// Build a descriptor from an unvalidated name
    pub fn try_new(
        name: &str,
        description: impl Into<String>,
        input_schema: Value,
    ) -> RegistryResult<Self> {
        let name = ToolName::parse(name).map_err(|source| RegistryError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        Ok(Self::new(name, description, input_schema))
    }
}

/// Ordered, append-only set of tool descriptors with unique names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor, rejecting a name that is already present
    pub fn register(&mut self, descriptor: ToolDescriptor) -> RegistryResult<()> {
        if self.contains(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        self.tools.push(descriptor);
        Ok(())
    }

    /// Builder-style registration
    pub fn try_with_tool(mut self, descriptor: ToolDescriptor) -> RegistryResult<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    pub fn contains(&self, name: &ToolName) -> bool {
        self.tools.iter().any(|t| &t.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn as_slice(&self) -> &[ToolDescriptor] {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::try_new(name, "test tool", json!({"type": "object"})).unwrap()
    }

    #[test]
    fn builtin_names_roundtrip() {
        for tool in BuiltinTool::all() {
            assert_eq!(BuiltinTool::from_name(tool.name()), Some(*tool));
        }
        assert_eq!(BuiltinTool::from_name("weather"), None);
    }

    #[test]
    fn dispatch_decodes_builtin_and_custom() {
        assert_eq!(
            ToolDispatch::from_name("calculator").unwrap(),
            ToolDispatch::Builtin(BuiltinTool::Calculator)
        );
        assert!(matches!(
            ToolDispatch::from_name("fx_rates").unwrap(),
            ToolDispatch::Custom(ref name) if name.as_str() == "fx_rates"
        ));
        assert!(ToolDispatch::from_name("rm -rf").is_err());
    }

    #[test]
    fn registry_rejects_duplicate_names_and_keeps_order() {
        let mut registry = ToolRegistry::new();
        registry.register(descriptor("alpha")).unwrap();
        registry.register(descriptor("beta")).unwrap();

        let err = registry.register(descriptor("alpha")).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate(ToolName::new_unchecked("alpha")));
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
    }

    #[test]
    fn registry_serializes_as_anthropic_tool_list() {
        let registry = ToolRegistry::new().try_with_tool(descriptor("alpha")).unwrap();
        let value = serde_json::to_value(&registry).unwrap();
        assert_eq!(
            value,
            json!([{"name": "alpha", "description": "test tool", "input_schema": {"type": "object"}}])
        );
    }

    #[test]
    fn invalid_descriptor_name_is_rejected() {
        let err = ToolDescriptor::try_new("bad name", "", json!({})).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { .. }));
    }
}
