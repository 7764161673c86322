//! Descriptors for the builtin tools every actor is seeded with

use agora_core::state::Peers;
use agora_core::tool::{BuiltinTool, ToolDescriptor, ToolRegistry};
use serde_json::{Value, json};

const THINKING: &str = "Think out loud about what to do next and why.";

/// Descriptor for one builtin tool.
///
/// `peers` constrains the recipients `send_agents_message` may address.
pub fn builtin_descriptor(tool: BuiltinTool, peers: &Peers) -> ToolDescriptor {
    let (description, input_schema) = match tool {
        BuiltinTool::SendAgentsMessage => (
            "Use this tool ONLY when you cannot proceed without critical information or \
             assistance from other agents. Only use it if the task is impossible to complete \
             without external agent input.",
            send_agents_message_schema(peers),
        ),
        BuiltinTool::SendOperatorMessage => (
            "Send a message to your user/operator. Use it for final results or when you need \
             their guidance.",
            json!({
                "type": "object",
                "properties": {
                    "thinking": {"type": "string", "description": THINKING},
                    "operator_message": {
                        "type": "string",
                        "description": "The message to show to your operator."
                    }
                },
                "required": ["thinking", "operator_message"],
                "additionalProperties": false
            }),
        ),
        BuiltinTool::ScheduleReminder => (
            "Schedule yourself a reminder to follow up on tasks or messages. The reminder is \
             delivered to you after the given number of seconds.",
            json!({
                "type": "object",
                "properties": {
                    "thinking": {"type": "string", "description": THINKING},
                    "time": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Delay in seconds before the reminder is delivered."
                    },
                    "message": {
                        "type": "string",
                        "description": "What the reminder should tell you."
                    }
                },
                "required": ["thinking", "time", "message"],
                "additionalProperties": false
            }),
        ),
        BuiltinTool::Calculator => (
            "A calculator for basic arithmetic: + - * / and parentheses.",
            json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "The arithmetic expression to evaluate, e.g. (1200-200)*0.9"
                    }
                },
                "required": ["expression"],
                "additionalProperties": false
            }),
        ),
        BuiltinTool::WaitForAssistance => (
            "Use this tool to wait for assistance from the operator.",
            json!({
                "type": "object",
                "properties": {
                    "thinking": {"type": "string", "description": THINKING},
                    "wait_message": {
                        "type": "string",
                        "description": "A clear message for the operator explaining what you are waiting for."
                    }
                },
                "required": ["thinking", "wait_message"],
                "additionalProperties": false
            }),
        ),
    };
    ToolDescriptor::new(tool.tool_name(), description, input_schema)
}

fn send_agents_message_schema(peers: &Peers) -> Value {
    let ids: Vec<&str> = peers.keys().map(|id| id.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "thinking": {"type": "string", "description": THINKING},
            "agent_messages": {
                "type": "array",
                "description": "Messages to send to agents of other operators.",
                "items": {
                    "type": "object",
                    "properties": {
                        "to_id": {
                            "type": "string",
                            "description": "User id of the agent.",
                            "enum": ids
                        },
                        "message": {
                            "type": "string",
                            "description": "The message to send to the agent."
                        },
                        "agent_type": {
                            "type": "string",
                            "description": "The destination agent type."
                        }
                    },
                    "required": ["to_id", "message", "agent_type"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["thinking", "agent_messages"]
    })
}

/// Registry seeded with every builtin tool, in [`BuiltinTool::all`] order
pub fn builtin_registry(peers: &Peers) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in BuiltinTool::all() {
        // builtin names are distinct, so registration cannot collide
        let _ = registry.register(builtin_descriptor(*tool, peers));
    }
    registry
}
