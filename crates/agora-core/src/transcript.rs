//! Conversation transcript: ordered turns of structured content blocks

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed text block of every tool-result turn
pub const TOOL_RESPONSE_PREAMBLE: &str = "Here is the tool response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of turn content.
///
/// This is the closed set of block kinds the runtime understands. Provider
/// responses are decoded into it once, at the completion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// The `user` turn that answers an assistant turn's tool invocations.
    ///
    /// The aggregate result is attached to `correlation_id`. Any further
    /// invocation ids from the same decision get a pointer back to it, so
    /// every `tool_use` in the preceding turn has a matching `tool_result`.
    /// The provider only accepts `tool_result` blocks ahead of any text, so
    /// [`TOOL_RESPONSE_PREAMBLE`] goes last.
    pub fn tool_result(
        correlation_id: Option<&str>,
        other_ids: &[&str],
        aggregate: impl Into<String>,
    ) -> Self {
        let aggregate = aggregate.into();
        let content = match correlation_id {
            Some(id) => {
                let mut content = vec![ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content: aggregate,
                }];
                content.extend(other_ids.iter().map(|other| ContentBlock::ToolResult {
                    tool_use_id: other.to_string(),
                    content: format!("Included in the tool response for {id}."),
                }));
                content.push(ContentBlock::text(TOOL_RESPONSE_PREAMBLE));
                content
            }
            None => vec![
                ContentBlock::text(TOOL_RESPONSE_PREAMBLE),
                ContentBlock::text(aggregate),
            ],
        };
        Self {
            role: Role::User,
            content,
        }
    }

    /// Concatenated text blocks, mostly useful for logging and assertions
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolResult { content, .. } => Some(content.as_str()),
                ContentBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Append-only sequence of turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}
