//! The completion service's structured reply for one turn

use crate::identifiers::IdValidationError;
use crate::tool::ToolDispatch;
use crate::transcript::ContentBlock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub content: Vec<ContentBlock>,
}

/// A tool invocation extracted from a decision, in reply order
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

impl ToolInvocation<'_> {
    pub fn dispatch(&self) -> Result<ToolDispatch, IdValidationError> {
        ToolDispatch::from_name(self.name)
    }
}

impl Decision {
    pub fn new(content: Vec<ContentBlock>) -> Self {
        Self { content }
    }

    pub fn tool_invocations(&self) -> impl Iterator<Item = ToolInvocation<'_>> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolInvocation { id, name, input }),
            _ => None,
        })
    }

    /// Id the aggregate tool result is correlated to: the first invocation's
    pub fn correlation_id(&self) -> Option<&str> {
        self.tool_invocations().next().map(|inv| inv.id)
    }

    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invocations_preserve_reply_order() {
        let decision = Decision::new(vec![
            ContentBlock::text("thinking"),
            ContentBlock::ToolUse {
                id: "t1".into(),
                name: "send_agents_message".into(),
                input: json!({}),
            },
            ContentBlock::ToolUse {
                id: "t2".into(),
                name: "send_operator_message".into(),
                input: json!({}),
            },
        ]);

        let names: Vec<_> = decision.tool_invocations().map(|i| i.name).collect();
        assert_eq!(names, vec!["send_agents_message", "send_operator_message"]);
        assert_eq!(decision.correlation_id(), Some("t1"));
        assert_eq!(decision.text(), "thinking");
    }

    #[test]
    fn text_only_decision_has_no_correlation() {
        let decision = Decision::new(vec![ContentBlock::text("hi")]);
        assert_eq!(decision.tool_invocations().count(), 0);
        assert_eq!(decision.correlation_id(), None);
    }
}
