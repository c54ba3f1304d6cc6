//! Conversation messages exchanged with an LLM message sender.

use crate::id::ToolCallId;
use crate::tool::ToolCall;
use serde::{Deserialize, Serialize};

/// The role of a message author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions.
    System,
    /// A human user (or the engine speaking on their behalf).
    User,
    /// The model.
    Assistant,
    /// A tool result fed back to the model.
    Tool,
}

/// A content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A tool invocation request from the model.
    ToolUse {
        /// Unique identifier for this tool call.
        id: ToolCallId,
        /// Name of the tool to invoke.
        name: String,
        /// JSON input arguments.
        input: serde_json::Value,
    },
    /// Result of a tool invocation.
    ToolResult {
        /// References the `id` from the corresponding `ToolUse`.
        tool_call_id: ToolCallId,
        /// The result content as fed back to the model.
        content: String,
        /// Whether this result represents an error.
        is_error: bool,
    },
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// The content blocks of this message.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a system message with a single text block.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Create a user message with a single text block.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Create an assistant message with a single text block.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Create an assistant message from explicit content blocks.
    #[must_use]
    pub fn assistant_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Create a tool-result message referencing a tool call.
    #[must_use]
    pub fn tool_result(
        tool_call_id: ToolCallId,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentBlock::ToolResult {
                tool_call_id,
                content: content.into(),
                is_error,
            }],
        }
    }

    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// All tool calls requested by this message, in block order.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Whether this message requests any tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        assert_eq!(
            Message::tool_result(ToolCallId::new("t1"), "out", false).role,
            Role::Tool
        );
    }

    #[test]
    fn text_concatenates_text_blocks_only() {
        let msg = Message::assistant_blocks(vec![
            ContentBlock::Text { text: "a".into() },
            ContentBlock::ToolUse {
                id: ToolCallId::new("t1"),
                name: "x".into(),
                input: json!({}),
            },
            ContentBlock::Text { text: "b".into() },
        ]);
        assert_eq!(msg.text(), "ab");
    }

    #[test]
    fn tool_calls_extracted_in_order() {
        let msg = Message::assistant_blocks(vec![
            ContentBlock::ToolUse {
                id: ToolCallId::new("t1"),
                name: "first".into(),
                input: json!({"k": 1}),
            },
            ContentBlock::ToolUse {
                id: ToolCallId::new("t2"),
                name: "second".into(),
                input: json!({}),
            },
        ]);
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "first");
        assert_eq!(calls[1].name, "second");
        assert!(msg.has_tool_calls());
        assert!(!Message::assistant("done").has_tool_calls());
    }

    #[test]
    fn content_block_serde_tags() {
        let block = ContentBlock::ToolResult {
            tool_call_id: ToolCallId::new("t1"),
            content: "ok".into(),
            is_error: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(block, back);
    }
}
