//! Message and result transformers.

use gambit_types::{Message, Role};

/// Rewrites the message history at a defined loop point.
///
/// Transformers are applied in list order, each receiving the previous
/// one's output.
pub trait MessageTransformer: Send + Sync {
    /// Produce the transformed history.
    fn transform(&self, messages: Vec<Message>) -> Vec<Message>;
}

/// Rewrites a tool result string before it enters the history.
pub trait ResultTransformer: Send + Sync {
    /// Produce the transformed result text.
    fn transform(&self, tool: &str, text: String) -> String;
}

/// Keeps the history within `max_messages`, optionally preserving system
/// messages outside the window.
///
/// With `preserve_system_messages`, system messages always survive and the
/// window budget covers them: the result is the system messages plus the
/// most recent non-system messages up to `max_messages` total.
pub struct SlidingWindowTransformer {
    /// Maximum messages to keep, including preserved system messages.
    pub max_messages: usize,
    /// Whether system messages are always retained.
    pub preserve_system_messages: bool,
}

impl MessageTransformer for SlidingWindowTransformer {
    fn transform(&self, messages: Vec<Message>) -> Vec<Message> {
        if messages.len() <= self.max_messages {
            return messages;
        }
        if !self.preserve_system_messages {
            let skip = messages.len() - self.max_messages;
            return messages.into_iter().skip(skip).collect();
        }

        let (system, rest): (Vec<Message>, Vec<Message>) = messages
            .into_iter()
            .partition(|m| m.role == Role::System);
        let budget = self.max_messages.saturating_sub(system.len());
        let skip = rest.len().saturating_sub(budget);
        let recent = rest.into_iter().skip(skip);

        let mut result = system;
        result.extend(recent);
        result
    }
}

/// Truncates tool result text to a maximum number of characters.
pub struct TruncatingResultTransformer {
    /// Maximum characters to keep.
    pub max_chars: usize,
}

impl ResultTransformer for TruncatingResultTransformer {
    fn transform(&self, tool: &str, text: String) -> String {
        if text.chars().count() <= self.max_chars {
            return text;
        }
        let kept: String = text.chars().take(self.max_chars).collect();
        tracing::debug!(
            tool,
            dropped_chars = text.chars().count() - self.max_chars,
            "truncated tool result"
        );
        format!("{kept}… [truncated]")
    }
}
