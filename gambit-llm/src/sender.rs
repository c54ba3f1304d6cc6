//! The message-sender seam and model-provider lookup.

use async_trait::async_trait;
use gambit_types::{ContentBlock, LlmError, LlmOptions, Message, ModelRole, Role, TokenUsage, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// What a sender returns for one call.
///
/// Providers may return multiple candidate generations; all of them come
/// back to the core, which folds them into a single assistant message.
#[derive(Debug, Clone)]
pub struct SenderReply {
    /// Candidate assistant messages, best first.
    pub candidates: Vec<Message>,
    /// Token usage for the call.
    pub usage: TokenUsage,
}

impl SenderReply {
    /// A reply with a single candidate.
    #[must_use]
    pub fn single(message: Message, usage: TokenUsage) -> Self {
        Self {
            candidates: vec![message],
            usage,
        }
    }
}

/// Single-shot LLM message sender.
///
/// The sender must NOT execute tools itself — tool-call *requests* surface
/// in the returned assistant message and the loop decides what runs.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send the conversation and tool listing, return the assistant reply.
    async fn send(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<SenderReply, LlmError>;
}

/// Looks up an LLM service by symbolic role or concrete name.
pub trait ModelProvider: Send + Sync {
    /// A sender configured per `options`. Failing lookup is
    /// [`LlmError::NoSuitableModel`].
    fn sender_for(&self, options: &LlmOptions) -> Result<Arc<dyn MessageSender>, LlmError>;
}

/// A static model registry: one sender per role, plus named entries.
#[derive(Default)]
pub struct ModelRegistry {
    best: Option<Arc<dyn MessageSender>>,
    cheapest: Option<Arc<dyn MessageSender>>,
    named: HashMap<String, Arc<dyn MessageSender>>,
}

impl ModelRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sender used for [`ModelRole::Best`].
    #[must_use]
    pub fn with_best(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.best = Some(sender);
        self
    }

    /// Register the sender used for [`ModelRole::Cheapest`].
    #[must_use]
    pub fn with_cheapest(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.cheapest = Some(sender);
        self
    }

    /// Register a sender under a concrete model name.
    #[must_use]
    pub fn with_named(mut self, name: impl Into<String>, sender: Arc<dyn MessageSender>) -> Self {
        self.named.insert(name.into(), sender);
        self
    }
}

impl ModelProvider for ModelRegistry {
    fn sender_for(&self, options: &LlmOptions) -> Result<Arc<dyn MessageSender>, LlmError> {
        let found = match &options.role {
            ModelRole::Best => self.best.clone().or_else(|| self.cheapest.clone()),
            ModelRole::Cheapest => self.cheapest.clone().or_else(|| self.best.clone()),
            ModelRole::Named(name) => self.named.get(name).cloned(),
            _ => None,
        };
        found.ok_or_else(|| LlmError::NoSuitableModel(role_label(&options.role).to_string()))
    }
}

/// Human-readable label for a model role, used in events and errors.
#[must_use]
pub fn role_label(role: &ModelRole) -> &str {
    match role {
        ModelRole::Best => "best",
        ModelRole::Cheapest => "cheapest",
        ModelRole::Named(name) => name.as_str(),
        _ => "unknown",
    }
}

/// Fold candidate generations into a single assistant message.
///
/// Non-empty text blocks are concatenated in candidate order; tool calls
/// are unioned across all candidates (deduplicated by call ID). Taking only
/// the first candidate would lose tool calls a provider emitted in a
/// non-first generation.
#[must_use]
pub fn fold_candidates(candidates: &[Message]) -> Message {
    if candidates.len() == 1 {
        return candidates[0].clone();
    }
    tracing::debug!(
        candidates = candidates.len(),
        "folding multiple candidate generations into one assistant message"
    );

    let mut content: Vec<ContentBlock> = Vec::new();
    let mut seen_calls: Vec<String> = Vec::new();
    for candidate in candidates {
        for block in &candidate.content {
            match block {
                ContentBlock::Text { text } if !text.is_empty() => {
                    content.push(block.clone());
                }
                ContentBlock::ToolUse { id, .. } => {
                    if !seen_calls.contains(&id.0) {
                        seen_calls.push(id.0.clone());
                        content.push(block.clone());
                    }
                }
                _ => {}
            }
        }
    }
    Message {
        role: Role::Assistant,
        content,
    }
}
