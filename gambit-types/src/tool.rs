//! The tool interface — callables the model may invoke within a tool loop.

use crate::error::ToolError;
use crate::id::{ProcessId, ToolCallId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Type alias for a pinned, boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Static description of a tool, as presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool's unique name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a definition with an empty-object input schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Replace the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Behavioral metadata attached to a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// When true, the tool's result terminates the tool loop directly
    /// instead of being fed back to the model.
    pub return_direct: bool,
    /// The tool group that owns this tool, if any.
    pub group: Option<String>,
}

/// The result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolResult {
    /// Plain text result.
    Text {
        /// The result content.
        content: String,
    },
    /// Text result accompanied by a structured artifact that does not
    /// travel back to the model.
    WithArtifact {
        /// The result content shown to the model.
        content: String,
        /// The structured artifact for programmatic consumers.
        artifact: serde_json::Value,
    },
    /// A failure the model is allowed to see and react to.
    Error {
        /// The error message.
        message: String,
    },
}

impl ToolResult {
    /// Plain text result.
    pub fn text(content: impl Into<String>) -> Self {
        ToolResult::Text {
            content: content.into(),
        }
    }

    /// Error result.
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error {
            message: message.into(),
        }
    }

    /// Text result with an attached artifact.
    pub fn with_artifact(content: impl Into<String>, artifact: serde_json::Value) -> Self {
        ToolResult::WithArtifact {
            content: content.into(),
            artifact,
        }
    }

    /// The string form of this result, regardless of variant.
    #[must_use]
    pub fn content_str(&self) -> &str {
        match self {
            ToolResult::Text { content } => content,
            ToolResult::WithArtifact { content, .. } => content,
            ToolResult::Error { message } => message,
        }
    }

    /// Whether this result is the error variant.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error { .. })
    }
}

/// A tool call in flight, as requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call (from the model).
    pub id: ToolCallId,
    /// Name of the tool being called.
    pub name: String,
    /// JSON input arguments.
    pub input: serde_json::Value,
}

/// Read access to the agent process a tool is executing inside.
///
/// Tools discover "which process am I in" through this scope rather than
/// through global mutable state. The process-binding decorator installs it
/// into the [`ToolContext`] for the duration of one call; because the bound
/// context only lives for that call frame, restoration on every exit path
/// is structural.
pub trait ProcessScope: Send + Sync {
    /// The owning process's ID.
    fn process_id(&self) -> &ProcessId;

    /// A snapshot of the process blackboard as `(binding name, value)` pairs,
    /// in insertion order.
    fn bindings(&self) -> Vec<(String, serde_json::Value)>;
}

/// Runtime context provided to tools during execution.
#[derive(Clone)]
pub struct ToolContext {
    /// The agent process this call is bound to, if any.
    pub process: Option<Arc<dyn ProcessScope>>,
    /// Token for cooperative cancellation.
    pub cancellation_token: CancellationToken,
}

impl ToolContext {
    /// A context with no process binding and a fresh cancellation token.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            process: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// A copy of this context bound to the given process scope.
    #[must_use]
    pub fn bound_to(&self, scope: Arc<dyn ProcessScope>) -> Self {
        Self {
            process: Some(scope),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::detached()
    }
}

/// Object-safe trait for tool implementations.
///
/// Any tool source (local function, curried agent action, retrieval tool)
/// implements this trait. Tools are stored as `Arc<dyn ToolDyn>` and are
/// shared between the agent process and the tool loop for the duration of
/// a single LLM call.
pub trait ToolDyn: Send + Sync {
    /// Static description presented to the model.
    fn definition(&self) -> ToolDefinition;

    /// Behavioral metadata.
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::default()
    }

    /// Execute the tool with the given input.
    ///
    /// Control-flow signals are returned as
    /// [`ToolError::Signal`] and must be propagated unchanged by every
    /// wrapping layer.
    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>>;
}
