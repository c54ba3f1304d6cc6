#![deny(missing_docs)]
//! # gambit-types — core types for the gambit agent platform
//!
//! The internal lingua franca shared by every gambit crate: conversation
//! messages, tool definitions and results, LLM interaction records, token
//! usage, typed IDs, control-flow signals, and the error taxonomy.
//!
//! Nothing here executes — these are the values that cross the boundaries
//! between the blackboard, the planner, the tool loop, and the LLM layer.
//!
//! ## Dependency Notes
//!
//! Tool inputs, blackboard payloads, and structured-output candidates are
//! `serde_json::Value`. JSON is the universal interchange format for agentic
//! systems; a generic `T: Serialize` would complicate trait-object safety
//! without practical benefit.

pub mod error;
pub mod id;
pub mod llm;
pub mod message;
pub mod signal;
pub mod tool;
pub mod usage;

// Re-exports for convenience
pub use error::{
    ActionError, BoardError, LlmError, LoopError, PlanError, ProcessError, SeekError, ToolError,
};
pub use id::{InteractionId, ProcessId, ToolCallId};
pub use llm::{LlmInteraction, LlmOptions, ModelRole};
pub use message::{ContentBlock, Message, Role};
pub use signal::ControlSignal;
pub use tool::{
    BoxFuture, ProcessScope, ToolCall, ToolContext, ToolDefinition, ToolDyn, ToolMetadata,
    ToolResult,
};
pub use usage::TokenUsage;
