#![deny(missing_docs)]
//! # gambit-llm — structured-output LLM operations
//!
//! Executes single LLM calls on behalf of actions: assembles prompts,
//! applies a per-attempt timeout, retries transient and parse failures with
//! exponential backoff, validates structured output against the output
//! type's JSON Schema (with exactly one violations-report retry), folds
//! multi-candidate generations, and emits request/response events.
//!
//! The wire protocol is someone else's problem: a [`MessageSender`] is the
//! single-shot seam ("send these messages and tools, give me the assistant
//! message and usage"), and a [`ModelProvider`] resolves senders by role or
//! name.

pub mod ops;
pub mod retry;
pub mod sender;
pub mod validation;

pub use ops::{LlmCallContext, LlmOperations, NoToolGroups, StructuredOutcome, ToolGroupResolver};
pub use retry::RetryPolicy;
pub use sender::{
    MessageSender, ModelProvider, ModelRegistry, SenderReply, fold_candidates, role_label,
};
pub use validation::{SchemaValidator, ValidationPromptGenerator, extract_json, output_schema};
