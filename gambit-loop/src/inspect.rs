//! Loop inspectors — observation points without influence.

use gambit_llm::SenderReply;
use gambit_types::{Message, ToolCall};

/// Observes the tool loop at its defined points.
///
/// Inspectors are notified in registration order and their results are
/// ignored; they cannot influence the loop. Handlers SHOULD complete
/// quickly — they run on the loop's execution context.
pub trait LoopInspector: Send + Sync {
    /// Before each LLM call, with the (already transformed) history.
    fn before_llm_call(&self, _messages: &[Message]) {}

    /// After each LLM call, with the raw reply including all candidate
    /// generations and usage.
    fn after_llm_call(&self, _reply: &SenderReply) {}

    /// After each tool result has been transformed, before it enters the
    /// history.
    fn after_tool_result(&self, _call: &ToolCall, _result_text: &str) {}

    /// After each iteration, with the iteration's tool calls. An empty list
    /// means the early exit: the model produced a terminal answer.
    fn after_iteration(&self, _iteration: usize, _tool_calls: &[ToolCall]) {}
}
