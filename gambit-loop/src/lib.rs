#![deny(missing_docs)]
//! # gambit-loop — the bounded tool loop
//!
//! Drives an LLM through a sequence of (prompt → tool calls → tool results
//! → prompt …) iterations until the model produces a terminal answer, a
//! tool returns direct, a control-flow signal escapes, or the iteration
//! limit is hit.
//!
//! Transformers rewrite the message history at defined points (their
//! outputs piped in list order); inspectors observe without influencing
//! (notified in list order, results ignored).

pub mod config;
pub mod inspect;
pub mod transform;

pub use config::LoopConfig;
pub use inspect::LoopInspector;
pub use transform::{
    MessageTransformer, ResultTransformer, SlidingWindowTransformer, TruncatingResultTransformer,
};

use gambit_llm::{MessageSender, fold_candidates};
use gambit_types::{
    ControlSignal, LoopError, Message, TokenUsage, ToolCall, ToolContext, ToolDefinition, ToolDyn,
    ToolError, ToolResult,
};
use std::collections::HashMap;
use std::sync::Arc;

/// The result of a completed tool loop run.
#[derive(Debug)]
pub struct LoopOutcome {
    /// The terminal assistant message (or the direct tool result rendered
    /// as an assistant message).
    pub final_message: Message,
    /// The full conversation, including tool calls and results.
    pub messages: Vec<Message>,
    /// Cumulative token usage across all iterations.
    pub usage: TokenUsage,
    /// Number of LLM calls made.
    pub iterations: usize,
    /// Set when a `return_direct` tool terminated the loop.
    pub direct_result: Option<ToolResult>,
}

/// The bounded tool loop.
///
/// Owns its sender, tool set, transformers, and inspectors for the duration
/// of one run. Tools are expected to arrive already decorated.
pub struct ToolLoop {
    sender: Arc<dyn MessageSender>,
    tools: Vec<Arc<dyn ToolDyn>>,
    config: LoopConfig,
    before_llm: Vec<Arc<dyn MessageTransformer>>,
    after_iteration: Vec<Arc<dyn MessageTransformer>>,
    after_tool_result: Vec<Arc<dyn ResultTransformer>>,
    inspectors: Vec<Arc<dyn LoopInspector>>,
}

impl ToolLoop {
    /// A loop over `sender` and `tools` with the given config.
    #[must_use]
    pub fn new(sender: Arc<dyn MessageSender>, tools: Vec<Arc<dyn ToolDyn>>, config: LoopConfig) -> Self {
        Self {
            sender,
            tools,
            config,
            before_llm: Vec::new(),
            after_iteration: Vec::new(),
            after_tool_result: Vec::new(),
            inspectors: Vec::new(),
        }
    }

    /// Add a transformer run over the history before every LLM call.
    #[must_use]
    pub fn transform_before_llm_call(mut self, t: Arc<dyn MessageTransformer>) -> Self {
        self.before_llm.push(t);
        self
    }

    /// Add a transformer run over the history after every iteration.
    #[must_use]
    pub fn transform_after_iteration(mut self, t: Arc<dyn MessageTransformer>) -> Self {
        self.after_iteration.push(t);
        self
    }

    /// Add a transformer applied to each tool result string.
    #[must_use]
    pub fn transform_after_tool_result(mut self, t: Arc<dyn ResultTransformer>) -> Self {
        self.after_tool_result.push(t);
        self
    }

    /// Add an inspector.
    #[must_use]
    pub fn inspect(mut self, inspector: Arc<dyn LoopInspector>) -> Self {
        self.inspectors.push(inspector);
        self
    }

    /// Run the loop to completion.
    ///
    /// # Errors
    ///
    /// [`LoopError::IterationLimit`] when `max_iterations` LLM calls have
    /// been made without a terminal answer; [`LoopError::Signal`] when a
    /// control-flow signal escapes a tool; [`LoopError::Llm`] on sender
    /// failure; [`LoopError::Cancelled`] on cancellation.
    pub async fn run(
        &self,
        initial_messages: Vec<Message>,
        ctx: &ToolContext,
    ) -> Result<LoopOutcome, LoopError> {
        let tool_index: HashMap<String, Arc<dyn ToolDyn>> = self
            .tools
            .iter()
            .map(|t| (t.definition().name, Arc::clone(t)))
            .collect();
        let definitions: Vec<ToolDefinition> =
            self.tools.iter().map(|t| t.definition()).collect();

        let mut messages = initial_messages;
        let mut usage = TokenUsage::default();
        let mut iterations = 0usize;

        loop {
            if ctx.cancellation_token.is_cancelled() {
                return Err(LoopError::Cancelled);
            }
            if iterations >= self.config.max_iterations {
                return Err(LoopError::IterationLimit(self.config.max_iterations));
            }
            iterations += 1;

            // 1. Transform history, notify inspectors.
            for transformer in &self.before_llm {
                messages = transformer.transform(messages);
            }
            for inspector in &self.inspectors {
                inspector.before_llm_call(&messages);
            }

            // 2. Single-shot send — the sender never executes tools.
            let reply = self.sender.send(&messages, &definitions).await?;

            // 3. Inspect the raw reply, then fold candidates into one
            //    assistant message.
            for inspector in &self.inspectors {
                inspector.after_llm_call(&reply);
            }
            usage.accumulate(&reply.usage);
            if reply.candidates.len() > 1 {
                tracing::debug!(
                    candidates = reply.candidates.len(),
                    iteration = iterations,
                    "provider returned multiple generations; folding"
                );
            }
            let assistant = fold_candidates(&reply.candidates);

            // 4. Append to history.
            messages.push(assistant.clone());

            // 5. Zero tool calls — terminal answer. The early-exit
            //    notification still fires for observability.
            let calls = assistant.tool_calls();
            if calls.is_empty() {
                for inspector in &self.inspectors {
                    inspector.after_iteration(iterations, &[]);
                }
                return Ok(LoopOutcome {
                    final_message: assistant,
                    messages,
                    usage,
                    iterations,
                    direct_result: None,
                });
            }

            // 6. Execute each requested tool, in order.
            for call in &calls {
                let result = match tool_index.get(&call.name) {
                    Some(tool) => match tool.call(call.input.clone(), ctx).await {
                        Ok(result) => result,
                        Err(ToolError::Signal(signal)) => {
                            return Err(LoopError::Signal(signal));
                        }
                        Err(e) => ToolResult::error(e.to_string()),
                    },
                    None => {
                        tracing::warn!(tool = %call.name, "model requested unknown tool");
                        ToolResult::error(format!("unknown tool {}", call.name))
                    }
                };

                let mut result_text = result.content_str().to_string();
                for transformer in &self.after_tool_result {
                    result_text = transformer.transform(&call.name, result_text);
                }
                for inspector in &self.inspectors {
                    inspector.after_tool_result(call, &result_text);
                }

                messages.push(Message::tool_result(
                    call.id.clone(),
                    result_text,
                    result.is_error(),
                ));

                let return_direct = tool_index
                    .get(&call.name)
                    .map(|tool| tool.metadata().return_direct)
                    .unwrap_or(false);
                if return_direct {
                    // The tool's result is the terminal answer.
                    for inspector in &self.inspectors {
                        inspector.after_iteration(iterations, &calls);
                    }
                    let final_message = Message::assistant(result.content_str());
                    return Ok(LoopOutcome {
                        final_message,
                        messages,
                        usage,
                        iterations,
                        direct_result: Some(result),
                    });
                }
            }

            // 7. Post-iteration transform + notification.
            for transformer in &self.after_iteration {
                messages = transformer.transform(messages);
            }
            for inspector in &self.inspectors {
                inspector.after_iteration(iterations, &calls);
            }
        }
    }
}
