//! A listener that mirrors the event stream onto `tracing`.
//!
//! Observes, never controls. Users bring their own subscriber; event names
//! follow an `agent.*` naming scheme so downstream exporters can map them
//! without custom glue.

use crate::event::{AgentEvent, EventKind};
use crate::{EventError, EventListener};

/// Configuration for [`TracingEventListener`].
#[derive(Debug, Clone, Default)]
pub struct TracingListenerConfig {
    /// Whether to include tool input payloads in log fields. Disabled by
    /// default: inputs are high-cardinality and may carry user data.
    pub capture_tool_input: bool,
}

/// Emits one `tracing` event per published [`AgentEvent`].
pub struct TracingEventListener {
    config: TracingListenerConfig,
}

impl TracingEventListener {
    /// A listener with the given configuration.
    #[must_use]
    pub fn new(config: TracingListenerConfig) -> Self {
        Self { config }
    }
}

impl Default for TracingEventListener {
    fn default() -> Self {
        Self::new(TracingListenerConfig::default())
    }
}

impl EventListener for TracingEventListener {
    fn on_event(&self, event: &AgentEvent) -> Result<(), EventError> {
        let process = event.process_id.as_str();
        let seq = event.seq;
        match &event.kind {
            EventKind::ProcessCreated { agent } => {
                tracing::info!(process, seq, agent = %agent, "agent.process.created");
            }
            EventKind::ActionStarted { action } => {
                tracing::debug!(process, seq, action = %action, "agent.action.started");
            }
            EventKind::ActionFinished { action, elapsed_ms } => {
                tracing::debug!(
                    process,
                    seq,
                    action = %action,
                    elapsed_ms = *elapsed_ms,
                    "agent.action.finished"
                );
            }
            EventKind::GoalAchieved { goal } => {
                tracing::info!(process, seq, goal = %goal, "agent.goal.achieved");
            }
            EventKind::ReplanRequested { reason } => {
                tracing::info!(process, seq, reason = %reason, "agent.process.replan");
            }
            EventKind::ProcessWaiting { prompt } => {
                tracing::info!(process, seq, prompt = %prompt, "agent.process.waiting");
            }
            EventKind::ProcessCompleted => {
                tracing::info!(process, seq, "agent.process.completed");
            }
            EventKind::ProcessFailed { reason } => {
                tracing::warn!(process, seq, reason = %reason, "agent.process.failed");
            }
            EventKind::LlmRequest { interaction, model } => {
                tracing::debug!(
                    process,
                    seq,
                    interaction = %interaction,
                    model = %model,
                    "agent.llm.request"
                );
            }
            EventKind::LlmResponse {
                interaction,
                elapsed_ms,
                usage,
            } => {
                tracing::debug!(
                    process,
                    seq,
                    interaction = %interaction,
                    elapsed_ms = *elapsed_ms,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "agent.llm.response"
                );
            }
            EventKind::ToolCallRequest { tool, input } => {
                if self.config.capture_tool_input {
                    tracing::debug!(process, seq, tool = %tool, input = %input, "agent.tool.request");
                } else {
                    tracing::debug!(process, seq, tool = %tool, "agent.tool.request");
                }
            }
            EventKind::ToolCallResponse {
                tool,
                is_error,
                elapsed_ms,
                ..
            } => {
                tracing::debug!(
                    process,
                    seq,
                    tool = %tool,
                    is_error = *is_error,
                    elapsed_ms = *elapsed_ms,
                    "agent.tool.response"
                );
            }
        }
        Ok(())
    }
}
