//! Event payloads for process lifecycle and interaction events.

use gambit_types::{InteractionId, ProcessId, TokenUsage};
use serde::{Deserialize, Serialize};

/// One observable state transition within an agent process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// The process this event belongs to.
    pub process_id: ProcessId,
    /// Position on the process's logical clock. Monotone per process;
    /// meaningless across processes.
    pub seq: u64,
    /// What happened.
    pub kind: EventKind,
}

/// Event payloads. Process events describe the planner→action loop;
/// interaction events describe LLM requests and tool calls inside one
/// action.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    // --- Process events ---
    /// A process was constructed and entered `RUNNING`.
    ProcessCreated {
        /// The agent definition's name.
        agent: String,
    },
    /// The dispatcher started an action.
    ActionStarted {
        /// The action name.
        action: String,
    },
    /// An action finished and its outputs were written back.
    ActionFinished {
        /// The action name.
        action: String,
        /// Wall-clock duration of the action, in milliseconds.
        elapsed_ms: u64,
    },
    /// The target goal's postcondition became satisfied.
    GoalAchieved {
        /// The goal name.
        goal: String,
    },
    /// An action raised the replan signal; the planner will run again.
    ReplanRequested {
        /// Why a replan was requested.
        reason: String,
    },
    /// The process is waiting for user input.
    ProcessWaiting {
        /// What to ask the user.
        prompt: String,
    },
    /// The process reached `COMPLETED`.
    ProcessCompleted,
    /// The process reached `FAILED`.
    ProcessFailed {
        /// The terminal reason.
        reason: String,
    },

    // --- Interaction events ---
    /// An LLM call is about to be made.
    LlmRequest {
        /// The interaction this request belongs to.
        interaction: InteractionId,
        /// Human-readable model selection (role or name).
        model: String,
    },
    /// An LLM call returned.
    LlmResponse {
        /// The interaction this response belongs to.
        interaction: InteractionId,
        /// Running time of the call, in milliseconds.
        elapsed_ms: u64,
        /// Token usage for the call.
        usage: TokenUsage,
    },
    /// A tool is about to be invoked.
    ToolCallRequest {
        /// The tool name.
        tool: String,
        /// The input payload.
        input: serde_json::Value,
    },
    /// A tool invocation finished.
    ToolCallResponse {
        /// The tool name.
        tool: String,
        /// The string form of the result, or the error display.
        outcome: String,
        /// Whether the call ended in an error or signal.
        is_error: bool,
        /// Wall-clock duration of the call, in milliseconds.
        elapsed_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_tagging() {
        let event = AgentEvent {
            process_id: ProcessId::new("p-1"),
            seq: 3,
            kind: EventKind::GoalAchieved { goal: "meal".into() },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["event"], "goal_achieved");
        let back: AgentEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event, back);
    }
}
