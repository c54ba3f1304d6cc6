//! Error taxonomy for all gambit crates.
//!
//! Control-flow signals ride inside [`ToolError::Signal`] and
//! [`LoopError::Signal`] — they are not failures, but they travel the same
//! propagation paths, so they live in the error enums where no layer can
//! drop them without matching explicitly.

use crate::signal::ControlSignal;
use std::time::Duration;
use thiserror::Error;

/// Errors from the LLM operations layer.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmError {
    /// A single attempt exceeded its timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure (network, provider 5xx).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be parsed into the requested shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// A structured-output candidate violated its declared constraints
    /// even after the single violations retry.
    #[error("invalid structured output: {}", violations.join("; "))]
    InvalidStructuredOutput {
        /// The remaining constraint violations.
        violations: Vec<String>,
        /// The final offending candidate.
        candidate: serde_json::Value,
    },

    /// No model satisfies the interaction's selection criteria.
    #[error("no suitable model: {0}")]
    NoSuitableModel(String),

    /// The call was interrupted by cancellation.
    #[error("interrupted")]
    Interrupted,

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl LlmError {
    /// Whether retrying this call might succeed.
    ///
    /// Timeouts, transport failures, and parse failures are transient;
    /// everything else surfaces unwrapped.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout(_) | LlmError::Transport(_) | LlmError::Parse(_)
        )
    }
}

/// Errors from tool operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The input provided to the tool was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A control-flow signal — not a failure. Must be re-raised unchanged
    /// by every decorator and by the tool loop.
    #[error("{0}")]
    Signal(ControlSignal),

    /// The call was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ToolError {
    /// Whether this error is a control-flow signal rather than a failure.
    #[must_use]
    pub fn is_signal(&self) -> bool {
        matches!(self, ToolError::Signal(_))
    }
}

/// Errors from the tool loop.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LoopError {
    /// The loop reached its iteration limit without a terminal answer.
    #[error("tool loop limit reached ({0} iterations)")]
    IterationLimit(usize),

    /// An LLM call inside the loop failed.
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// A control-flow signal propagated out of a tool call.
    #[error("{0}")]
    Signal(ControlSignal),

    /// The loop was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// Errors from an action executor.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ActionError {
    /// An LLM call made by the executor failed.
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// A tool loop run by the executor failed.
    ///
    /// `LoopError::Signal` inside this variant is still a control-flow
    /// signal; the dispatcher unwraps it into a state transition rather
    /// than a failure.
    #[error("loop error: {0}")]
    Loop(#[from] LoopError),

    /// A blackboard operation failed.
    #[error("board error: {0}")]
    Board(#[from] BoardError),

    /// Domain-level failure.
    #[error("{0}")]
    Failed(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ActionError {
    /// The control-flow signal buried in this error, if any.
    #[must_use]
    pub fn as_signal(&self) -> Option<&ControlSignal> {
        match self {
            ActionError::Loop(LoopError::Signal(signal)) => Some(signal),
            _ => None,
        }
    }
}

/// Errors from blackboard operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BoardError {
    /// A value could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A binding exists but its type does not conform to the requested one.
    #[error("type mismatch for '{name}': have {actual}, want {requested}")]
    TypeMismatch {
        /// The binding name.
        name: String,
        /// The captured type name.
        actual: String,
        /// The requested type name.
        requested: String,
    },
}

/// Errors from the planner.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PlanError {
    /// No sequence of actions reaches the goal from the current state.
    #[error("no plan found for goal: {0}")]
    NoPlanFound(String),

    /// The agent declares no goal with the given name.
    #[error("unknown goal: {0}")]
    UnknownGoal(String),
}

/// Errors from the agent process and its dispatcher.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A required action input could not be resolved from the blackboard.
    #[error("missing input '{binding}' ({type_name}) for action {action}")]
    MissingInput {
        /// The action whose input is missing.
        action: String,
        /// The unresolved binding name.
        binding: String,
        /// The required type name.
        type_name: String,
    },

    /// An action's executor failed.
    #[error("action {action} failed: {message}")]
    ActionFailed {
        /// The failing action.
        action: String,
        /// The failure description.
        message: String,
    },

    /// A budget limit was breached.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// The process was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The operation is not valid in the process's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An LLM error surfaced with action-level granularity.
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// A planning error surfaced to the process.
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    /// A blackboard error surfaced to the process.
    #[error("board error: {0}")]
    Board(#[from] BoardError),
}

/// Errors from the autonomy layer.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SeekError {
    /// No goal scored above the confidence cutoff.
    #[error("no goal ranked above cutoff {cutoff}; best was {best}")]
    NoGoalAboveCutoff {
        /// The configured cutoff.
        cutoff: f64,
        /// The best confidence observed.
        best: f64,
    },

    /// The approver rejected the chosen goal.
    #[error("goal rejected: {0}")]
    GoalRejected(String),

    /// Ranking failed.
    #[error("ranking failed: {0}")]
    RankingFailed(String),

    /// The constructed process failed.
    #[error("process error: {0}")]
    Process(#[from] ProcessError),
}
