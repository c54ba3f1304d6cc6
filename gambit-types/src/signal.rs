//! Control-flow signals — exceptional returns that are not failures.
//!
//! A bounded set of signals any tool or action may raise. They are never
//! suppressed, never converted to text, and never treated as errors: they
//! bubble through the decorator chain and the tool loop to the agent
//! process, which interprets them as state-machine transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A designated control-flow signal.
///
/// Represented as an explicit value (not a thrown error) so it cannot be
/// accidentally swallowed by error-handling layers. The exception-suppressing
/// tool decorator and the tool loop both match on
/// [`ToolError::Signal`](crate::error::ToolError::Signal) and re-raise it
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum ControlSignal {
    /// The current plan is stale — re-enter the planner.
    Replan {
        /// Why a replan was requested.
        reason: String,
    },
    /// Execution cannot continue without user input.
    UserInput {
        /// What to ask the user.
        prompt: String,
    },
}

impl ControlSignal {
    /// Create a replan signal.
    pub fn replan(reason: impl Into<String>) -> Self {
        ControlSignal::Replan {
            reason: reason.into(),
        }
    }

    /// Create a user-input signal.
    pub fn user_input(prompt: impl Into<String>) -> Self {
        ControlSignal::UserInput {
            prompt: prompt.into(),
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSignal::Replan { reason } => write!(f, "replan requested: {reason}"),
            ControlSignal::UserInput { prompt } => write!(f, "user input required: {prompt}"),
        }
    }
}
