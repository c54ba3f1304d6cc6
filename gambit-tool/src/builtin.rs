//! Stock tools for raising control-flow signals.
//!
//! Any tool may raise a signal; these two make it available to any model
//! without custom code. Both bypass suppression by construction — the
//! decorator chain re-raises signals untouched.

use gambit_types::{
    BoxFuture, ControlSignal, ToolContext, ToolDefinition, ToolDyn, ToolError, ToolResult,
};

/// A tool the model calls to suspend the process until the user answers.
pub struct WaitForUserInputTool;

impl ToolDyn for WaitForUserInputTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "wait_for_user_input",
            "Ask the user a question and pause until they answer. Use when \
             you cannot proceed without more information.",
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string", "description": "The question for the user"}
            },
            "required": ["prompt"]
        }))
    }

    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let prompt = input
                .get("prompt")
                .and_then(|p| p.as_str())
                .unwrap_or("input required")
                .to_string();
            Err(ToolError::Signal(ControlSignal::user_input(prompt)))
        })
    }
}

/// A tool the model calls to discard the current plan and replan.
pub struct RequestReplanTool;

impl ToolDyn for RequestReplanTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "request_replan",
            "Declare the current plan stale and ask the planner to run \
             again. Use when the workspace has changed in a way the plan \
             did not anticipate.",
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "reason": {"type": "string", "description": "Why the plan is stale"}
            },
            "required": ["reason"]
        }))
    }

    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            let reason = input
                .get("reason")
                .and_then(|r| r.as_str())
                .unwrap_or("unspecified")
                .to_string();
            Err(ToolError::Signal(ControlSignal::replan(reason)))
        })
    }
}
