//! The supervisor planner's tool surface.
//!
//! A single super-action is synthesized from all non-goal actions: each one
//! becomes a *curried* tool — parameters whose types are already present on
//! the blackboard are removed from the schema, so the model only supplies
//! what the board cannot. The goal action is never exposed as a tool; the
//! process runs it separately once its inputs are satisfied.
//!
//! Tools are exposed under the raw action name, no agent prefix; action
//! names are unique within an agent, so no collision is possible.

use crate::action::Action;
use crate::agent::{AgentDefinition, Goal};
use async_trait::async_trait;
use gambit_blackboard::Blackboard;
use gambit_types::{
    BoxFuture, Message, ToolContext, ToolDefinition, ToolDyn, ToolError, ToolResult,
};
use std::sync::Arc;

/// Executes a named action against the live process blackboard on behalf
/// of a supervising model. Implemented by the agent process.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// Run `action`, binding any model-`provided` arguments first; returns
    /// a short summary for the model.
    async fn run_action(
        &self,
        action: &str,
        provided: serde_json::Value,
    ) -> Result<String, ToolError>;
}

/// The curried input schema for `action` against the current board: only
/// inputs whose types are absent remain as parameters.
#[must_use]
pub fn curried_schema(action: &Action, board: &Blackboard) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for input in &action.inputs {
        if board.has_value_of_type(&input.type_name) {
            continue;
        }
        let param = parameter_name(input.name.as_deref(), &input.type_name);
        properties.insert(
            param.clone(),
            serde_json::json!({
                "type": "string",
                "description": format!("Value for the required {} input", input.type_name),
            }),
        );
        required.push(serde_json::Value::String(param));
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The parameter name for an input: its binding name, else the lower-cased
/// last segment of its type name.
#[must_use]
pub fn parameter_name(binding: Option<&str>, type_name: &str) -> String {
    match binding {
        Some(name) => name.to_string(),
        None => type_name
            .rsplit('.')
            .next()
            .unwrap_or(type_name)
            .to_lowercase(),
    }
}

/// A non-goal action exposed as a tool for the supervising model.
struct ActionTool {
    action: Arc<Action>,
    schema: serde_json::Value,
    ready: bool,
    runner: Arc<dyn ActionRunner>,
}

impl ToolDyn for ActionTool {
    fn definition(&self) -> ToolDefinition {
        let description = if self.action.description.is_empty() {
            format!("Run the {} action.", self.action.name)
        } else {
            self.action.description.clone()
        };
        ToolDefinition::new(self.action.name.clone(), description)
            .with_schema(self.schema.clone())
    }

    fn call<'a>(
        &'a self,
        input: serde_json::Value,
        _ctx: &'a ToolContext,
    ) -> BoxFuture<'a, Result<ToolResult, ToolError>> {
        Box::pin(async move {
            if !self.ready && input.as_object().is_none_or(|o| o.is_empty()) {
                let missing: Vec<&str> = self
                    .action
                    .inputs
                    .iter()
                    .map(|i| i.type_name.as_str())
                    .collect();
                return Ok(ToolResult::error(format!(
                    "action {} is not ready: missing inputs of type {}",
                    self.action.name,
                    missing.join(", ")
                )));
            }
            let summary = self.runner.run_action(&self.action.name, input).await?;
            Ok(ToolResult::text(summary))
        })
    }
}

/// Build the curried tool set for every non-goal action of `agent` against
/// the current board state.
#[must_use]
pub fn action_tools(
    agent: &AgentDefinition,
    board: &Blackboard,
    runner: Arc<dyn ActionRunner>,
) -> Vec<Arc<dyn ToolDyn>> {
    let mut workers = agent.worker_actions();
    workers.sort_by(|a, b| a.name.cmp(&b.name));
    workers
        .into_iter()
        .map(|action| {
            let tool: Arc<dyn ToolDyn> = Arc::new(ActionTool {
                schema: curried_schema(action, board),
                ready: action.ready(board),
                action: Arc::clone(action),
                runner: Arc::clone(&runner),
            });
            tool
        })
        .collect()
}

/// The instruction messages opening a supervisor loop.
#[must_use]
pub fn supervisor_messages(agent: &AgentDefinition, goal: &Goal) -> Vec<Message> {
    let mut messages = vec![Message::system(format!(
        "You orchestrate the agent '{}'. Call the available tools to move \
         the workspace toward the goal '{}'{}. Each tool runs one action and \
         reports what it produced. When no further tool calls are useful, \
         reply with a short status and no tool calls.",
        agent.name,
        goal.name,
        if goal.description.is_empty() {
            String::new()
        } else {
            format!(" ({})", goal.description)
        },
    ))];
    let bindings: Vec<String> = agent
        .goals
        .iter()
        .map(|g| format!("- {}: requires {}", g.name, g.output_type))
        .collect();
    messages.push(Message::user(format!(
        "Goals:\n{}\nBegin orchestrating.",
        bindings.join("\n")
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionStep, executor_fn};
    use gambit_blackboard::TypedValue;
    use serde_json::json;
    use std::sync::Mutex;

    fn noop() -> Arc<dyn crate::action::ActionExecutor> {
        executor_fn(|_ctx| {
            Box::pin(async {
                Ok(ActionStep::Replan {
                    reason: "noop".into(),
                })
            })
        })
    }

    struct RecordingRunner {
        calls: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl ActionRunner for RecordingRunner {
        async fn run_action(
            &self,
            action: &str,
            provided: serde_json::Value,
        ) -> Result<String, ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push((action.to_string(), provided));
            Ok(format!("{action} done"))
        }
    }

    fn frog_agent() -> AgentDefinition {
        AgentDefinition::new("frogger")
            .with_goal(Goal::new("prince", "Prince"))
            .with_action(
                Action::new("turn_into_frog", noop())
                    .with_input("UserInput")
                    .with_output("Frog"),
            )
            .with_action(
                Action::new("turn_into_prince", noop())
                    .with_input("Frog")
                    .with_output("Prince")
                    .achieves("prince"),
            )
    }

    #[test]
    fn goal_action_is_not_exposed() {
        let agent = frog_agent();
        let board = Blackboard::new();
        let runner = Arc::new(RecordingRunner {
            calls: Mutex::new(vec![]),
        });
        let tools = action_tools(&agent, &board, runner);
        let names: Vec<String> = tools.iter().map(|t| t.definition().name).collect();
        assert_eq!(names, vec!["turn_into_frog".to_string()]);
    }

    #[test]
    fn satisfied_parameters_are_curried_out() {
        let agent = frog_agent();
        let mut board = Blackboard::new();
        board.bind("it", TypedValue::raw("UserInput", json!({"content": "Kermit"})));

        let action = &agent.worker_actions()[0];
        let schema = curried_schema(action, &board);
        // UserInput is on the board, so the schema has no parameters.
        assert!(schema["properties"].as_object().unwrap().is_empty());
        assert!(schema["required"].as_array().unwrap().is_empty());
    }

    #[test]
    fn missing_parameters_stay_in_schema() {
        let agent = frog_agent();
        let board = Blackboard::new();
        let action = &agent.worker_actions()[0];
        let schema = curried_schema(action, &board);
        assert!(schema["properties"]["userinput"].is_object());
        assert_eq!(schema["required"][0], "userinput");
    }

    #[tokio::test]
    async fn ready_tool_delegates_to_runner() {
        let agent = frog_agent();
        let mut board = Blackboard::new();
        board.bind("it", TypedValue::raw("UserInput", json!({"content": "Kermit"})));
        let runner = Arc::new(RecordingRunner {
            calls: Mutex::new(vec![]),
        });
        let tools = action_tools(&agent, &board, runner.clone());

        let result = tools[0]
            .call(json!({}), &ToolContext::detached())
            .await
            .unwrap();
        assert_eq!(result.content_str(), "turn_into_frog done");
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unready_tool_reports_missing_inputs() {
        let agent = frog_agent();
        let board = Blackboard::new();
        let runner = Arc::new(RecordingRunner {
            calls: Mutex::new(vec![]),
        });
        let tools = action_tools(&agent, &board, runner.clone());

        let result = tools[0]
            .call(json!({}), &ToolContext::detached())
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.content_str().contains("UserInput"));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn supervisor_messages_name_the_goal() {
        let agent = frog_agent();
        let goal = agent.goal("prince").unwrap().clone();
        let messages = supervisor_messages(&agent, &goal);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].text().contains("prince"));
        assert!(messages[1].text().contains("Prince"));
    }
}
