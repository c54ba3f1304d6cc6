//! Driving the supervisor planner: the super-action's runner and the
//! loop-event inspector.

use crate::dispatch::Dispatcher;
use async_trait::async_trait;
use gambit_blackboard::TypedValue;
use gambit_events::{EventKind, ProcessEmitter};
use gambit_llm::SenderReply;
use gambit_loop::LoopInspector;
use gambit_plan::{ActionRunner, ActionStep, AgentDefinition, parameter_name};
use gambit_types::{InteractionId, Message, ToolError};
use std::sync::Mutex;
use std::time::Instant;

/// Executes actions on behalf of the supervising model.
///
/// Model-provided arguments are bound to the blackboard first (typed by the
/// action's input declaration), then the action dispatches exactly like a
/// planner-chosen one — same events, same output writes.
pub(crate) struct SupervisorRunner {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) agent: AgentDefinition,
}

#[async_trait]
impl ActionRunner for SupervisorRunner {
    async fn run_action(
        &self,
        action: &str,
        provided: serde_json::Value,
    ) -> Result<String, ToolError> {
        let action = self
            .agent
            .worker_actions()
            .into_iter()
            .find(|a| a.name == action)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(action.to_string()))?;

        // Bind model-provided arguments for inputs the board cannot satisfy.
        {
            let mut board = self
                .dispatcher
                .board
                .lock()
                .expect("blackboard poisoned");
            for input in &action.inputs {
                if board.has_value_of_type(&input.type_name) {
                    continue;
                }
                let param = parameter_name(input.name.as_deref(), &input.type_name);
                if let Some(value) = provided.get(&param) {
                    board.bind(
                        param.clone(),
                        TypedValue::raw(input.type_name.clone(), value.clone()),
                    );
                }
            }
        }

        match self.dispatcher.dispatch(&action).await {
            Ok(ActionStep::Done(_)) => {
                let produced: Vec<&str> = action
                    .outputs
                    .iter()
                    .map(|o| o.type_name.as_str())
                    .collect();
                Ok(if produced.is_empty() {
                    format!("{} completed", action.name)
                } else {
                    format!("{} produced {}", action.name, produced.join(", "))
                })
            }
            Ok(ActionStep::Replan { reason }) => Err(ToolError::Signal(
                gambit_types::ControlSignal::replan(reason),
            )),
            Ok(ActionStep::AwaitUserInput { prompt }) => Err(ToolError::Signal(
                gambit_types::ControlSignal::user_input(prompt),
            )),
            Err(e) => Err(ToolError::ExecutionFailed(e.to_string())),
        }
    }
}

/// Publishes the tool loop's LLM calls as interaction events, which also
/// feeds the process's token-spend tally.
pub(crate) struct LoopEventInspector {
    emitter: ProcessEmitter,
    interaction: InteractionId,
    model: String,
    started: Mutex<Option<Instant>>,
}

impl LoopEventInspector {
    pub(crate) fn new(emitter: ProcessEmitter, interaction: InteractionId, model: String) -> Self {
        Self {
            emitter,
            interaction,
            model,
            started: Mutex::new(None),
        }
    }
}

impl LoopInspector for LoopEventInspector {
    fn before_llm_call(&self, _messages: &[Message]) {
        *self.started.lock().expect("inspector clock poisoned") = Some(Instant::now());
        self.emitter.emit(EventKind::LlmRequest {
            interaction: self.interaction.clone(),
            model: self.model.clone(),
        });
    }

    fn after_llm_call(&self, reply: &SenderReply) {
        let elapsed_ms = self
            .started
            .lock()
            .expect("inspector clock poisoned")
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.emitter.emit(EventKind::LlmResponse {
            interaction: self.interaction.clone(),
            elapsed_ms,
            usage: reply.usage,
        });
    }
}
