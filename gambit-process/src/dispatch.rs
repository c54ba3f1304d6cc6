//! Input resolution and action dispatch.

use gambit_blackboard::{Blackboard, TypedValue};
use gambit_events::{EventKind, ProcessEmitter};
use gambit_llm::{LlmCallContext, LlmOperations};
use gambit_plan::{Action, ActionContext, ActionOutput, ActionStep};
use gambit_tool::DecorationConfig;
use gambit_types::{Message, ProcessError, ProcessId, ProcessScope, ToolContext};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Read access to a process for tools executing inside it.
pub(crate) struct Scope {
    pub(crate) id: ProcessId,
    pub(crate) board: Arc<Mutex<Blackboard>>,
}

impl ProcessScope for Scope {
    fn process_id(&self) -> &ProcessId {
        &self.id
    }

    fn bindings(&self) -> Vec<(String, serde_json::Value)> {
        self.board
            .lock()
            .expect("blackboard poisoned")
            .entries()
            .iter()
            .map(|e| (e.name.clone(), e.value.value.clone()))
            .collect()
    }
}

/// Shared environment for dispatching actions within one process.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    pub(crate) board: Arc<Mutex<Blackboard>>,
    pub(crate) llm: Arc<LlmOperations>,
    pub(crate) emitter: ProcessEmitter,
    pub(crate) decoration: DecorationConfig,
    pub(crate) tool_ctx: ToolContext,
    pub(crate) last_message: Arc<Mutex<Option<Message>>>,
    pub(crate) actions_run: Arc<Mutex<Vec<String>>>,
}

impl Dispatcher {
    /// Resolve one action's inputs against the board.
    ///
    /// An input with an explicit binding name resolves that binding (type
    /// checked); an unnamed input resolves the first type-compatible value
    /// in insertion order.
    pub(crate) fn resolve_inputs(
        &self,
        action: &Action,
    ) -> Result<Vec<(String, TypedValue)>, ProcessError> {
        let board = self.board.lock().expect("blackboard poisoned");
        let mut resolved = Vec::with_capacity(action.inputs.len());
        for input in &action.inputs {
            let (name, value) = match &input.name {
                Some(name) => (
                    name.clone(),
                    board.get_typed(name, &input.type_name).cloned(),
                ),
                None => (
                    input.type_name.clone(),
                    board.first_value_of_type(&input.type_name).cloned(),
                ),
            };
            match value {
                Some(value) => resolved.push((name, value)),
                None => {
                    return Err(ProcessError::MissingInput {
                        action: action.name.clone(),
                        binding: name,
                        type_name: input.type_name.clone(),
                    });
                }
            }
        }
        Ok(resolved)
    }

    /// Run one action: resolve inputs, invoke the executor, write outputs.
    ///
    /// Emits `ActionStarted`/`ActionFinished`. Outputs are only written for
    /// [`ActionStep::Done`]; a control-flow transition aborts dispatch
    /// without writes.
    pub(crate) async fn dispatch(&self, action: &Action) -> Result<ActionStep, ProcessError> {
        let inputs = self.resolve_inputs(action)?;

        self.emitter.emit(EventKind::ActionStarted {
            action: action.name.clone(),
        });
        let started = Instant::now();

        let ctx = ActionContext {
            inputs,
            board: self.board.lock().expect("blackboard poisoned").snapshot(),
            llm: Arc::clone(&self.llm),
            llm_ctx: LlmCallContext {
                emitter: self.emitter.clone(),
                decoration: self.decoration.clone(),
                cancellation: self.tool_ctx.cancellation_token.clone(),
            },
            tool_ctx: self.tool_ctx.clone(),
            last_message: Arc::clone(&self.last_message),
        };

        let step = match action.executor().execute(&ctx).await {
            Ok(step) => step,
            Err(e) => {
                // A signal buried in an executor error is still a signal.
                if let Some(signal) = e.as_signal() {
                    ActionStep::from_signal(signal.clone())
                } else {
                    return Err(ProcessError::ActionFailed {
                        action: action.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        };

        if let ActionStep::Done(output) = &step {
            let mut board = self.board.lock().expect("blackboard poisoned");
            match output {
                ActionOutput::Single(value) => {
                    let name = action
                        .outputs
                        .first()
                        .map(|o| o.output_name().to_string())
                        .unwrap_or_else(|| gambit_blackboard::IT.to_string());
                    board.bind(name, value.clone());
                }
                ActionOutput::Bindings(bindings) => {
                    for (name, value) in bindings {
                        board.bind(name.clone(), value.clone());
                    }
                }
            }
            self.actions_run
                .lock()
                .expect("action tally poisoned")
                .push(action.name.clone());
        }

        self.emitter.emit(EventKind::ActionFinished {
            action: action.name.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        Ok(step)
    }
}
