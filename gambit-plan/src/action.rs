//! Actions — declared units of work with typed inputs and outputs.

use async_trait::async_trait;
use gambit_blackboard::{Blackboard, BoardSnapshot, IT, TypedValue};
use gambit_llm::{LlmCallContext, LlmOperations};
use gambit_types::{ActionError, BoxFuture, ControlSignal, Message, ToolContext};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};

/// One declared input or output of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct IoBinding {
    /// Explicit binding name. `None` means "resolve by type" for inputs and
    /// "bind under `it`" for outputs.
    pub name: Option<String>,
    /// The required (input) or produced (output) type name.
    pub type_name: String,
}

impl IoBinding {
    /// A binding resolved by type alone.
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            name: None,
            type_name: type_name.into(),
        }
    }

    /// A binding with an explicit name.
    pub fn named(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            type_name: type_name.into(),
        }
    }

    /// The binding name used when writing outputs.
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.name.as_deref().unwrap_or(IT)
    }
}

/// What an action hands back for the blackboard.
#[derive(Debug, Clone)]
pub enum ActionOutput {
    /// A single value, bound under the action's declared output name
    /// (default `it`).
    Single(TypedValue),
    /// Explicit `(name, value)` updates.
    Bindings(Vec<(String, TypedValue)>),
}

/// The executor's verdict: either outputs to bind, or a state-machine
/// transition. Control-flow signals are Ok-variants here so no error
/// handling layer can swallow them.
#[derive(Debug, Clone)]
pub enum ActionStep {
    /// The action completed; write these outputs.
    Done(ActionOutput),
    /// The plan is stale — re-enter the planner without writing outputs.
    Replan {
        /// Why a replan was requested.
        reason: String,
    },
    /// The process must wait for user input.
    AwaitUserInput {
        /// What to ask the user.
        prompt: String,
    },
}

impl ActionStep {
    /// The transition corresponding to a raised control-flow signal.
    #[must_use]
    pub fn from_signal(signal: ControlSignal) -> Self {
        match signal {
            ControlSignal::Replan { reason } => ActionStep::Replan { reason },
            ControlSignal::UserInput { prompt } => ActionStep::AwaitUserInput { prompt },
        }
    }

    /// Completed with a single output value.
    #[must_use]
    pub fn done(value: TypedValue) -> Self {
        ActionStep::Done(ActionOutput::Single(value))
    }
}

/// Everything an executor gets to work with.
pub struct ActionContext {
    /// Resolved inputs as `(binding name, value)`, in declaration order.
    pub inputs: Vec<(String, TypedValue)>,
    /// Snapshot of the blackboard at dispatch time.
    pub board: BoardSnapshot,
    /// The LLM operations layer.
    pub llm: Arc<LlmOperations>,
    /// Per-call LLM environment (events, decoration, cancellation).
    pub llm_ctx: LlmCallContext,
    /// Ambient context for tool invocations.
    pub tool_ctx: ToolContext,
    /// Slot for the most recent assistant message, surfaced in the final
    /// process report.
    pub last_message: Arc<Mutex<Option<Message>>>,
}

impl ActionContext {
    /// The resolved input bound under `name`.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&TypedValue> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// The first resolved input, deserialized. Convenient for single-input
    /// actions.
    pub fn first_input_as<T: DeserializeOwned>(&self) -> Result<T, ActionError> {
        let (_, value) = self
            .inputs
            .first()
            .ok_or_else(|| ActionError::Failed("action has no inputs".into()))?;
        value.deserialize().map_err(ActionError::Board)
    }

    /// Record the assistant message behind this action's result.
    pub fn record_last_message(&self, message: Message) {
        *self.last_message.lock().expect("last message slot poisoned") = Some(message);
    }
}

/// Executes one action.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run the action against the given context.
    async fn execute(&self, ctx: &ActionContext) -> Result<ActionStep, ActionError>;
}

/// Wrapper that implements [`ActionExecutor`] for a closure returning a
/// boxed future.
struct ExecutorFn<F> {
    f: F,
}

#[async_trait]
impl<F> ActionExecutor for ExecutorFn<F>
where
    F: for<'a> Fn(&'a ActionContext) -> BoxFuture<'a, Result<ActionStep, ActionError>>
        + Send
        + Sync,
{
    async fn execute(&self, ctx: &ActionContext) -> Result<ActionStep, ActionError> {
        (self.f)(ctx).await
    }
}

/// Create an executor from a closure.
///
/// The closure must return a `Box::pin(async move { ... })` future.
#[must_use]
pub fn executor_fn<F>(f: F) -> Arc<dyn ActionExecutor>
where
    F: for<'a> Fn(&'a ActionContext) -> BoxFuture<'a, Result<ActionStep, ActionError>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(ExecutorFn { f })
}

/// Predicate over the blackboard, evaluated before an action is scheduled.
pub type Precondition = Arc<dyn Fn(&Blackboard) -> bool + Send + Sync>;

/// A declared unit of work.
///
/// The implicit precondition is "every input type is present on the
/// blackboard"; an explicit [`Precondition`] narrows that further. The
/// effect is "every output type will be present".
#[derive(Clone)]
pub struct Action {
    /// Stable action name, unique within an agent.
    pub name: String,
    /// What the action does, shown to supervising models.
    pub description: String,
    /// Declared inputs.
    pub inputs: Vec<IoBinding>,
    /// Declared outputs.
    pub outputs: Vec<IoBinding>,
    /// Planning cost.
    pub cost: Decimal,
    /// Planning value credited when this action's goal is achieved.
    pub value: Decimal,
    /// The goal this action achieves, making it a goal action.
    pub achieves: Option<String>,
    precondition: Option<Precondition>,
    executor: Arc<dyn ActionExecutor>,
}

impl Action {
    /// An action with the given name and executor, no bindings, zero cost.
    pub fn new(name: impl Into<String>, executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            cost: Decimal::ZERO,
            value: Decimal::ZERO,
            achieves: None,
            precondition: None,
            executor,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an input resolved by type.
    #[must_use]
    pub fn with_input(mut self, type_name: impl Into<String>) -> Self {
        self.inputs.push(IoBinding::typed(type_name));
        self
    }

    /// Add an input resolved by explicit binding name.
    #[must_use]
    pub fn with_named_input(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.inputs.push(IoBinding::named(name, type_name));
        self
    }

    /// Add an output bound under `it`.
    #[must_use]
    pub fn with_output(mut self, type_name: impl Into<String>) -> Self {
        self.outputs.push(IoBinding::typed(type_name));
        self
    }

    /// Add an output bound under an explicit name.
    #[must_use]
    pub fn with_named_output(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.outputs.push(IoBinding::named(name, type_name));
        self
    }

    /// Set the planning cost.
    #[must_use]
    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = cost;
        self
    }

    /// Set the planning value.
    #[must_use]
    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }

    /// Mark this as the goal action for `goal`.
    #[must_use]
    pub fn achieves(mut self, goal: impl Into<String>) -> Self {
        self.achieves = Some(goal.into());
        self
    }

    /// Attach an explicit precondition.
    #[must_use]
    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Whether this is a goal action.
    #[must_use]
    pub fn is_goal_action(&self) -> bool {
        self.achieves.is_some()
    }

    /// Whether every declared input type is present on the board and the
    /// explicit precondition (if any) holds.
    #[must_use]
    pub fn ready(&self, board: &Blackboard) -> bool {
        self.inputs
            .iter()
            .all(|input| board.has_value_of_type(&input.type_name))
            && self.precondition_holds(board)
    }

    /// Whether the explicit precondition holds (vacuously true without one).
    #[must_use]
    pub fn precondition_holds(&self, board: &Blackboard) -> bool {
        self.precondition.as_ref().is_none_or(|p| p(board))
    }

    /// The executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn ActionExecutor> {
        &self.executor
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("cost", &self.cost)
            .field("value", &self.value)
            .field("achieves", &self.achieves)
            .finish()
    }
}
