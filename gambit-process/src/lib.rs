#![deny(missing_docs)]
//! # gambit-process — the agent process state machine
//!
//! An agent process owns a blackboard and repeatedly asks its planner what
//! to run next, dispatches the chosen action, writes outputs back, and
//! emits events — until a terminal status: `COMPLETED`, `FAILED`, `STUCK`,
//! `WAITING_FOR_INPUT`, or `CANCELLED`.
//!
//! One logical execution context per process: at most one action runs at a
//! time, and the blackboard is never touched by two actions of the same
//! process concurrently. Budgets (actions, tokens, wall clock) are checked
//! at every loop boundary, as is the cancellation token.

mod dispatch;
mod supervisor;

use dispatch::{Dispatcher, Scope};
use gambit_blackboard::{Blackboard, BoardSnapshot, TypedValue};
use gambit_events::{AgentEvent, EventBus, EventKind, ProcessEmitter};
use gambit_llm::{LlmOperations, role_label};
use gambit_loop::{LoopConfig, ToolLoop};
use gambit_plan::{
    Action, ActionStep, AgentDefinition, Goal, GoalDirectedPlanner, PlannerDecision, PlannerKind,
    action_tools, supervisor_messages,
};
use gambit_tool::{DecorationConfig, OperationScheduler, OutputTransformer, decorate_tool};
use gambit_types::{
    InteractionId, LlmInteraction, LlmOptions, LoopError, Message, PlanError, ProcessError,
    ProcessId, TokenUsage, ToolContext,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use supervisor::{LoopEventInspector, SupervisorRunner};
use tokio_util::sync::CancellationToken;

/// Where a process is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The planner→dispatcher loop is live.
    Running,
    /// The target goal's postcondition holds.
    Completed,
    /// A fatal error or budget breach ended the process.
    Failed,
    /// The planner found no path to the goal.
    Stuck,
    /// An action requires user input; call
    /// [`AgentProcess::resume`] to continue.
    WaitingForInput,
    /// The cancellation token fired.
    Cancelled,
}

/// Per-process limits and tuning.
#[derive(Clone)]
pub struct ProcessOptions {
    /// Target goal name. `None` targets the agent's first goal.
    pub goal: Option<String>,
    /// Maximum completed actions before the process fails.
    pub max_actions: Option<u32>,
    /// Maximum total LLM tokens before the process fails.
    pub max_tokens: Option<u64>,
    /// Maximum wall clock before the process fails.
    pub max_duration: Option<Duration>,
    /// Model selection for supervisor loops.
    pub supervisor_llm: LlmOptions,
    /// Tool loop bounds for supervisor loops.
    pub loop_config: LoopConfig,
    /// Admission scheduler applied to every decorated tool.
    pub scheduler: Option<Arc<dyn OperationScheduler>>,
    /// Output transformer applied to every decorated tool.
    pub transformer: Option<Arc<dyn OutputTransformer>>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            goal: None,
            max_actions: None,
            max_tokens: None,
            max_duration: None,
            supervisor_llm: LlmOptions::best(),
            loop_config: LoopConfig::default(),
            scheduler: None,
            transformer: None,
        }
    }
}

/// What a finished (or suspended) process exposes.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    /// The process's ID.
    pub process_id: ProcessId,
    /// Terminal (or suspended) status.
    pub status: ProcessStatus,
    /// Terminal reason, set for `Failed`, `Stuck`, and `Cancelled`.
    pub reason: Option<String>,
    /// Final blackboard snapshot.
    pub board: BoardSnapshot,
    /// Full event history, in logical-clock order.
    pub events: Vec<AgentEvent>,
    /// The last assistant message observed, if any.
    pub last_message: Option<Message>,
    /// Names of completed actions, in execution order.
    pub actions_run: Vec<String>,
    /// Cumulative LLM token spend.
    pub usage: TokenUsage,
}

/// Bounds repeated replans so a pathological agent terminates.
const MAX_REPLANS: u32 = 64;
/// Bounds supervisor rounds for the same reason.
const MAX_SUPERVISOR_ROUNDS: u32 = 16;

static NEXT_PROCESS: AtomicU64 = AtomicU64::new(1);

/// The runtime state machine executing one agent.
pub struct AgentProcess {
    id: ProcessId,
    agent: AgentDefinition,
    options: ProcessOptions,
    board: Arc<Mutex<Blackboard>>,
    status: ProcessStatus,
    reason: Option<String>,
    llm: Arc<LlmOperations>,
    emitter: ProcessEmitter,
    cancellation: CancellationToken,
    started: Instant,
    planner: GoalDirectedPlanner,
    disabled: HashSet<String>,
    last_message: Arc<Mutex<Option<Message>>>,
    actions_run: Arc<Mutex<Vec<String>>>,
    interactions: AtomicU64,
}

impl AgentProcess {
    /// Construct a process over `agent`, seeding the blackboard from
    /// `bindings`. The process starts `Running` and emits `ProcessCreated`.
    #[must_use]
    pub fn new(
        agent: AgentDefinition,
        bindings: Vec<(String, TypedValue)>,
        llm: Arc<LlmOperations>,
        bus: EventBus,
        options: ProcessOptions,
    ) -> Self {
        let id = ProcessId::new(format!(
            "process-{}",
            NEXT_PROCESS.fetch_add(1, Ordering::SeqCst)
        ));
        let mut board = Blackboard::new();
        for (name, value) in bindings {
            board.bind(name, value);
        }
        let emitter = ProcessEmitter::new(bus, id.clone());
        emitter.emit(EventKind::ProcessCreated {
            agent: agent.name.clone(),
        });
        Self {
            id,
            agent,
            options,
            board: Arc::new(Mutex::new(board)),
            status: ProcessStatus::Running,
            reason: None,
            llm,
            emitter,
            cancellation: CancellationToken::new(),
            started: Instant::now(),
            planner: GoalDirectedPlanner::default(),
            disabled: HashSet::new(),
            last_message: Arc::new(Mutex::new(None)),
            actions_run: Arc::new(Mutex::new(Vec::new())),
            interactions: AtomicU64::new(0),
        }
    }

    /// The process's ID.
    #[must_use]
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// A clone of the cancellation token; cancel it to stop the process at
    /// the next loop boundary.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Supply input and return a waiting process to `Running`.
    ///
    /// # Errors
    ///
    /// [`ProcessError::InvalidState`] unless the process is
    /// `WaitingForInput`.
    pub fn resume(&mut self, bindings: Vec<(String, TypedValue)>) -> Result<(), ProcessError> {
        if self.status != ProcessStatus::WaitingForInput {
            return Err(ProcessError::InvalidState(format!(
                "resume requires WaitingForInput, process is {:?}",
                self.status
            )));
        }
        let mut board = self.board.lock().expect("blackboard poisoned");
        for (name, value) in bindings {
            board.bind(name, value);
        }
        drop(board);
        self.status = ProcessStatus::Running;
        Ok(())
    }

    /// Drive the process until it leaves `Running`, then report.
    ///
    /// Call again after [`resume`](Self::resume) when the report says
    /// `WaitingForInput`.
    pub async fn run(&mut self) -> ProcessReport {
        if self.status == ProcessStatus::Running {
            match self.agent.planner {
                PlannerKind::GoalDirected => self.run_goal_directed().await,
                PlannerKind::Supervisor => self.run_supervisor().await,
            }
        }
        self.report()
    }

    /// The current report, regardless of status.
    #[must_use]
    pub fn report(&self) -> ProcessReport {
        ProcessReport {
            process_id: self.id.clone(),
            status: self.status,
            reason: self.reason.clone(),
            board: self.board.lock().expect("blackboard poisoned").snapshot(),
            events: self.emitter.history(),
            last_message: self
                .last_message
                .lock()
                .expect("last message slot poisoned")
                .clone(),
            actions_run: self.actions_run.lock().expect("action tally poisoned").clone(),
            usage: self.emitter.spend(),
        }
    }

    // --- internals -------------------------------------------------------

    fn scope(&self) -> Arc<Scope> {
        Arc::new(Scope {
            id: self.id.clone(),
            board: Arc::clone(&self.board),
        })
    }

    fn tool_ctx(&self) -> ToolContext {
        ToolContext {
            process: Some(self.scope()),
            cancellation_token: self.cancellation.clone(),
        }
    }

    fn decoration(&self) -> DecorationConfig {
        DecorationConfig {
            group: None,
            emitter: Some(self.emitter.clone()),
            scheduler: self.options.scheduler.clone(),
            transformer: self.options.transformer.clone(),
            process: Some(self.scope()),
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            board: Arc::clone(&self.board),
            llm: Arc::clone(&self.llm),
            emitter: self.emitter.clone(),
            decoration: self.decoration(),
            tool_ctx: self.tool_ctx(),
            last_message: Arc::clone(&self.last_message),
            actions_run: Arc::clone(&self.actions_run),
        }
    }

    fn next_interaction(&self) -> InteractionId {
        InteractionId::new(format!(
            "{}/i-{}",
            self.id,
            self.interactions.fetch_add(1, Ordering::SeqCst)
        ))
    }

    fn target_goal(&self) -> Result<Goal, String> {
        match &self.options.goal {
            Some(name) => self
                .agent
                .goal(name)
                .cloned()
                .map_err(|e| e.to_string()),
            None => self
                .agent
                .default_goal()
                .cloned()
                .ok_or_else(|| format!("agent {} declares no goals", self.agent.name)),
        }
    }

    fn budget_breach(&self) -> Option<String> {
        if let Some(max) = self.options.max_actions {
            let run = self.actions_run.lock().expect("action tally poisoned").len() as u32;
            if run >= max {
                return Some(format!("action budget exhausted ({max})"));
            }
        }
        if let Some(max) = self.options.max_tokens {
            let spent = self.emitter.spend().total();
            if spent >= max {
                return Some(format!("token budget exhausted ({spent} >= {max})"));
            }
        }
        if let Some(max) = self.options.max_duration {
            if self.started.elapsed() >= max {
                return Some(format!("wall clock budget exhausted ({max:?})"));
            }
        }
        None
    }

    fn fail(&mut self, reason: String) {
        self.emitter.emit(EventKind::ProcessFailed {
            reason: reason.clone(),
        });
        self.status = ProcessStatus::Failed;
        self.reason = Some(reason);
    }

    fn complete(&mut self, goal: &Goal) {
        self.emitter.emit(EventKind::GoalAchieved {
            goal: goal.name.clone(),
        });
        self.emitter.emit(EventKind::ProcessCompleted);
        self.status = ProcessStatus::Completed;
    }

    fn stick(&mut self, reason: String) {
        tracing::warn!(process = %self.id, reason = %reason, "process stuck");
        self.status = ProcessStatus::Stuck;
        self.reason = Some(reason);
    }

    fn cancelled(&mut self) {
        self.status = ProcessStatus::Cancelled;
        self.reason = Some("cancelled".into());
    }

    fn wait_for_input(&mut self, prompt: String) {
        self.emitter.emit(EventKind::ProcessWaiting {
            prompt: prompt.clone(),
        });
        self.status = ProcessStatus::WaitingForInput;
    }

    fn goal_satisfied(&self, goal: &Goal) -> bool {
        goal.satisfied_by(&self.board.lock().expect("blackboard poisoned"))
    }

    async fn run_goal_directed(&mut self) {
        let goal = match self.target_goal() {
            Ok(goal) => goal,
            Err(reason) => return self.fail(reason),
        };
        let mut replans: u32 = 0;

        loop {
            if self.cancellation.is_cancelled() {
                return self.cancelled();
            }
            if let Some(reason) = self.budget_breach() {
                return self.fail(reason);
            }

            let actions: Vec<Arc<Action>> = self
                .agent
                .actions
                .iter()
                .filter(|a| !self.disabled.contains(&a.name))
                .cloned()
                .collect();
            let decision = {
                let board = self.board.lock().expect("blackboard poisoned");
                self.planner
                    .next_step(&board, &actions, &self.agent.goals, &goal)
            };

            let action = match decision {
                Ok(PlannerDecision::GoalSatisfied) => return self.complete(&goal),
                Ok(PlannerDecision::RunAction(action)) => action,
                Err(PlanError::NoPlanFound(_)) => {
                    return self.stick(format!("no plan found for goal {}", goal.name));
                }
                Err(e) => return self.fail(e.to_string()),
            };

            match self.dispatcher().dispatch(&action).await {
                Ok(ActionStep::Done(_)) => {}
                Ok(ActionStep::Replan { reason }) => {
                    self.emitter.emit(EventKind::ReplanRequested {
                        reason: reason.clone(),
                    });
                    replans += 1;
                    if replans > MAX_REPLANS {
                        return self.fail(format!("replan limit exceeded ({MAX_REPLANS})"));
                    }
                }
                Ok(ActionStep::AwaitUserInput { prompt }) => {
                    return self.wait_for_input(prompt);
                }
                Err(ProcessError::MissingInput { action: name, .. }) => {
                    tracing::warn!(
                        process = %self.id,
                        action = %name,
                        "missing input; disabling action and replanning"
                    );
                    self.disabled.insert(name);
                }
                Err(e) => return self.fail(e.to_string()),
            }
        }
    }

    async fn run_supervisor(&mut self) {
        let goal = match self.target_goal() {
            Ok(goal) => goal,
            Err(reason) => return self.fail(reason),
        };
        let Some(goal_action) = self.agent.goal_action(&goal.name).cloned() else {
            return self.fail(format!("no goal action declared for goal {}", goal.name));
        };
        let mut rounds: u32 = 0;

        loop {
            if self.cancellation.is_cancelled() {
                return self.cancelled();
            }
            if let Some(reason) = self.budget_breach() {
                return self.fail(reason);
            }
            if self.goal_satisfied(&goal) {
                return self.complete(&goal);
            }
            rounds += 1;
            if rounds > MAX_SUPERVISOR_ROUNDS {
                return self.stick(format!(
                    "supervisor made no progress after {MAX_SUPERVISOR_ROUNDS} rounds"
                ));
            }

            // Curry the action tools against the current board state.
            let runner = Arc::new(SupervisorRunner {
                dispatcher: self.dispatcher(),
                agent: self.agent.clone(),
            });
            let decoration = self.decoration();
            let tools = {
                let board = self.board.lock().expect("blackboard poisoned");
                action_tools(&self.agent, &board, runner)
            };
            let tools = tools
                .into_iter()
                .map(|t| decorate_tool(t, &decoration))
                .collect();

            let interaction = LlmInteraction::new(
                self.next_interaction(),
                self.options.supervisor_llm.clone(),
            )
            .without_validation();
            let sender = match self.llm.sender_for(&interaction) {
                Ok(sender) => sender,
                Err(e) => return self.fail(e.to_string()),
            };
            let inspector = Arc::new(LoopEventInspector::new(
                self.emitter.clone(),
                interaction.id.clone(),
                role_label(&interaction.options.role).to_string(),
            ));

            let tool_loop = ToolLoop::new(sender, tools, self.options.loop_config.clone())
                .inspect(inspector);
            let outcome = tool_loop
                .run(supervisor_messages(&self.agent, &goal), &self.tool_ctx())
                .await;

            match outcome {
                Ok(outcome) => {
                    *self
                        .last_message
                        .lock()
                        .expect("last message slot poisoned") = Some(outcome.final_message.clone());

                    let ready = {
                        let board = self.board.lock().expect("blackboard poisoned");
                        goal_action.ready(&board)
                    };
                    if !ready {
                        return self.stick(format!(
                            "supervisor finished but goal action {} is not ready",
                            goal_action.name
                        ));
                    }
                    match self.dispatcher().dispatch(&goal_action).await {
                        Ok(ActionStep::Done(_)) => {
                            // Satisfaction is re-checked at the top of the loop.
                        }
                        Ok(ActionStep::Replan { reason }) => {
                            self.emitter.emit(EventKind::ReplanRequested { reason });
                        }
                        Ok(ActionStep::AwaitUserInput { prompt }) => {
                            return self.wait_for_input(prompt);
                        }
                        Err(e) => return self.fail(e.to_string()),
                    }
                }
                Err(LoopError::Signal(gambit_types::ControlSignal::Replan { reason })) => {
                    self.emitter.emit(EventKind::ReplanRequested { reason });
                }
                Err(LoopError::Signal(gambit_types::ControlSignal::UserInput { prompt })) => {
                    return self.wait_for_input(prompt);
                }
                Err(LoopError::IterationLimit(limit)) => {
                    return self.fail(format!("tool loop limit reached ({limit} iterations)"));
                }
                Err(LoopError::Cancelled) => return self.cancelled(),
                Err(e) => return self.fail(e.to_string()),
            }
        }
    }
}
