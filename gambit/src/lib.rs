#![deny(missing_docs)]
//! # gambit — umbrella crate
//!
//! Provides a single import surface for the gambit agent platform.
//! Re-exports the member crates behind feature flags, plus a `prelude`
//! for the happy path.

#[cfg(feature = "autonomy")]
pub use gambit_autonomy;
#[cfg(feature = "core")]
pub use gambit_blackboard;
#[cfg(feature = "core")]
pub use gambit_events;
#[cfg(feature = "core")]
pub use gambit_llm;
#[cfg(feature = "core")]
pub use gambit_loop;
#[cfg(feature = "process")]
pub use gambit_plan;
#[cfg(feature = "process")]
pub use gambit_process;
#[cfg(feature = "core")]
pub use gambit_tool;
#[cfg(feature = "core")]
pub use gambit_types;

/// Happy-path imports for composing gambit agents.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use gambit_blackboard::{Blackboard, BoardSnapshot, IT, TypeNamed, TypedValue, UserInput};

    #[cfg(feature = "core")]
    pub use gambit_events::{AgentEvent, EventBus, EventKind, EventListener, ProcessEmitter};

    #[cfg(feature = "core")]
    pub use gambit_llm::{
        LlmCallContext, LlmOperations, MessageSender, ModelProvider, ModelRegistry, RetryPolicy,
        SenderReply, StructuredOutcome,
    };

    #[cfg(feature = "core")]
    pub use gambit_loop::{LoopConfig, LoopInspector, SlidingWindowTransformer, ToolLoop};

    #[cfg(feature = "core")]
    pub use gambit_tool::{
        DecorationConfig, OperationScheduler, ToolRegistry, decorate_tool,
    };

    #[cfg(feature = "core")]
    pub use gambit_types::{
        ControlSignal, LlmInteraction, LlmOptions, Message, ModelRole, ProcessId, TokenUsage,
        ToolContext, ToolDefinition, ToolDyn, ToolError, ToolResult,
    };

    #[cfg(feature = "process")]
    pub use gambit_plan::{
        Action, ActionContext, ActionExecutor, ActionStep, AgentDefinition, Goal,
        GoalDirectedPlanner, PlannerKind, executor_fn,
    };

    #[cfg(feature = "process")]
    pub use gambit_process::{AgentProcess, ProcessOptions, ProcessReport, ProcessStatus};

    #[cfg(feature = "autonomy")]
    pub use gambit_autonomy::{
        AutoApprove, GoalApprover, GoalRanker, GoalScore, GoalSeeker, SeekOptions,
    };
}
