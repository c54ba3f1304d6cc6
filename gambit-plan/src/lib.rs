#![deny(missing_docs)]
//! # gambit-plan — agent definitions and planners
//!
//! An agent declares actions (typed inputs/outputs, cost, executor) and
//! goals (postconditions with a value). A planner turns that declaration
//! plus the current blackboard into the next thing to run:
//!
//! - **Goal-directed search** treats actions as state-space operators over
//!   "these types exist on the board" and finds the least-cost path to the
//!   goal's output type with best-first search.
//! - **Supervisor** exposes non-goal actions as curried tools and lets the
//!   model orchestrate inside a tool loop; the goal action runs separately
//!   once its inputs are satisfied.

pub mod action;
pub mod agent;
pub mod search;
pub mod supervisor;

pub use action::{
    Action, ActionContext, ActionExecutor, ActionOutput, ActionStep, IoBinding, executor_fn,
};
pub use agent::{AgentDefinition, Goal, PlannerKind};
pub use search::{GoalDirectedPlanner, PlannerDecision};
pub use supervisor::{
    ActionRunner, action_tools, curried_schema, parameter_name, supervisor_messages,
};
