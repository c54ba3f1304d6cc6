//! Agent definitions — the declarative surface the engine consumes.

use crate::action::Action;
use gambit_blackboard::Blackboard;
use gambit_types::PlanError;
use rust_decimal::Decimal;
use std::sync::Arc;

/// A named postcondition over the blackboard.
///
/// A goal is satisfied iff at least one binding of its declared output type
/// is present. The `value` ranks goals during planning and autonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    /// Stable goal name.
    pub name: String,
    /// What achieving this goal means, shown to rankers.
    pub description: String,
    /// Ranking value.
    pub value: Decimal,
    /// The type whose presence satisfies the goal.
    pub output_type: String,
}

impl Goal {
    /// A goal satisfied by the presence of `output_type`.
    pub fn new(name: impl Into<String>, output_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            value: Decimal::ONE,
            output_type: output_type.into(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the ranking value.
    #[must_use]
    pub fn with_value(mut self, value: Decimal) -> Self {
        self.value = value;
        self
    }

    /// Whether the board satisfies this goal.
    #[must_use]
    pub fn satisfied_by(&self, board: &Blackboard) -> bool {
        board.has_value_of_type(&self.output_type)
    }
}

/// Which planner drives an agent's processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlannerKind {
    /// Best-first search over typed action operators.
    #[default]
    GoalDirected,
    /// An LLM orchestrates curried action-tools inside a tool loop.
    Supervisor,
}

/// A declarative agent: named actions, goals, and a planner selection.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    /// The agent's name.
    pub name: String,
    /// Optional description.
    pub description: String,
    /// Declared actions, goal actions included.
    pub actions: Vec<Arc<Action>>,
    /// Declared goals.
    pub goals: Vec<Goal>,
    /// The planner driving this agent.
    pub planner: PlannerKind,
}

impl AgentDefinition {
    /// An empty agent with the default (goal-directed) planner.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            actions: Vec::new(),
            goals: Vec::new(),
            planner: PlannerKind::default(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    /// Add a goal.
    #[must_use]
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goals.push(goal);
        self
    }

    /// Select the planner.
    #[must_use]
    pub fn with_planner(mut self, planner: PlannerKind) -> Self {
        self.planner = planner;
        self
    }

    /// The goal with the given name.
    pub fn goal(&self, name: &str) -> Result<&Goal, PlanError> {
        self.goals
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| PlanError::UnknownGoal(name.to_string()))
    }

    /// The first declared goal, the default target for single-goal agents.
    #[must_use]
    pub fn default_goal(&self) -> Option<&Goal> {
        self.goals.first()
    }

    /// The goal action achieving `goal`, if declared.
    #[must_use]
    pub fn goal_action(&self, goal: &str) -> Option<&Arc<Action>> {
        self.actions
            .iter()
            .find(|a| a.achieves.as_deref() == Some(goal))
    }

    /// All non-goal actions.
    #[must_use]
    pub fn worker_actions(&self) -> Vec<&Arc<Action>> {
        self.actions.iter().filter(|a| !a.is_goal_action()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionStep, executor_fn};

    fn noop() -> Arc<dyn crate::action::ActionExecutor> {
        executor_fn(|_ctx| {
            Box::pin(async {
                Ok(ActionStep::Replan {
                    reason: "noop".into(),
                })
            })
        })
    }

    #[test]
    fn goal_lookup() {
        let agent = AgentDefinition::new("baker")
            .with_goal(Goal::new("serve", "test.Meal"))
            .with_action(Action::new("serve_meal", noop()).achieves("serve"))
            .with_action(Action::new("make_dough", noop()));

        assert!(agent.goal("serve").is_ok());
        assert!(matches!(
            agent.goal("missing"),
            Err(PlanError::UnknownGoal(_))
        ));
        assert_eq!(agent.goal_action("serve").unwrap().name, "serve_meal");
        assert_eq!(agent.worker_actions().len(), 1);
    }

    #[test]
    fn goal_satisfaction_is_type_presence() {
        let goal = Goal::new("serve", "test.Meal");
        let board = Blackboard::new();
        assert!(!goal.satisfied_by(&board));
    }
}
