//! Goal-directed best-first search over typed action operators.
//!
//! Each action is a state-space operator: its precondition is "these input
//! types exist on the board", its effect is "these output types will
//! exist". The search finds the least-cost path from the current board to
//! a state containing the target goal's output type and returns the first
//! step.
//!
//! Explicit action preconditions are predicates over the live blackboard
//! and cannot be simulated forward, so they gate only the first step —
//! which is exactly the soundness contract: a returned action's
//! precondition holds against the current board.

use crate::action::Action;
use crate::agent::Goal;
use gambit_blackboard::Blackboard;
use gambit_types::PlanError;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;

/// What the planner tells the process to do.
#[derive(Debug, Clone)]
pub enum PlannerDecision {
    /// The goal's postcondition already holds.
    GoalSatisfied,
    /// Run this action next.
    RunAction(Arc<Action>),
}

/// Best-first planner over type-presence states.
#[derive(Debug, Clone)]
pub struct GoalDirectedPlanner {
    /// Upper bound on node expansions; exceeding it is
    /// [`PlanError::NoPlanFound`]. Keeps dead ends, cyclic operator sets,
    /// and over-large search spaces terminating.
    pub max_expansions: usize,
}

impl Default for GoalDirectedPlanner {
    fn default() -> Self {
        Self {
            max_expansions: 10_000,
        }
    }
}

type State = BTreeSet<String>;

struct Node {
    cost: Decimal,
    value: Decimal,
    priority: Decimal,
    path: Vec<usize>,
    names_key: String,
    state: State,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    /// `BinaryHeap` is a max-heap; "greater" here means "expand sooner":
    /// lower priority, then lower cost, then higher value, then
    /// lexicographically smaller action names.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| other.names_key.cmp(&self.names_key))
    }
}

impl GoalDirectedPlanner {
    /// Compute the next action toward `target`, or report that the goal is
    /// satisfied.
    ///
    /// `goals` is the full goal universe: any goal achieved en route
    /// credits its value to the path priority.
    ///
    /// # Errors
    ///
    /// [`PlanError::NoPlanFound`] when no action sequence reaches the goal
    /// within the expansion bound.
    pub fn next_step(
        &self,
        board: &Blackboard,
        actions: &[Arc<Action>],
        goals: &[Goal],
        target: &Goal,
    ) -> Result<PlannerDecision, PlanError> {
        if target.satisfied_by(board) {
            return Ok(PlannerDecision::GoalSatisfied);
        }

        // Stable expansion order.
        let mut ordered: Vec<Arc<Action>> = actions.to_vec();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        let initial: State = board
            .objects()
            .flat_map(|v| v.conforms_to.iter().cloned())
            .collect();

        let mut heap: BinaryHeap<Node> = BinaryHeap::new();
        let mut best_seen: HashMap<State, Decimal> = HashMap::new();
        heap.push(Node {
            cost: Decimal::ZERO,
            value: Decimal::ZERO,
            priority: Decimal::ZERO,
            path: Vec::new(),
            names_key: String::new(),
            state: initial,
        });

        let mut expansions = 0usize;
        while let Some(node) = heap.pop() {
            if node.state.contains(&target.output_type) {
                let first = node.path.first().expect("non-empty path reaches new state");
                tracing::debug!(
                    goal = %target.name,
                    plan = %node.names_key,
                    cost = %node.cost,
                    "plan found"
                );
                return Ok(PlannerDecision::RunAction(Arc::clone(&ordered[*first])));
            }

            expansions += 1;
            if expansions > self.max_expansions {
                break;
            }

            for (idx, action) in ordered.iter().enumerate() {
                let applicable = action
                    .inputs
                    .iter()
                    .all(|input| node.state.contains(&input.type_name));
                if !applicable {
                    continue;
                }
                // First steps must also pass the live precondition.
                if node.path.is_empty() && !action.precondition_holds(board) {
                    continue;
                }
                // Skip operators that add nothing — they only make cycles.
                if action
                    .outputs
                    .iter()
                    .all(|output| node.state.contains(&output.type_name))
                {
                    continue;
                }

                let mut state = node.state.clone();
                for output in &action.outputs {
                    state.insert(output.type_name.clone());
                }
                let cost = node.cost + action.cost;
                let value: Decimal = goals
                    .iter()
                    .filter(|goal| state.contains(&goal.output_type))
                    .map(|goal| goal.value)
                    .sum();
                let priority = cost - value;

                match best_seen.get(&state) {
                    Some(best) if *best <= priority => continue,
                    _ => {
                        best_seen.insert(state.clone(), priority);
                    }
                }

                let mut path = node.path.clone();
                path.push(idx);
                let names_key = if node.names_key.is_empty() {
                    action.name.clone()
                } else {
                    format!("{} -> {}", node.names_key, action.name)
                };
                heap.push(Node {
                    cost,
                    value,
                    priority,
                    path,
                    names_key,
                    state,
                });
            }
        }

        Err(PlanError::NoPlanFound(target.name.clone()))
    }
}
