#![deny(missing_docs)]
//! # gambit-autonomy — choose a goal, then run it
//!
//! The outer loop: given free-form bindings and a universe of goals, rank
//! the goals against the input, pick the best one above a confidence
//! cutoff, get it approved, construct a single-goal agent containing only
//! the actions relevant to that goal, and run it to completion.
//!
//! The bindings need not include a `UserInput` — when none is present, a
//! synthetic textual rendering of the bindings feeds the ranker.

use async_trait::async_trait;
use gambit_blackboard::{TypeNamed, TypedValue, UserInput};
use gambit_events::EventBus;
use gambit_llm::LlmOperations;
use gambit_plan::{AgentDefinition, Goal};
use gambit_process::{AgentProcess, ProcessOptions, ProcessReport, ProcessStatus};
use gambit_types::SeekError;
use std::collections::HashSet;
use std::sync::Arc;

/// One goal's ranking against the input.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalScore {
    /// The goal name.
    pub goal: String,
    /// Confidence in `[0, 1]` that this goal matches the input.
    pub confidence: f64,
}

/// Scores candidate goals against a textual rendering of the input.
#[async_trait]
pub trait GoalRanker: Send + Sync {
    /// Score every goal in `[0, 1]`.
    async fn rank(&self, goals: &[Goal], context: &str) -> Result<Vec<GoalScore>, SeekError>;
}

/// Confirms (or vetoes) the chosen goal before a process is built.
#[async_trait]
pub trait GoalApprover: Send + Sync {
    /// Whether to proceed with `goal` at the given confidence.
    async fn approve(&self, goal: &Goal, confidence: f64) -> bool;
}

/// Approves everything.
pub struct AutoApprove;

#[async_trait]
impl GoalApprover for AutoApprove {
    async fn approve(&self, _goal: &Goal, _confidence: f64) -> bool {
        true
    }
}

/// Tuning for one seek run.
#[derive(Clone)]
pub struct SeekOptions {
    /// Minimum confidence for a goal to be considered.
    pub goal_confidence_cutoff: f64,
    /// Options for the constructed process.
    pub process: ProcessOptions,
}

impl Default for SeekOptions {
    fn default() -> Self {
        Self {
            goal_confidence_cutoff: 0.5,
            process: ProcessOptions::default(),
        }
    }
}

/// The outcome of a seek: the chosen goal, its score, and the finished
/// process report.
#[derive(Debug)]
pub struct SeekOutcome {
    /// The chosen goal name.
    pub goal: String,
    /// The winning confidence.
    pub confidence: f64,
    /// The report of the single-goal process.
    pub report: ProcessReport,
    /// The value bound for the goal's output type, if the process produced
    /// one.
    pub output: Option<TypedValue>,
}

/// Ranks goals and runs the winner.
pub struct GoalSeeker {
    universe: AgentDefinition,
    ranker: Arc<dyn GoalRanker>,
    approver: Arc<dyn GoalApprover>,
    llm: Arc<LlmOperations>,
    bus: EventBus,
}

impl GoalSeeker {
    /// A seeker over the `universe` agent (its goals are the candidates).
    #[must_use]
    pub fn new(
        universe: AgentDefinition,
        ranker: Arc<dyn GoalRanker>,
        approver: Arc<dyn GoalApprover>,
        llm: Arc<LlmOperations>,
        bus: EventBus,
    ) -> Self {
        Self {
            universe,
            ranker,
            approver,
            llm,
            bus,
        }
    }

    /// Rank, choose, approve, build, run.
    ///
    /// # Errors
    ///
    /// [`SeekError::NoGoalAboveCutoff`] when nothing ranks high enough;
    /// [`SeekError::GoalRejected`] when the approver vetoes;
    /// [`SeekError::RankingFailed`] when the ranker fails.
    pub async fn seek(
        &self,
        bindings: Vec<(String, TypedValue)>,
        options: SeekOptions,
    ) -> Result<SeekOutcome, SeekError> {
        let context = ranking_context(&bindings);
        let scores = self.ranker.rank(&self.universe.goals, &context).await?;

        let mut best: Option<GoalScore> = None;
        for score in scores {
            if best.as_ref().is_none_or(|b| score.confidence > b.confidence) {
                best = Some(score);
            }
        }
        let best = best.ok_or(SeekError::NoGoalAboveCutoff {
            cutoff: options.goal_confidence_cutoff,
            best: 0.0,
        })?;
        if best.confidence < options.goal_confidence_cutoff {
            return Err(SeekError::NoGoalAboveCutoff {
                cutoff: options.goal_confidence_cutoff,
                best: best.confidence,
            });
        }

        let goal = self
            .universe
            .goal(&best.goal)
            .map_err(|e| SeekError::RankingFailed(e.to_string()))?
            .clone();
        if !self.approver.approve(&goal, best.confidence).await {
            return Err(SeekError::GoalRejected(goal.name.clone()));
        }
        tracing::debug!(goal = %goal.name, confidence = best.confidence, "goal chosen");

        let agent = single_goal_agent(&self.universe, &goal);
        let mut process_options = options.process.clone();
        process_options.goal = Some(goal.name.clone());
        let mut process = AgentProcess::new(
            agent,
            bindings,
            Arc::clone(&self.llm),
            self.bus.clone(),
            process_options,
        );
        let report = process.run().await;

        if report.status == ProcessStatus::Failed {
            tracing::warn!(
                goal = %goal.name,
                reason = report.reason.as_deref().unwrap_or(""),
                "seeded process failed"
            );
        }
        let output = report
            .board
            .iter()
            .rev()
            .find(|e| e.value.conforms(&goal.output_type))
            .map(|e| e.value.clone());

        Ok(SeekOutcome {
            goal: goal.name,
            confidence: best.confidence,
            report,
            output,
        })
    }
}

/// The text the ranker sees: the `UserInput` binding when present, else a
/// synthetic rendering of every binding.
#[must_use]
pub fn ranking_context(bindings: &[(String, TypedValue)]) -> String {
    for (_, value) in bindings {
        if value.conforms(UserInput::type_name()) {
            if let Some(content) = value.value.get("content").and_then(|c| c.as_str()) {
                return content.to_string();
            }
        }
    }
    bindings
        .iter()
        .map(|(name, value)| format!("{name} ({}): {}", value.type_name, value.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A synthetic agent containing only the actions relevant to `goal`: the
/// goal action plus the backward closure of actions whose outputs feed a
/// needed input type.
#[must_use]
pub fn single_goal_agent(universe: &AgentDefinition, goal: &Goal) -> AgentDefinition {
    let mut needed: HashSet<String> = HashSet::new();
    needed.insert(goal.output_type.clone());
    if let Some(goal_action) = universe.goal_action(&goal.name) {
        for input in &goal_action.inputs {
            needed.insert(input.type_name.clone());
        }
    }

    let mut selected: Vec<usize> = Vec::new();
    loop {
        let mut grew = false;
        for (idx, action) in universe.actions.iter().enumerate() {
            if selected.contains(&idx) {
                continue;
            }
            let relevant = action.achieves.as_deref() == Some(goal.name.as_str())
                || action
                    .outputs
                    .iter()
                    .any(|output| needed.contains(&output.type_name));
            if !relevant {
                continue;
            }
            // Skip goal actions for other goals.
            if action
                .achieves
                .as_deref()
                .is_some_and(|achieved| achieved != goal.name)
            {
                continue;
            }
            selected.push(idx);
            for input in &action.inputs {
                if needed.insert(input.type_name.clone()) {
                    grew = true;
                }
            }
            grew = true;
        }
        if !grew {
            break;
        }
    }

    let mut agent = AgentDefinition::new(format!("{}:{}", universe.name, goal.name))
        .describe(format!("single-goal agent for {}", goal.name))
        .with_goal(goal.clone())
        .with_planner(universe.planner);
    for idx in selected {
        agent.actions.push(Arc::clone(&universe.actions[idx]));
    }
    agent
}
