//! LLM interaction records — the per-call contract between an action and
//! the LLM operations layer.

use crate::id::InteractionId;
use crate::tool::ToolDyn;
use std::sync::Arc;
use std::time::Duration;

/// How a model is selected for an interaction.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRole {
    /// The most capable model the provider offers.
    Best,
    /// The cheapest model the provider offers.
    Cheapest,
    /// A specific model by name.
    Named(String),
}

/// Model-selection criteria and generation parameters for one LLM call.
#[derive(Debug, Clone)]
pub struct LlmOptions {
    /// How to select the model.
    pub role: ModelRole,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum output tokens.
    pub max_tokens: Option<usize>,
    /// Wall-clock timeout for a single attempt.
    pub timeout: Duration,
}

impl LlmOptions {
    /// Options targeting the best available model.
    #[must_use]
    pub fn best() -> Self {
        Self {
            role: ModelRole::Best,
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Options targeting the cheapest available model.
    #[must_use]
    pub fn cheapest() -> Self {
        Self {
            role: ModelRole::Cheapest,
            ..Self::best()
        }
    }

    /// Options targeting a specific model by name.
    pub fn named(model: impl Into<String>) -> Self {
        Self {
            role: ModelRole::Named(model.into()),
            ..Self::best()
        }
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self::best()
    }
}

/// One LLM call as seen by the engine.
///
/// Created once per call and carried through retries unchanged. Tools listed
/// here (directly or via group references) are offered to the model; the
/// sender never executes them.
#[derive(Clone)]
pub struct LlmInteraction {
    /// Opaque identifier, stable across retries.
    pub id: InteractionId,
    /// Model selection and generation parameters.
    pub options: LlmOptions,
    /// Tools offered directly.
    pub tools: Vec<Arc<dyn ToolDyn>>,
    /// Tool groups to resolve at call time.
    pub tool_groups: Vec<String>,
    /// Whether structured output is validated against declared constraints.
    pub validate: bool,
}

impl LlmInteraction {
    /// A plain interaction with the given ID and options, no tools,
    /// validation on.
    pub fn new(id: impl Into<InteractionId>, options: LlmOptions) -> Self {
        Self {
            id: id.into(),
            options,
            tools: Vec::new(),
            tool_groups: Vec::new(),
            validate: true,
        }
    }

    /// Disable constraint validation for this interaction.
    #[must_use]
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Add a tool group reference.
    #[must_use]
    pub fn with_tool_group(mut self, group: impl Into<String>) -> Self {
        self.tool_groups.push(group.into());
        self
    }

    /// Add a directly-offered tool.
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn ToolDyn>) -> Self {
        self.tools.push(tool);
        self
    }
}

impl std::fmt::Debug for LlmInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmInteraction")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("tools", &self.tools.len())
            .field("tool_groups", &self.tool_groups)
            .field("validate", &self.validate)
            .finish()
    }
}
