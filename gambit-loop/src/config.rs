//! Configuration for the tool loop.

/// Configuration for one tool loop run.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum number of LLM calls before the loop fails with
    /// [`LoopError::IterationLimit`](gambit_types::LoopError::IterationLimit).
    pub max_iterations: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}
