//! Structured-output schemas, constraint validation, and the prompts that
//! teach the model about both.

use gambit_types::{LlmError, Message};
use schemars::JsonSchema;

/// The JSON Schema for an output type, as a plain value.
#[must_use]
pub fn output_schema<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema.schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// Validates candidate JSON against a compiled schema, reporting each
/// violation as a human-readable line the model can act on.
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile `schema`. Invalid schemas are a programming error on the
    /// output type and surface as [`LlmError::Other`].
    pub fn new(schema: &serde_json::Value) -> Result<Self, LlmError> {
        let compiled = jsonschema::validator_for(schema)
            .map_err(|e| LlmError::Other(format!("invalid output schema: {e}").into()))?;
        Ok(Self { compiled })
    }

    /// Every constraint violation in `candidate`, empty when valid.
    #[must_use]
    pub fn violations(&self, candidate: &serde_json::Value) -> Vec<String> {
        self.compiled
            .iter_errors(candidate)
            .map(|error| {
                let path = error.instance_path().to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{path}: {error}")
                }
            })
            .collect()
    }
}

/// Renders the schema and violation reports into prompt messages.
pub struct ValidationPromptGenerator;

impl ValidationPromptGenerator {
    /// A system message telling the model exactly what shape is required.
    #[must_use]
    pub fn shape_message(schema: &serde_json::Value) -> Message {
        Message::system(format!(
            "Respond with a single JSON object and nothing else. The object \
             must conform to this JSON Schema:\n{}",
            serde_json::to_string_pretty(schema).unwrap_or_default()
        ))
    }

    /// A user message reporting the specific violations of the previous
    /// candidate, for the single corrective attempt.
    #[must_use]
    pub fn violations_message(violations: &[String]) -> Message {
        Message::user(format!(
            "The previous response violated the required output constraints:\n{}\n\
             Produce a corrected JSON object that satisfies every constraint.",
            violations
                .iter()
                .map(|v| format!("- {v}"))
                .collect::<Vec<_>>()
                .join("\n")
        ))
    }
}

/// Extract the JSON payload from model text, tolerating Markdown fences.
pub fn extract_json(text: &str) -> Result<serde_json::Value, LlmError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);
    serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))
}
