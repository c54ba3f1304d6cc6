//! Typed values and the declared-conformance relation.

use gambit_types::BoardError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A domain type that can live on a blackboard.
///
/// Conformance is declared, not reflected: a type names itself (and any
/// supertypes it wants to be assignable to) and the board matches lookups
/// against that list. No runtime reflection, no synthetic members to
/// filter.
pub trait TypeNamed {
    /// The stable, fully-qualified type name captured at write time.
    fn type_name() -> &'static str;

    /// Every type name this type conforms to, primary name first.
    fn conforms_to() -> Vec<&'static str> {
        vec![Self::type_name()]
    }
}

/// A value plus the type names captured when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    /// The primary captured type name.
    pub type_name: String,
    /// All type names the value conforms to, primary first.
    pub conforms_to: Vec<String>,
    /// The serialized value.
    pub value: serde_json::Value,
}

impl TypedValue {
    /// Capture a domain object as a typed value.
    pub fn of<T: TypeNamed + Serialize>(value: &T) -> Result<Self, BoardError> {
        let json = serde_json::to_value(value)
            .map_err(|e| BoardError::Serialization(e.to_string()))?;
        Ok(Self {
            type_name: T::type_name().to_string(),
            conforms_to: T::conforms_to().iter().map(|s| s.to_string()).collect(),
            value: json,
        })
    }

    /// Build a typed value from a raw JSON payload and explicit type name.
    /// Used when values arrive from outside the type system, e.g. a model
    /// supplying an action input.
    pub fn raw(type_name: impl Into<String>, value: serde_json::Value) -> Self {
        let type_name = type_name.into();
        Self {
            conforms_to: vec![type_name.clone()],
            type_name,
            value,
        }
    }

    /// Whether this value conforms to `type_name`.
    #[must_use]
    pub fn conforms(&self, type_name: &str) -> bool {
        self.conforms_to.iter().any(|t| t == type_name)
    }

    /// Deserialize the payload into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, BoardError> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| BoardError::Serialization(e.to_string()))
    }
}

/// Free-form user input, the conventional entry binding for
/// conversation-triggered agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    /// What the user said.
    pub content: String,
}

impl UserInput {
    /// Wrap user text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl TypeNamed for UserInput {
    fn type_name() -> &'static str {
        "gambit.UserInput"
    }
}
