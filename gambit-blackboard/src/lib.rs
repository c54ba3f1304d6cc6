#![deny(missing_docs)]
//! # gambit-blackboard — the typed workspace of an agent process
//!
//! A blackboard maps binding names to immutable values, each carrying a
//! stable type name captured at write time. It is the single source of
//! truth for process state: the planner reads it to decide what runs next,
//! the dispatcher resolves action inputs from it, and action outputs are
//! written back to it.
//!
//! Values are shared-immutable: writers replace entries, readers see
//! snapshots. A bound value may reference others by binding name, never by
//! mutable pointer — the board holds no cycles.

pub mod value;

pub use value::{TypeNamed, TypedValue, UserInput};

use gambit_types::BoardError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// The default binding name, reserved for single-input/output agent entry
/// points. A value bound under `it` round-trips unchanged.
pub const IT: &str = "it";

/// One `(name, value)` pair on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardEntry {
    /// The binding name.
    pub name: String,
    /// The typed value.
    pub value: TypedValue,
}

/// An insertion-order-stable snapshot of a blackboard.
pub type BoardSnapshot = Vec<BoardEntry>;

/// The typed, append-oriented workspace owned by one agent process.
///
/// At most one value per binding name; rebinding a name replaces the value
/// in place, preserving the binding's original position so that
/// [`first_value_of_type`](Blackboard::first_value_of_type) stays stable.
#[derive(Debug, Default, Clone)]
pub struct Blackboard {
    entries: Vec<BoardEntry>,
    history: Vec<BoardEntry>,
}

impl Blackboard {
    /// An empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` under `name`, replacing any previous value.
    pub fn bind(&mut self, name: impl Into<String>, value: TypedValue) {
        let name = name.into();
        self.history.push(BoardEntry {
            name: name.clone(),
            value: value.clone(),
        });
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.value = value;
        } else {
            self.entries.push(BoardEntry { name, value });
        }
    }

    /// Serialize a domain object and bind it under `name`.
    pub fn bind_object<T: TypeNamed + Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<(), BoardError> {
        self.bind(name, TypedValue::of(value)?);
        Ok(())
    }

    /// Serialize a domain object and bind it under [`IT`].
    pub fn bind_default<T: TypeNamed + Serialize>(&mut self, value: &T) -> Result<(), BoardError> {
        self.bind_object(IT, value)
    }

    /// The value bound under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.value)
    }

    /// The value bound under `name`, only if its captured type conforms to
    /// `type_name`.
    #[must_use]
    pub fn get_typed(&self, name: &str, type_name: &str) -> Option<&TypedValue> {
        self.get(name).filter(|v| v.conforms(type_name))
    }

    /// Deserialize the value bound under `name` into `T`, checking type
    /// conformance first.
    pub fn get_as<T: TypeNamed + DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, BoardError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => {
                if !value.conforms(T::type_name()) {
                    return Err(BoardError::TypeMismatch {
                        name: name.to_string(),
                        actual: value.type_name.clone(),
                        requested: T::type_name().to_string(),
                    });
                }
                value.deserialize().map(Some)
            }
        }
    }

    /// Scan bindings in insertion order and return the first value whose
    /// captured type conforms to `type_name`.
    #[must_use]
    pub fn first_value_of_type(&self, type_name: &str) -> Option<&TypedValue> {
        self.entries
            .iter()
            .find(|e| e.value.conforms(type_name))
            .map(|e| &e.value)
    }

    /// Like [`first_value_of_type`](Self::first_value_of_type), but
    /// deserialized into `T`.
    pub fn first_of<T: TypeNamed + DeserializeOwned>(&self) -> Result<Option<T>, BoardError> {
        match self.first_value_of_type(T::type_name()) {
            None => Ok(None),
            Some(value) => value.deserialize().map(Some),
        }
    }

    /// Whether any binding's type conforms to `type_name`.
    #[must_use]
    pub fn has_value_of_type(&self, type_name: &str) -> bool {
        self.first_value_of_type(type_name).is_some()
    }

    /// All values in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &TypedValue> {
        self.entries.iter().map(|e| &e.value)
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[BoardEntry] {
        &self.entries
    }

    /// An insertion-order-stable snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        self.entries.clone()
    }

    /// Every write in the order it happened, including replaced values.
    pub fn history(&self) -> &[BoardEntry] {
        &self.history
    }

    /// Number of live bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the board holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
