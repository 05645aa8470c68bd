//! Value Objects module
//!
//! Immutable, validated domain primitives.

pub mod email;
pub mod contact;
pub mod variable;

pub use email::{Email, EmailError};
pub use contact::{Contact, ContactKind};
pub use variable::{PersonalizationVariable, VARIABLE_CATALOG};

/// Identifier value object for entities
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

const TEMPORARY_PREFIX: &str = "tmp-";

impl EntityId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Id for an entity created locally and not yet acknowledged by the
    /// backend.
    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMPORARY_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::from_string(id)
    }
}
