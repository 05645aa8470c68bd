//! Contact value object
//!
//! A contact is either an existing customer (client) or a prospective lead.
//! It is owned by the contact pool and only ever referenced by segments and
//! stage membership lists.

use serde::{Deserialize, Serialize};

use super::{Email, EntityId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Client,
    Lead,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Lead => "lead",
        }
    }
}

impl std::fmt::Display for ContactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub kind: ContactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_plan_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_diet_ref: Option<String>,
}

impl Contact {
    pub fn new(id: impl Into<EntityId>, email: Email, kind: ContactKind) -> Self {
        Self {
            id: id.into(),
            email,
            display_name: None,
            kind,
            active_plan_ref: None,
            active_diet_ref: None,
        }
    }

    pub fn client(id: &str, email: &str) -> Self {
        Self::new(id, Email::new_unchecked(email), ContactKind::Client)
    }

    pub fn lead(id: &str, email: &str) -> Self {
        Self::new(id, Email::new_unchecked(email), ContactKind::Lead)
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn is_client(&self) -> bool {
        self.kind == ContactKind::Client
    }

    /// Name shown in membership lists, falling back to the address.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or_else(|| self.email.as_str())
    }
}
