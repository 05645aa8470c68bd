//! Email unit entity
//!
//! One personalizable message launched from a pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, PersonalizationVariable};

/// Delivery lifecycle of an email unit.
///
/// Transitions are monotonic and driven by the backend:
/// `draft -> sent -> received -> opened -> clicked -> converted`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EmailStatus {
    #[default]
    #[serde(rename = "borrador", alias = "draft")]
    Draft,
    #[serde(rename = "enviado", alias = "sent")]
    Sent,
    #[serde(rename = "recibido", alias = "received")]
    Received,
    #[serde(rename = "abierto", alias = "opened")]
    Opened,
    #[serde(rename = "clic", alias = "clicked")]
    Clicked,
    #[serde(rename = "convertido", alias = "converted")]
    Converted,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Received => "received",
            Self::Opened => "opened",
            Self::Clicked => "clicked",
            Self::Converted => "converted",
        }
    }

    /// Whether a unit in this status has reached `milestone` in the funnel.
    pub fn reached(&self, milestone: EmailStatus) -> bool {
        *self >= milestone
    }
}

impl std::fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmailUnit {
    id: EntityId,
    subject: String,
    body: String,
    used_variables: Vec<PersonalizationVariable>,
    status: EmailStatus,
    created_at: Option<DateTime<Utc>>,
}

impl EmailUnit {
    /// New unit authored locally; always starts as a draft.
    pub fn draft(
        subject: impl Into<String>,
        body: impl Into<String>,
        used_variables: Vec<PersonalizationVariable>,
    ) -> Self {
        Self {
            id: EntityId::temporary(),
            subject: subject.into(),
            body: body.into(),
            used_variables,
            status: EmailStatus::Draft,
            created_at: Some(Utc::now()),
        }
    }

    /// Rebuild a unit as stored by the backend.
    pub fn restore(
        id: EntityId,
        subject: String,
        body: String,
        used_variables: Vec<PersonalizationVariable>,
        status: EmailStatus,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self { id, subject, body, used_variables, status, created_at }
    }

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn subject(&self) -> &str { &self.subject }
    pub fn body(&self) -> &str { &self.body }
    pub fn used_variables(&self) -> &[PersonalizationVariable] { &self.used_variables }
    pub fn status(&self) -> EmailStatus { self.status }
    pub fn created_at(&self) -> Option<DateTime<Utc>> { self.created_at }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Apply a status reported by the backend. Regressions are ignored and
    /// reported as `false`.
    pub fn advance_to(&mut self, status: EmailStatus) -> bool {
        if status < self.status {
            return false;
        }
        self.status = status;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_defaults() {
        let unit = EmailUnit::draft("Hola", "Cuerpo", vec![]);
        assert_eq!(unit.status(), EmailStatus::Draft);
        assert!(unit.id().is_temporary());
        assert!(unit.created_at().is_some());
    }

    #[test]
    fn test_status_never_regresses() {
        let mut unit = EmailUnit::draft("Hola", "Cuerpo", vec![]);
        assert!(unit.advance_to(EmailStatus::Opened));
        assert!(!unit.advance_to(EmailStatus::Sent));
        assert_eq!(unit.status(), EmailStatus::Opened);
        assert!(unit.advance_to(EmailStatus::Opened));
        assert!(unit.advance_to(EmailStatus::Converted));
    }

    #[test]
    fn test_status_wire_names() {
        let status: EmailStatus = serde_json::from_str("\"abierto\"").unwrap();
        assert_eq!(status, EmailStatus::Opened);
        let status: EmailStatus = serde_json::from_str("\"clicked\"").unwrap();
        assert_eq!(status, EmailStatus::Clicked);
        assert_eq!(serde_json::to_string(&EmailStatus::Draft).unwrap(), "\"borrador\"");
    }

    #[test]
    fn test_reached() {
        assert!(EmailStatus::Clicked.reached(EmailStatus::Opened));
        assert!(!EmailStatus::Sent.reached(EmailStatus::Received));
    }
}
