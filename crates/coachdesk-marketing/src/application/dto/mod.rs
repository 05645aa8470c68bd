//! Data Transfer Objects (DTOs)
//!
//! Backend wire payloads and the read models handed to presentation layers.
//! The backend speaks Spanish field names; Rust-side names are English.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Campaign, CampaignStats, CampaignStatus, EmailStatus, Segment};
use crate::domain::services::{FunnelPercentages, StatisticsAggregator};
use crate::domain::value_objects::{Contact, ContactKind, Email, EntityId};

// =============================================================================
// Campaign payloads
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCampaign {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default, rename = "nombre")]
    pub name: String,
    #[serde(default, rename = "descripcion")]
    pub description: String,
    #[serde(default, rename = "etiquetas")]
    pub tags: Vec<String>,
    #[serde(default, rename = "estado")]
    pub status: CampaignStatus,
    #[serde(default, rename = "segmentos")]
    pub segments: Vec<RawSegmentRef>,
    #[serde(default, rename = "estadisticas")]
    pub stats: RawStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<RawPipeline>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A campaign lists its segments either by id or embedded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSegmentRef {
    Embedded(Box<Segment>),
    Id(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStats {
    #[serde(default, rename = "enviados")]
    pub sent: u64,
    #[serde(default, rename = "recibidos")]
    pub received: u64,
    #[serde(default, rename = "abiertos")]
    pub opened: u64,
    #[serde(default, rename = "clicks")]
    pub clicked: u64,
    #[serde(default, rename = "convertidos")]
    pub converted: u64,
}

impl From<RawStats> for CampaignStats {
    fn from(raw: RawStats) -> Self {
        Self {
            sent: raw.sent,
            received: raw.received,
            opened: raw.opened,
            clicked: raw.clicked,
            converted: raw.converted,
        }
    }
}

impl From<CampaignStats> for RawStats {
    fn from(stats: CampaignStats) -> Self {
        Self {
            sent: stats.sent,
            received: stats.received,
            opened: stats.opened,
            clicked: stats.clicked,
            converted: stats.converted,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPipeline {
    #[serde(default, rename = "etapas", skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<RawStage>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStage {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "nombre")]
    pub name: String,
    #[serde(default, rename = "orden")]
    pub order: u32,
    #[serde(default, rename = "contactos")]
    pub contacts: u64,
    /// Cached display value; never read back as authoritative.
    #[serde(default, rename = "porcentaje", skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, rename = "servicioId", skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, rename = "requiereCompra")]
    pub requires_purchase: bool,
    #[serde(default, rename = "correos")]
    pub emails: Vec<RawEmail>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmail {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "asunto")]
    pub subject: String,
    #[serde(default, rename = "contenido")]
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default, rename = "estado")]
    pub status: EmailStatus,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The two shapes a campaign payload comes in.
#[derive(Clone, Debug, PartialEq)]
pub enum RawCampaignPayload {
    /// Stages with nested email units.
    NestedPipeline(RawCampaign),
    /// Only the flat statistics block.
    FlatStats(RawCampaign),
}

impl RawCampaignPayload {
    pub fn classify(raw: RawCampaign) -> Self {
        let nested = raw
            .pipeline
            .as_ref()
            .and_then(|p| p.stages.as_ref())
            .map(|stages| !stages.is_empty())
            .unwrap_or(false);
        if nested {
            Self::NestedPipeline(raw)
        } else {
            Self::FlatStats(raw)
        }
    }

    pub fn raw(&self) -> &RawCampaign {
        match self {
            Self::NestedPipeline(raw) | Self::FlatStats(raw) => raw,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCampaign {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default, rename = "descripcion")]
    pub description: String,
    #[serde(default, rename = "etiquetas")]
    pub tags: Vec<String>,
    #[serde(default, rename = "estado")]
    pub status: CampaignStatus,
}

// =============================================================================
// Segment commands
// =============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateSegmentCommand {
    pub name: String,
    pub description: String,
    pub campaign_id: Option<String>,
    pub variables: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Catalog payloads
// =============================================================================

/// A purchasable service a stage can be gated on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "precio", skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

/// Client or lead record as listed by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "correo")]
    pub email: String,
    #[serde(default, alias = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "apellido", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, alias = "planActivo", skip_serializing_if = "Option::is_none")]
    pub active_plan: Option<String>,
    #[serde(default, alias = "dietaActiva", skip_serializing_if = "Option::is_none")]
    pub active_diet: Option<String>,
}

impl ContactRecord {
    /// Convert to a pool contact. Records with an unusable address are
    /// skipped.
    pub fn into_contact(self, kind: ContactKind) -> Option<Contact> {
        let email = match Email::parse(self.email.as_str()) {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!(id = %self.id, %kind, error = %err, "skipping contact record");
                return None;
            }
        };
        let display_name = match (self.name, self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (first, last) => first.or(last),
        };
        let mut contact = Contact::new(EntityId::from_string(self.id), email, kind);
        contact.display_name = display_name;
        contact.active_plan_ref = self.active_plan;
        contact.active_diet_ref = self.active_diet;
        Some(contact)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DraftRequest {
    #[serde(rename = "tematica")]
    pub topic: String,
    #[serde(rename = "tono")]
    pub tone: String,
    #[serde(rename = "instrucciones")]
    pub instructions: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DraftResponse {
    #[serde(rename = "contenido")]
    pub content: String,
}

// =============================================================================
// Views (Read Models)
// =============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct CampaignView {
    pub id: String,
    pub name: String,
    pub status: String,
    pub tags: Vec<String>,
    pub segments: Vec<String>,
    pub stats: CampaignStats,
    pub funnel: FunnelPercentages,
    pub stages: Vec<StageView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StageView {
    pub id: String,
    pub order: u32,
    pub name: String,
    pub contacts: u64,
    pub emails: usize,
    pub percentage: f64,
    pub service_id: Option<String>,
    pub requires_purchase: bool,
    pub synthetic: bool,
}

impl From<&Campaign> for CampaignView {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: campaign.id().to_string(),
            name: campaign.name().to_string(),
            status: campaign.status().as_str().to_string(),
            tags: campaign.tags().to_vec(),
            segments: campaign.segments().iter().map(|s| s.name.clone()).collect(),
            stats: *campaign.stats(),
            funnel: StatisticsAggregator::campaign_breakdown(campaign),
            stages: campaign
                .pipeline()
                .stages()
                .iter()
                .map(|stage| StageView {
                    id: stage.id().to_string(),
                    order: stage.order(),
                    name: stage.name().to_string(),
                    contacts: stage.contact_count(),
                    emails: stage.emails().len(),
                    percentage: stage.percentage(),
                    service_id: stage.linked_service_id().map(String::from),
                    requires_purchase: stage.requires_purchase_to_advance(),
                    synthetic: stage.is_synthetic(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify() {
        let nested: RawCampaign = serde_json::from_value(json!({
            "_id": "c1",
            "nombre": "Reto",
            "pipeline": {"etapas": [{"id": "s1", "nombre": "Bienvenida", "orden": 0}]}
        }))
        .unwrap();
        assert!(matches!(
            RawCampaignPayload::classify(nested),
            RawCampaignPayload::NestedPipeline(_)
        ));

        let empty: RawCampaign = serde_json::from_value(json!({
            "id": "c2",
            "pipeline": {"etapas": []},
            "estadisticas": {"enviados": 10}
        }))
        .unwrap();
        assert!(matches!(RawCampaignPayload::classify(empty), RawCampaignPayload::FlatStats(_)));

        let flat: RawCampaign = serde_json::from_value(json!({"id": "c3"})).unwrap();
        assert!(matches!(RawCampaignPayload::classify(flat), RawCampaignPayload::FlatStats(_)));
    }

    #[test]
    fn test_segment_refs() {
        let raw: RawCampaign = serde_json::from_value(json!({
            "id": "c1",
            "segmentos": ["s1", {"_id": "s2", "name": "VIP"}]
        }))
        .unwrap();
        assert_eq!(raw.segments[0], RawSegmentRef::Id("s1".into()));
        assert!(matches!(&raw.segments[1], RawSegmentRef::Embedded(s) if s.name == "VIP"));
    }

    #[test]
    fn test_contact_record() {
        let record: ContactRecord = serde_json::from_value(json!({
            "_id": "c1",
            "correo": "Ana@Example.com",
            "nombre": "Ana",
            "apellido": "Ruiz",
            "planActivo": "plan-7"
        }))
        .unwrap();
        let contact = record.into_contact(ContactKind::Client).unwrap();
        assert_eq!(contact.email.as_str(), "ana@example.com");
        assert_eq!(contact.label(), "Ana Ruiz");
        assert_eq!(contact.active_plan_ref.as_deref(), Some("plan-7"));

        let broken = ContactRecord { id: "x".into(), email: "nope".into(), ..Default::default() };
        assert!(broken.into_contact(ContactKind::Lead).is_none());
    }

    #[test]
    fn test_draft_request_wire_names() {
        let body = serde_json::to_value(DraftRequest {
            topic: "nutricion".into(),
            tone: "cercano".into(),
            instructions: "breve".into(),
        })
        .unwrap();
        assert_eq!(body, json!({"tematica": "nutricion", "tono": "cercano", "instrucciones": "breve"}));
    }
}
