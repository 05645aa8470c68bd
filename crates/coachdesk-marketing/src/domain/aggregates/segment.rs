//! Segment aggregate
//!
//! A named, independently persisted grouping of clients and leads, with an
//! optional variable map used for personalization and an optional snapshot of
//! pipeline stage membership.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::pipeline::Pipeline;
use crate::domain::value_objects::{Contact, ContactKind, EntityId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<EntityId>,
    #[serde(default)]
    pub clients: Vec<Contact>,
    #[serde(default)]
    pub leads: Vec<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<SegmentStage>>,
}

/// Membership snapshot of one pipeline stage inside a segment.
///
/// Copied from the campaign pipeline once; later pipeline edits do not
/// propagate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStage {
    pub stage_id: EntityId,
    pub name: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_service_id: Option<String>,
    #[serde(default)]
    pub clients: Vec<EntityId>,
    #[serde(default)]
    pub leads: Vec<EntityId>,
}

impl SegmentStage {
    pub fn contains(&self, contact_id: &EntityId) -> bool {
        self.clients.contains(contact_id) || self.leads.contains(contact_id)
    }

    pub(crate) fn add(&mut self, contact_id: EntityId, kind: ContactKind) {
        if self.contains(&contact_id) {
            return;
        }
        match kind {
            ContactKind::Client => self.clients.push(contact_id),
            ContactKind::Lead => self.leads.push(contact_id),
        }
    }

    pub(crate) fn remove(&mut self, contact_id: &EntityId) -> bool {
        let before = self.clients.len() + self.leads.len();
        self.clients.retain(|id| id != contact_id);
        self.leads.retain(|id| id != contact_id);
        before != self.clients.len() + self.leads.len()
    }
}

impl Segment {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: EntityId::temporary(),
            name: name.into(),
            description: description.into(),
            campaign_id: None,
            clients: vec![],
            leads: vec![],
            variables: None,
            stages: None,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value);
        self
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables
            .as_ref()
            .map(|vars| vars.contains_key(name))
            .unwrap_or(false)
    }

    pub fn members(&self) -> impl Iterator<Item = &Contact> {
        self.clients.iter().chain(self.leads.iter())
    }

    pub fn member_count(&self) -> usize {
        self.clients.len() + self.leads.len()
    }

    pub fn contains(&self, contact_id: &EntityId) -> bool {
        self.members().any(|c| &c.id == contact_id)
    }

    /// Stage the contact is currently assigned to, if any.
    pub fn stage_of(&self, contact_id: &EntityId) -> Option<&SegmentStage> {
        self.stages
            .as_ref()?
            .iter()
            .find(|stage| stage.contains(contact_id))
    }

    /// Copy the campaign's stage list (name, order and service only) when the
    /// segment has no stage snapshot yet. Returns whether a copy was made.
    pub fn materialize_stages(&mut self, pipeline: &Pipeline) -> bool {
        if self.stages.is_some() {
            return false;
        }
        let stages = pipeline
            .stages()
            .iter()
            .filter(|stage| !stage.is_synthetic())
            .map(|stage| SegmentStage {
                stage_id: stage.id().clone(),
                name: stage.name().to_string(),
                order: stage.order(),
                linked_service_id: stage.linked_service_id().map(String::from),
                clients: vec![],
                leads: vec![],
            })
            .collect();
        self.stages = Some(stages);
        true
    }
}
