//! Pipeline stages
//!
//! A campaign funnel is an ordered list of stages. Stage `order` values are a
//! dense `0..N-1` permutation after every structural edit.

use std::collections::HashMap;

use crate::domain::aggregates::email_unit::EmailUnit;
use crate::domain::value_objects::EntityId;
use crate::{MarketingError, Result};

/// One ordered node of a campaign's funnel.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineStage {
    id: EntityId,
    name: String,
    order: u32,
    contact_count: u64,
    percentage: f64,
    emails: Vec<EmailUnit>,
    linked_service_id: Option<String>,
    requires_purchase_to_advance: bool,
    synthetic: bool,
}

impl PipelineStage {
    /// Stage created in the editor: temporary id, empty and ungated.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::temporary(),
            name: name.into(),
            order: 0,
            contact_count: 0,
            percentage: 0.0,
            emails: vec![],
            linked_service_id: None,
            requires_purchase_to_advance: false,
            synthetic: false,
        }
    }

    /// Rebuild a stage as stored by the backend.
    pub fn restore(
        id: EntityId,
        name: String,
        order: u32,
        contact_count: u64,
        emails: Vec<EmailUnit>,
        linked_service_id: Option<String>,
        requires_purchase_to_advance: bool,
    ) -> Self {
        // a gate without a service cannot be honoured
        let requires_purchase_to_advance =
            requires_purchase_to_advance && linked_service_id.is_some();
        Self {
            id,
            name,
            order,
            contact_count,
            percentage: 0.0,
            emails,
            linked_service_id,
            requires_purchase_to_advance,
            synthetic: false,
        }
    }

    /// Display-only stage derived from flat campaign counters.
    pub fn synthetic(name: impl Into<String>, contact_count: u64) -> Self {
        Self {
            id: EntityId::temporary(),
            contact_count,
            synthetic: true,
            ..Self::new(name)
        }
    }

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn order(&self) -> u32 { self.order }
    pub fn contact_count(&self) -> u64 { self.contact_count }
    pub fn percentage(&self) -> f64 { self.percentage }
    pub fn emails(&self) -> &[EmailUnit] { &self.emails }
    pub fn linked_service_id(&self) -> Option<&str> { self.linked_service_id.as_deref() }
    pub fn requires_purchase_to_advance(&self) -> bool { self.requires_purchase_to_advance }
    pub fn is_synthetic(&self) -> bool { self.synthetic }

    /// True when contacts must purchase the linked service before emails of
    /// the next stage are dispatched to them.
    pub fn is_gate(&self) -> bool {
        self.requires_purchase_to_advance && self.linked_service_id.is_some()
    }

    pub fn email(&self, email_id: &EntityId) -> Option<&EmailUnit> {
        self.emails.iter().find(|e| e.id() == email_id)
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_service(&mut self, service_id: Option<String>) {
        if service_id.is_none() {
            self.requires_purchase_to_advance = false;
        }
        self.linked_service_id = service_id;
    }

    pub(crate) fn set_requires_purchase(&mut self, required: bool) {
        self.requires_purchase_to_advance = required;
    }

    pub(crate) fn push_email(&mut self, unit: EmailUnit) {
        self.emails.push(unit);
    }

    pub(crate) fn remove_email(&mut self, email_id: &EntityId) -> Option<EmailUnit> {
        let index = self.emails.iter().position(|e| e.id() == email_id)?;
        Some(self.emails.remove(index))
    }

    pub(crate) fn emails_mut(&mut self) -> &mut Vec<EmailUnit> {
        &mut self.emails
    }

    pub(crate) fn set_emails(&mut self, emails: Vec<EmailUnit>) {
        self.emails = emails;
    }

    pub(crate) fn set_percentage(&mut self, percentage: f64) {
        self.percentage = percentage;
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

/// Ordered stage list owned by a campaign.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    /// Build a pipeline from stages in any order. Stages are sorted by their
    /// stored order (ties keep input order) and renumbered densely.
    pub fn from_stages(mut stages: Vec<PipelineStage>) -> Self {
        stages.sort_by_key(|s| s.order);
        let mut pipeline = Self { stages };
        pipeline.renumber();
        pipeline
    }

    pub fn stages(&self) -> &[PipelineStage] { &self.stages }
    pub fn len(&self) -> usize { self.stages.len() }
    pub fn is_empty(&self) -> bool { self.stages.is_empty() }

    pub fn get(&self, stage_id: &EntityId) -> Option<&PipelineStage> {
        self.stages.iter().find(|s| &s.id == stage_id)
    }

    pub fn position(&self, stage_id: &EntityId) -> Option<usize> {
        self.stages.iter().position(|s| &s.id == stage_id)
    }

    pub fn is_synthetic(&self) -> bool {
        !self.stages.is_empty() && self.stages.iter().all(|s| s.synthetic)
    }

    /// Stage whose emails are held back by `stage_id`'s purchase gate.
    pub fn gated_successor(&self, stage_id: &EntityId) -> Option<&PipelineStage> {
        let index = self.position(stage_id)?;
        if !self.stages[index].is_gate() {
            return None;
        }
        self.stages.get(index + 1)
    }

    /// Gate that has to be cleared before emails of `stage_id` go out.
    pub fn blocking_gate(&self, stage_id: &EntityId) -> Option<&PipelineStage> {
        let index = self.position(stage_id)?;
        let previous = self.stages.get(index.checked_sub(1)?)?;
        previous.is_gate().then_some(previous)
    }

    /// Whether `order` values are exactly `0..N-1` in list order.
    pub fn is_dense(&self) -> bool {
        self.stages
            .iter()
            .enumerate()
            .all(|(index, stage)| stage.order as usize == index)
    }

    pub(crate) fn get_mut(&mut self, stage_id: &EntityId) -> Result<&mut PipelineStage> {
        self.stages
            .iter_mut()
            .find(|s| &s.id == stage_id)
            .ok_or_else(|| MarketingError::not_found("stage", stage_id))
    }

    pub(crate) fn stages_mut(&mut self) -> impl Iterator<Item = &mut PipelineStage> {
        self.stages.iter_mut()
    }

    pub(crate) fn insert(&mut self, at: usize, stage: PipelineStage) -> Result<&PipelineStage> {
        if at > self.stages.len() {
            return Err(MarketingError::Validation(format!(
                "stage index {} is out of range 0..={}",
                at,
                self.stages.len()
            )));
        }
        self.stages.insert(at, stage);
        self.renumber();
        Ok(&self.stages[at])
    }

    pub(crate) fn remove(&mut self, stage_id: &EntityId) -> Result<PipelineStage> {
        let index = self
            .position(stage_id)
            .ok_or_else(|| MarketingError::not_found("stage", stage_id))?;
        let removed = self.stages.remove(index);
        self.renumber();
        Ok(removed)
    }

    pub(crate) fn move_to(&mut self, stage_id: &EntityId, to: usize) -> Result<()> {
        let from = self
            .position(stage_id)
            .ok_or_else(|| MarketingError::not_found("stage", stage_id))?;
        if to >= self.stages.len() {
            return Err(MarketingError::Validation(format!(
                "stage index {} is out of range 0..{}",
                to,
                self.stages.len()
            )));
        }
        let stage = self.stages.remove(from);
        self.stages.insert(to, stage);
        self.renumber();
        Ok(())
    }

    /// Pair this layout with the copy the backend stored and collect the ids
    /// it assigned to stages and email units created locally. Stages pair by
    /// position and email units by position inside their stage; a pair only
    /// counts when names (or subjects) agree.
    pub fn assigned_ids(&self, stored: &Pipeline) -> HashMap<EntityId, EntityId> {
        let mut assigned = HashMap::new();
        let local = self.stages.iter().filter(|s| !s.is_synthetic());
        let remote = stored.stages.iter().filter(|s| !s.is_synthetic());
        for (stage, stored_stage) in local.zip(remote) {
            if stage.id != stored_stage.id {
                if !adoptable(&stage.id, &stored_stage.id) || stage.name != stored_stage.name {
                    continue;
                }
                assigned.insert(stage.id.clone(), stored_stage.id.clone());
            }
            for (unit, stored_unit) in stage.emails.iter().zip(&stored_stage.emails) {
                if adoptable(unit.id(), stored_unit.id()) && unit.subject() == stored_unit.subject() {
                    assigned.insert(unit.id().clone(), stored_unit.id().clone());
                }
            }
        }
        assigned
    }

    /// Swap ids in place. Returns how many stages and units changed.
    pub(crate) fn apply_ids(&mut self, assigned: &HashMap<EntityId, EntityId>) -> usize {
        let mut applied = 0;
        for stage in &mut self.stages {
            if let Some(id) = assigned.get(&stage.id) {
                stage.set_id(id.clone());
                applied += 1;
            }
            for unit in &mut stage.emails {
                if let Some(id) = assigned.get(unit.id()) {
                    unit.set_id(id.clone());
                    applied += 1;
                }
            }
        }
        applied
    }

    fn renumber(&mut self) {
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.set_order(index as u32);
        }
    }
}

fn adoptable(local: &EntityId, stored: &EntityId) -> bool {
    local.is_temporary() && !stored.is_temporary()
}
