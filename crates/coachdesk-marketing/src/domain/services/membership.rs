//! Segment membership manager
//!
//! A `MembershipSession` lives while one segment's membership editor is open.
//! It splits the contact pool into the segment's own members (the pipeline
//! pool) and everyone else, tracks an independent selection in each, and
//! keeps stage assignments consistent with pool membership.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::aggregates::{ContactPool, Pipeline, Segment};
use crate::domain::events::{DomainEvent, SegmentEvent};
use crate::domain::value_objects::{Contact, ContactKind, EntityId};
use crate::{MarketingError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pool {
    Pipeline,
    Other,
}

/// Client and lead counts of one stage of the segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage_id: EntityId,
    pub name: String,
    pub order: u32,
    pub clients: usize,
    pub leads: usize,
}

#[derive(Clone, Debug)]
pub struct MembershipSession {
    segment: Segment,
    other: Vec<Contact>,
    selected_pipeline: BTreeSet<EntityId>,
    selected_other: BTreeSet<EntityId>,
    events: Vec<DomainEvent>,
}

impl MembershipSession {
    /// Open the editor for `segment`. Contacts of the pool that are not
    /// members form the other pool. When a pipeline is given and the segment
    /// has no stage snapshot yet, one is copied from it.
    pub fn open(mut segment: Segment, pool: &ContactPool, pipeline: Option<&Pipeline>) -> Self {
        if let Some(pipeline) = pipeline {
            segment.materialize_stages(pipeline);
        }
        let other = pool
            .all()
            .filter(|c| !segment.contains(&c.id))
            .cloned()
            .collect();

        tracing::debug!(segment = %segment.id, members = segment.member_count(), "membership session opened");

        Self {
            segment,
            other,
            selected_pipeline: BTreeSet::new(),
            selected_other: BTreeSet::new(),
            events: vec![],
        }
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn into_segment(self) -> Segment {
        self.segment
    }

    pub fn pipeline_pool(&self) -> impl Iterator<Item = &Contact> {
        self.segment.members()
    }

    pub fn other_pool(&self) -> &[Contact] {
        &self.other
    }

    /// Which pool currently holds the contact.
    pub fn pool_of(&self, contact_id: &EntityId) -> Option<Pool> {
        if self.segment.contains(contact_id) {
            Some(Pool::Pipeline)
        } else if self.other.iter().any(|c| &c.id == contact_id) {
            Some(Pool::Other)
        } else {
            None
        }
    }

    pub fn selection(&self, pool: Pool) -> &BTreeSet<EntityId> {
        match pool {
            Pool::Pipeline => &self.selected_pipeline,
            Pool::Other => &self.selected_other,
        }
    }

    pub fn is_selected(&self, contact_id: &EntityId) -> bool {
        self.selected_pipeline.contains(contact_id) || self.selected_other.contains(contact_id)
    }

    /// Flip the selection of a contact in whichever pool holds it. Returns
    /// whether it is selected afterwards.
    pub fn toggle_selection(&mut self, contact_id: &EntityId) -> Result<bool> {
        let pool = self
            .pool_of(contact_id)
            .ok_or_else(|| MarketingError::not_found("contact", contact_id))?;
        let selection = match pool {
            Pool::Pipeline => &mut self.selected_pipeline,
            Pool::Other => &mut self.selected_other,
        };
        if selection.remove(contact_id) {
            return Ok(false);
        }
        selection.insert(contact_id.clone());
        Ok(true)
    }

    pub fn clear_selection(&mut self) {
        self.selected_pipeline.clear();
        self.selected_other.clear();
    }

    /// Move every selected contact of the other pool into the segment.
    pub fn move_selected_in(&mut self) -> Vec<EntityId> {
        let selected = std::mem::take(&mut self.selected_other);
        self.selected_pipeline.clear();

        let (moving, staying): (Vec<Contact>, Vec<Contact>) = std::mem::take(&mut self.other)
            .into_iter()
            .partition(|c| selected.contains(&c.id));
        self.other = staying;

        let moved: Vec<EntityId> = moving.iter().map(|c| c.id.clone()).collect();
        for contact in moving {
            match contact.kind {
                ContactKind::Client => self.segment.clients.push(contact),
                ContactKind::Lead => self.segment.leads.push(contact),
            }
        }

        if !moved.is_empty() {
            self.events.push(DomainEvent::Segment(SegmentEvent::ContactsMovedIn {
                segment_id: self.segment.id.clone(),
                contact_ids: moved.clone(),
            }));
        }
        moved
    }

    /// Move every selected member out of the segment. Their stage
    /// assignments are dropped.
    pub fn move_selected_out(&mut self) -> Vec<EntityId> {
        let selected = std::mem::take(&mut self.selected_pipeline);
        self.selected_other.clear();

        let mut moving = vec![];
        for list in [&mut self.segment.clients, &mut self.segment.leads] {
            let (out, keep): (Vec<Contact>, Vec<Contact>) =
                std::mem::take(list).into_iter().partition(|c| selected.contains(&c.id));
            *list = keep;
            moving.extend(out);
        }

        let moved: Vec<EntityId> = moving.iter().map(|c| c.id.clone()).collect();
        if let Some(stages) = self.segment.stages.as_mut() {
            for stage in stages.iter_mut() {
                for id in &moved {
                    stage.remove(id);
                }
            }
        }
        self.other.extend(moving);

        if !moved.is_empty() {
            self.events.push(DomainEvent::Segment(SegmentEvent::ContactsMovedOut {
                segment_id: self.segment.id.clone(),
                contact_ids: moved.clone(),
            }));
        }
        moved
    }

    /// Put a member into one stage of the segment, taking it out of any
    /// other stage it was in.
    pub fn assign_to_stage(&mut self, contact_id: &EntityId, stage_id: &EntityId) -> Result<()> {
        let kind = self
            .segment
            .members()
            .find(|c| &c.id == contact_id)
            .map(|c| c.kind)
            .ok_or_else(|| {
                MarketingError::Validation(format!(
                    "contact {} is not in the pipeline pool of segment '{}'",
                    contact_id, self.segment.name
                ))
            })?;

        let stages = self
            .segment
            .stages
            .as_mut()
            .ok_or_else(|| MarketingError::not_found("stage", stage_id))?;
        if !stages.iter().any(|s| &s.stage_id == stage_id) {
            return Err(MarketingError::not_found("stage", stage_id));
        }

        for stage in stages.iter_mut() {
            if &stage.stage_id == stage_id {
                stage.add(contact_id.clone(), kind);
            } else {
                stage.remove(contact_id);
            }
        }

        self.events.push(DomainEvent::Segment(SegmentEvent::ContactAssignedToStage {
            segment_id: self.segment.id.clone(),
            contact_id: contact_id.clone(),
            stage_id: stage_id.clone(),
        }));
        Ok(())
    }

    /// Take a member out of its stage. Returns whether it had one.
    pub fn unassign(&mut self, contact_id: &EntityId) -> bool {
        let Some(stages) = self.segment.stages.as_mut() else {
            return false;
        };
        let mut removed = false;
        for stage in stages.iter_mut() {
            removed |= stage.remove(contact_id);
        }
        if removed {
            self.events.push(DomainEvent::Segment(SegmentEvent::ContactUnassigned {
                segment_id: self.segment.id.clone(),
                contact_id: contact_id.clone(),
            }));
        }
        removed
    }

    /// Per-stage client and lead counts, computed from the membership lists.
    pub fn stage_counts(&self) -> Vec<StageCount> {
        let Some(stages) = self.segment.stages.as_ref() else {
            return vec![];
        };
        let mut counts: Vec<StageCount> = stages
            .iter()
            .map(|stage| StageCount {
                stage_id: stage.stage_id.clone(),
                name: stage.name.clone(),
                order: stage.order,
                clients: stage.clients.len(),
                leads: stage.leads.len(),
            })
            .collect();
        counts.sort_by_key(|c| c.order);
        counts
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
