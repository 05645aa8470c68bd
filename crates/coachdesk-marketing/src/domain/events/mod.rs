//! Domain Events
//!
//! Raised by the pipeline editor and the membership manager, drained by the
//! application services once the change has been persisted.

use chrono::{DateTime, Utc};
use crate::domain::value_objects::EntityId;

/// All domain events in the marketing bounded context
#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Campaign(CampaignEvent),
    Segment(SegmentEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CampaignEvent {
    Created {
        campaign_id: EntityId,
        created_at: DateTime<Utc>,
    },
    StageInserted {
        campaign_id: EntityId,
        stage_id: EntityId,
        order: u32,
    },
    StageRemoved {
        campaign_id: EntityId,
        stage_id: EntityId,
    },
    StageMoved {
        campaign_id: EntityId,
        stage_id: EntityId,
        from: u32,
        to: u32,
    },
    StageRenamed {
        campaign_id: EntityId,
        stage_id: EntityId,
        name: String,
    },
    StageServiceChanged {
        campaign_id: EntityId,
        stage_id: EntityId,
        service_id: Option<String>,
        requires_purchase: bool,
    },
    EmailUnitAdded {
        campaign_id: EntityId,
        stage_id: EntityId,
        email_id: EntityId,
    },
    EmailUnitRemoved {
        campaign_id: EntityId,
        stage_id: EntityId,
        email_id: EntityId,
    },
    CustomizingCancelled {
        campaign_id: EntityId,
        discarded_events: usize,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentEvent {
    ContactsMovedIn {
        segment_id: EntityId,
        contact_ids: Vec<EntityId>,
    },
    ContactsMovedOut {
        segment_id: EntityId,
        contact_ids: Vec<EntityId>,
    },
    ContactAssignedToStage {
        segment_id: EntityId,
        contact_id: EntityId,
        stage_id: EntityId,
    },
    ContactUnassigned {
        segment_id: EntityId,
        contact_id: EntityId,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Campaign(event) => match event {
                CampaignEvent::Created { .. } => "campaign.created",
                CampaignEvent::StageInserted { .. } => "campaign.stage_inserted",
                CampaignEvent::StageRemoved { .. } => "campaign.stage_removed",
                CampaignEvent::StageMoved { .. } => "campaign.stage_moved",
                CampaignEvent::StageRenamed { .. } => "campaign.stage_renamed",
                CampaignEvent::StageServiceChanged { .. } => "campaign.stage_service_changed",
                CampaignEvent::EmailUnitAdded { .. } => "campaign.email_added",
                CampaignEvent::EmailUnitRemoved { .. } => "campaign.email_removed",
                CampaignEvent::CustomizingCancelled { .. } => "campaign.customizing_cancelled",
            },
            Self::Segment(event) => match event {
                SegmentEvent::ContactsMovedIn { .. } => "segment.contacts_moved_in",
                SegmentEvent::ContactsMovedOut { .. } => "segment.contacts_moved_out",
                SegmentEvent::ContactAssignedToStage { .. } => "segment.contact_assigned",
                SegmentEvent::ContactUnassigned { .. } => "segment.contact_unassigned",
            },
        }
    }
}
