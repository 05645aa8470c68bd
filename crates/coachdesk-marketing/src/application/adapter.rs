//! Campaign payload adapter
//!
//! The single place where backend campaign payloads are turned into the
//! canonical `Campaign` shape, and back.

use crate::application::dto::{
    RawCampaign, RawCampaignPayload, RawEmail, RawPipeline, RawSegmentRef, RawStage, RawStats,
};
use crate::domain::aggregates::{
    Campaign, CampaignParts, CampaignStats, EmailUnit, Pipeline, PipelineStage,
};
use crate::domain::value_objects::{EntityId, PersonalizationVariable};

/// Names of the stages synthesized from flat statistics, in funnel order.
pub const FALLBACK_STAGES: [&str; 4] = ["Enviados", "Recibidos", "Abiertos", "Clicks"];

pub fn adapt_campaign(payload: RawCampaignPayload) -> Campaign {
    let (raw, pipeline) = match payload {
        RawCampaignPayload::NestedPipeline(mut raw) => {
            let stages = raw
                .pipeline
                .take()
                .and_then(|p| p.stages)
                .unwrap_or_default();
            let pipeline = Pipeline::from_stages(stages.into_iter().map(adapt_stage).collect());
            (raw, pipeline)
        }
        RawCampaignPayload::FlatStats(raw) => {
            tracing::warn!(campaign = %raw.id, "campaign has no stage list, using statistics fallback");
            let pipeline = fallback_pipeline(&raw.stats);
            (raw, pipeline)
        }
    };

    let segments = raw
        .segments
        .into_iter()
        .filter_map(|segment| match segment {
            RawSegmentRef::Embedded(segment) => Some(*segment),
            RawSegmentRef::Id(_) => None,
        })
        .collect();

    Campaign::restore(CampaignParts {
        id: EntityId::from_string(raw.id),
        name: raw.name,
        description: raw.description,
        tags: raw.tags,
        status: raw.status,
        segments,
        pipeline,
        stats: CampaignStats::from(raw.stats),
        created_at: raw.created_at,
    })
}

fn fallback_pipeline(stats: &RawStats) -> Pipeline {
    let counts = [stats.sent, stats.received, stats.opened, stats.clicked];
    Pipeline::from_stages(
        FALLBACK_STAGES
            .iter()
            .zip(counts)
            .map(|(name, count)| PipelineStage::synthetic(*name, count))
            .collect(),
    )
}

fn adapt_stage(raw: RawStage) -> PipelineStage {
    let emails = raw.emails.into_iter().map(adapt_email).collect();
    PipelineStage::restore(
        raw.id.map(EntityId::from_string).unwrap_or_else(EntityId::temporary),
        raw.name,
        raw.order,
        raw.contacts,
        emails,
        raw.service_id.filter(|s| !s.is_empty()),
        raw.requires_purchase,
    )
}

fn adapt_email(raw: RawEmail) -> EmailUnit {
    let id = raw.id.map(EntityId::from_string).unwrap_or_else(EntityId::temporary);
    let variables = raw
        .variables
        .iter()
        .filter_map(|name| {
            let variable = PersonalizationVariable::from_catalog(name);
            if variable.is_none() {
                tracing::warn!(email = %id, variable = %name, "dropping unknown personalization variable");
            }
            variable
        })
        .collect();
    EmailUnit::restore(id, raw.subject, raw.body, variables, raw.status, raw.created_at)
}

/// Payload sent back on save. Synthetic stages are never persisted and ids
/// minted locally are left for the backend to assign.
pub fn campaign_to_wire(campaign: &Campaign) -> RawCampaign {
    let stages: Vec<RawStage> = campaign
        .pipeline()
        .stages()
        .iter()
        .filter(|stage| !stage.is_synthetic())
        .map(stage_to_wire)
        .collect();

    RawCampaign {
        id: campaign.id().to_string(),
        name: campaign.name().to_string(),
        description: campaign.description().to_string(),
        tags: campaign.tags().to_vec(),
        status: campaign.status(),
        segments: campaign
            .segments()
            .iter()
            .filter(|s| !s.id.is_temporary())
            .map(|s| RawSegmentRef::Id(s.id.to_string()))
            .collect(),
        stats: RawStats::from(*campaign.stats()),
        pipeline: (!stages.is_empty()).then(|| RawPipeline { stages: Some(stages) }),
        created_at: campaign.created_at(),
    }
}

fn persisted_id(id: &EntityId) -> Option<String> {
    (!id.is_temporary()).then(|| id.to_string())
}

fn stage_to_wire(stage: &PipelineStage) -> RawStage {
    RawStage {
        id: persisted_id(stage.id()),
        name: stage.name().to_string(),
        order: stage.order(),
        contacts: stage.contact_count(),
        percentage: Some(stage.percentage()),
        service_id: stage.linked_service_id().map(String::from),
        requires_purchase: stage.requires_purchase_to_advance(),
        emails: stage
            .emails()
            .iter()
            .map(|unit| RawEmail {
                id: persisted_id(unit.id()),
                subject: unit.subject().to_string(),
                body: unit.body().to_string(),
                variables: unit.used_variables().iter().map(|v| v.name.clone()).collect(),
                status: unit.status(),
                created_at: unit.created_at(),
            })
            .collect(),
    }
}
