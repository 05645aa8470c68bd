//! Campaign Aggregate
//!
//! Root owner of the pipeline stages. Segments are attached by reference: they
//! are persisted on their own and may be reused across campaigns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::pipeline::Pipeline;
use crate::domain::aggregates::segment::Segment;
use crate::domain::events::{CampaignEvent, DomainEvent};
use crate::domain::services::StatisticsAggregator;
use crate::domain::value_objects::EntityId;

/// Campaign aggregate root
#[derive(Clone, Debug)]
pub struct Campaign {
    id: EntityId,
    name: String,
    description: String,
    tags: Vec<String>,
    status: CampaignStatus,
    segments: Vec<Segment>,
    pipeline: Pipeline,
    stats: CampaignStats,
    created_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

/// Raw delivery counters reported by the backend for the whole campaign.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub sent: u64,
    pub received: u64,
    pub opened: u64,
    pub clicked: u64,
    pub converted: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    #[default]
    #[serde(rename = "borrador", alias = "draft")]
    Draft,
    #[serde(rename = "programada", alias = "scheduled")]
    Scheduled,
    #[serde(rename = "activa", alias = "active")]
    Active,
    #[serde(rename = "pausada", alias = "paused")]
    Paused,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

/// Everything needed to rebuild a campaign from a backend payload.
#[derive(Clone, Debug, Default)]
pub struct CampaignParts {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: CampaignStatus,
    pub segments: Vec<Segment>,
    pub pipeline: Pipeline,
    pub stats: CampaignStats,
    pub created_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Create a new, empty draft campaign (factory method)
    pub fn create(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut campaign = Self::restore(CampaignParts {
            id: EntityId::temporary(),
            name: name.into(),
            description: description.into(),
            created_at: Some(now),
            ..Default::default()
        });

        campaign.raise_event(DomainEvent::Campaign(CampaignEvent::Created {
            campaign_id: campaign.id.clone(),
            created_at: now,
        }));

        campaign
    }

    /// Rebuild a campaign as loaded from the backend. Segments without a
    /// stage snapshot get one copied from the pipeline and stage percentages
    /// are recomputed.
    pub fn restore(parts: CampaignParts) -> Self {
        let mut campaign = Self {
            id: parts.id,
            name: parts.name,
            description: parts.description,
            tags: parts.tags,
            status: parts.status,
            segments: vec![],
            pipeline: parts.pipeline,
            stats: parts.stats,
            created_at: parts.created_at,
            updated_at: Utc::now(),
            events: vec![],
        };
        for segment in parts.segments {
            campaign.attach_segment(segment);
        }
        campaign.refresh_percentages();
        campaign
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn tags(&self) -> &[String] { &self.tags }
    pub fn status(&self) -> CampaignStatus { self.status }
    pub fn segments(&self) -> &[Segment] { &self.segments }
    pub fn pipeline(&self) -> &Pipeline { &self.pipeline }
    pub fn stats(&self) -> &CampaignStats { &self.stats }
    pub fn created_at(&self) -> Option<DateTime<Utc>> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn segment(&self, segment_id: &EntityId) -> Option<&Segment> {
        self.segments.iter().find(|s| &s.id == segment_id)
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Attach a segment, replacing a previous copy with the same id. The
    /// segment's stage snapshot is materialized if it has none.
    pub fn attach_segment(&mut self, mut segment: Segment) {
        if segment.materialize_stages(&self.pipeline) {
            tracing::debug!(segment = %segment.id, campaign = %self.id, "materialized segment stages");
        }
        match self.segments.iter_mut().find(|s| s.id == segment.id) {
            Some(existing) => *existing = segment,
            None => self.segments.push(segment),
        }
        self.touch();
    }

    pub fn detach_segment(&mut self, segment_id: &EntityId) -> Option<Segment> {
        let index = self.segments.iter().position(|s| &s.id == segment_id)?;
        self.touch();
        Some(self.segments.remove(index))
    }

    pub fn set_stats(&mut self, stats: CampaignStats) {
        self.stats = stats;
        self.refresh_percentages();
        self.touch();
    }

    /// Recompute every stage's cached display percentage.
    pub fn refresh_percentages(&mut self) {
        let sent = self.stats.sent;
        for stage in self.pipeline.stages_mut() {
            let percentage = StatisticsAggregator::stage_percentage(stage, sent);
            stage.set_percentage(percentage);
        }
    }

    /// Merge email statuses from a freshly fetched copy of this campaign.
    /// Statuses only move forward; returns how many units changed.
    pub fn merge_remote_statuses(&mut self, remote: &Campaign) -> usize {
        let mut changed = 0;
        for stage in self.pipeline.stages_mut() {
            let Some(remote_stage) = remote.pipeline.get(stage.id()) else {
                continue;
            };
            for unit in stage.emails_mut().iter_mut() {
                let Some(remote_unit) = remote_stage.email(unit.id()) else {
                    continue;
                };
                let before = unit.status();
                if remote_unit.status() == before {
                    continue;
                }
                if unit.advance_to(remote_unit.status()) {
                    changed += 1;
                } else {
                    tracing::warn!(
                        email = %unit.id(),
                        local = %before,
                        remote = %remote_unit.status(),
                        "ignored email status regression"
                    );
                }
            }
        }
        if remote.stats != self.stats {
            self.stats = remote.stats;
        }
        self.refresh_percentages();
        changed
    }

    /// Adopt ids the backend assigned to locally created stages and email
    /// units, including the stage snapshots held by attached segments.
    pub(crate) fn apply_ids(&mut self, assigned: &HashMap<EntityId, EntityId>) -> usize {
        if assigned.is_empty() {
            return 0;
        }
        let applied = self.pipeline.apply_ids(assigned);
        for stage in self.segments.iter_mut().flat_map(|s| s.stages.iter_mut().flatten()) {
            if let Some(id) = assigned.get(&stage.stage_id) {
                stage.stage_id = id.clone();
            }
        }
        applied
    }

    // =========================================================================
    // Domain Events
    // =========================================================================

    /// Get and clear accumulated domain events
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub(crate) fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    /// Drop events raised after the first `len` ones unless `keep` says
    /// otherwise. Returns how many were dropped.
    pub(crate) fn discard_events_since(
        &mut self,
        len: usize,
        keep: impl Fn(&DomainEvent) -> bool,
    ) -> usize {
        if len >= self.events.len() {
            return 0;
        }
        let recent = self.events.split_off(len);
        let before = recent.len();
        self.events.extend(recent.into_iter().filter(|e| keep(e)));
        before - (self.events.len() - len)
    }

    /// Remove and return the events matching `saved`, together with how many
    /// of them sat among the first `mark` events.
    pub(crate) fn drain_events(
        &mut self,
        saved: impl Fn(&DomainEvent) -> bool,
        mark: usize,
    ) -> (Vec<DomainEvent>, usize) {
        let mut drained = Vec::new();
        let mut before_mark = 0;
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.events)
            .into_iter()
            .enumerate()
            .partition(|(_, event)| saved(event));
        for (index, event) in taken {
            if index < mark {
                before_mark += 1;
            }
            drained.push(event);
        }
        self.events = kept.into_iter().map(|(_, event)| event).collect();
        (drained, before_mark)
    }

    pub(crate) fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    pub(crate) fn replace_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = pipeline;
        self.refresh_percentages();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::email_unit::{EmailStatus, EmailUnit};
    use crate::domain::aggregates::pipeline::PipelineStage;

    fn stage_with_emails(id: &str, name: &str, order: u32, emails: Vec<EmailUnit>) -> PipelineStage {
        PipelineStage::restore(EntityId::from(id), name.into(), order, 0, emails, None, false)
    }

    fn unit(id: &str, status: EmailStatus) -> EmailUnit {
        EmailUnit::restore(EntityId::from(id), "s".into(), "b".into(), vec![], status, None)
    }

    #[test]
    fn test_create_raises_event() {
        let mut campaign = Campaign::create("Reto 30 dias", "");
        assert_eq!(campaign.status(), CampaignStatus::Draft);
        assert!(campaign.id().is_temporary());
        let events = campaign.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DomainEvent::Campaign(CampaignEvent::Created { .. })));
    }

    #[test]
    fn test_restore_computes_percentages() {
        let emails = vec![
            unit("e1", EmailStatus::Sent),
            unit("e2", EmailStatus::Sent),
            unit("e3", EmailStatus::Opened),
        ];
        let campaign = Campaign::restore(CampaignParts {
            id: EntityId::from("c1"),
            name: "Promo".into(),
            pipeline: Pipeline::from_stages(vec![stage_with_emails("s1", "Abiertos", 0, emails)]),
            stats: CampaignStats { sent: 200, ..Default::default() },
            ..Default::default()
        });
        assert_eq!(campaign.pipeline().stages()[0].percentage(), 1.5);
    }

    #[test]
    fn test_attach_segment_materializes_and_replaces() {
        let mut campaign = Campaign::restore(CampaignParts {
            id: EntityId::from("c1"),
            pipeline: Pipeline::from_stages(vec![stage_with_emails("s1", "A", 0, vec![])]),
            ..Default::default()
        });
        let mut segment = Segment::new("VIP", "");
        segment.id = EntityId::from("seg");
        campaign.attach_segment(segment.clone());
        assert_eq!(campaign.segments()[0].stages.as_ref().unwrap().len(), 1);

        segment.name = "VIP 2".into();
        campaign.attach_segment(segment);
        assert_eq!(campaign.segments().len(), 1);
        assert_eq!(campaign.segments()[0].name, "VIP 2");

        assert!(campaign.detach_segment(&EntityId::from("seg")).is_some());
        assert!(campaign.segments().is_empty());
    }

    #[test]
    fn test_apply_ids_updates_segment_stage_snapshot() {
        let mut campaign = Campaign::restore(CampaignParts {
            id: EntityId::from("c1"),
            pipeline: Pipeline::from_stages(vec![stage_with_emails("tmp-1", "A", 0, vec![])]),
            ..Default::default()
        });
        campaign.attach_segment(Segment::new("VIP", ""));

        let assigned = HashMap::from([(EntityId::from("tmp-1"), EntityId::from("s1"))]);
        assert_eq!(campaign.apply_ids(&assigned), 1);
        assert!(campaign.pipeline().get(&EntityId::from("s1")).is_some());
        let snapshot = campaign.segments()[0].stages.as_ref().unwrap();
        assert_eq!(snapshot[0].stage_id, EntityId::from("s1"));
    }

    #[test]
    fn test_merge_remote_statuses_is_monotonic() {
        let local_stage = stage_with_emails(
            "s1",
            "A",
            0,
            vec![unit("e1", EmailStatus::Opened), unit("e2", EmailStatus::Sent)],
        );
        let remote_stage = stage_with_emails(
            "s1",
            "A",
            0,
            vec![unit("e1", EmailStatus::Sent), unit("e2", EmailStatus::Clicked)],
        );
        let mut local = Campaign::restore(CampaignParts {
            id: EntityId::from("c1"),
            pipeline: Pipeline::from_stages(vec![local_stage]),
            ..Default::default()
        });
        let remote = Campaign::restore(CampaignParts {
            id: EntityId::from("c1"),
            pipeline: Pipeline::from_stages(vec![remote_stage]),
            stats: CampaignStats { sent: 4, ..Default::default() },
            ..Default::default()
        });

        assert_eq!(local.merge_remote_statuses(&remote), 1);
        let stage = &local.pipeline().stages()[0];
        assert_eq!(stage.emails()[0].status(), EmailStatus::Opened);
        assert_eq!(stage.emails()[1].status(), EmailStatus::Clicked);
        assert_eq!(local.stats().sent, 4);
        assert_eq!(stage.percentage(), 50.0);
    }
}
