//! Command handlers
//!
//! Application services that orchestrate use cases. Edits that must reach
//! the backend are applied to a copy, persisted, and only then committed to
//! the caller's editor or session, so a failed request changes nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::adapter::{adapt_campaign, campaign_to_wire};
use crate::application::dto::*;
use crate::domain::aggregates::{Campaign, ContactPool, Pipeline, Segment};
use crate::domain::services::{EmailDraft, MembershipSession, PipelineEditor};
use crate::domain::value_objects::{ContactKind, EntityId};
use crate::domain::DomainEvent;
use crate::ports::inbound::{CampaignUseCases, SegmentUseCases};
use crate::ports::outbound::{CampaignRepository, CatalogGateway, GatewayError, SegmentRepository};
use crate::{MarketingError, Result};

fn log_events(events: Vec<DomainEvent>) {
    for event in events {
        tracing::info!(event = event.name(), "{:?}", event);
    }
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MarketingError::Validation(format!("{} name cannot be empty", what)));
    }
    Ok(name.to_string())
}

// =============================================================================
// Campaigns
// =============================================================================

/// Campaign application service
pub struct CampaignService {
    campaigns: Arc<dyn CampaignRepository>,
    segments: Arc<dyn SegmentRepository>,
    catalog: Arc<dyn CatalogGateway>,
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        segments: Arc<dyn SegmentRepository>,
        catalog: Arc<dyn CatalogGateway>,
    ) -> Self {
        Self {
            campaigns,
            segments,
            catalog,
        }
    }

    /// Run `edit` and persist the result. Inside a customizing session the
    /// edit stays local until the session is committed.
    async fn persist<T, F>(&self, editor: &mut PipelineEditor, edit: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut PipelineEditor) -> Result<T> + Send,
    {
        if editor.is_customizing() {
            return edit(editor);
        }
        let (value, _) = self.persist_now(editor, edit).await?;
        Ok(value)
    }

    /// Run `edit` and save at once, customizing session or not. Returns the
    /// ids the backend assigned to locally created stages and email units.
    async fn persist_now<T, F>(
        &self,
        editor: &mut PipelineEditor,
        edit: F,
    ) -> Result<(T, HashMap<EntityId, EntityId>)>
    where
        T: Send,
        F: FnOnce(&mut PipelineEditor) -> Result<T> + Send,
    {
        let mut next = editor.clone();
        let value = edit(&mut next)?;
        let assigned = self.save(&mut next).await?;
        *editor = next;
        Ok((value, assigned))
    }

    /// Save what the editor would store right now and adopt the ids the
    /// backend assigned. Inside a customizing session the stored layout is
    /// the one from before the session.
    async fn save(&self, editor: &mut PipelineEditor) -> Result<HashMap<EntityId, EntityId>> {
        let view = editor.persisted_view();
        if view.id().is_temporary() {
            return Err(MarketingError::Validation(
                "campaign has not been created on the backend yet".into(),
            ));
        }
        let stored = match self.campaigns.save(&campaign_to_wire(&view)).await? {
            Some(stored) => Some(stored),
            None => match self.campaigns.fetch(view.id()).await {
                Ok(stored) => Some(stored),
                Err(err) => {
                    tracing::warn!(campaign = %view.id(), error = %err, "saved campaign could not be reloaded, keeping local ids");
                    None
                }
            },
        };

        let assigned = match stored.map(RawCampaignPayload::classify) {
            Some(payload @ RawCampaignPayload::NestedPipeline(_)) => {
                view.pipeline().assigned_ids(adapt_campaign(payload).pipeline())
            }
            _ => HashMap::new(),
        };
        let adopted = editor.adopt_ids(&assigned);
        tracing::info!(campaign = %view.id(), adopted, "campaign saved");
        log_events(editor.take_persisted_events());
        Ok(assigned)
    }

    async fn attach_segments(&self, campaign: &mut Campaign, referenced: Vec<EntityId>) -> Result<()> {
        let scoped = self.segments.list_for_campaign(campaign.id()).await?;
        let mut attached: HashSet<EntityId> = campaign.segments().iter().map(|s| s.id.clone()).collect();
        for segment in scoped {
            attached.insert(segment.id.clone());
            campaign.attach_segment(segment);
        }

        for id in referenced.into_iter().filter(|id| !attached.contains(id)) {
            match self.segments.get(&id).await {
                Ok(segment) => campaign.attach_segment(segment),
                Err(GatewayError::NotFound { .. }) => {
                    tracing::warn!(campaign = %campaign.id(), segment = %id, "campaign references a missing segment");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CampaignUseCases for CampaignService {
    async fn load_campaign(&self, id: &EntityId) -> Result<Campaign> {
        let raw = self.campaigns.fetch(id).await?;
        let referenced = raw
            .segments
            .iter()
            .filter_map(|s| match s {
                RawSegmentRef::Id(id) => Some(EntityId::from_string(id.clone())),
                RawSegmentRef::Embedded(_) => None,
            })
            .collect();

        let mut campaign = adapt_campaign(RawCampaignPayload::classify(raw));
        self.attach_segments(&mut campaign, referenced).await?;

        tracing::debug!(
            campaign = %campaign.id(),
            stages = campaign.pipeline().len(),
            segments = campaign.segments().len(),
            "campaign loaded"
        );
        Ok(campaign)
    }

    async fn create_campaign(&self, command: NewCampaign) -> Result<Campaign> {
        let name = required_name(&command.name, "campaign")?;
        let command = NewCampaign { name, ..command };

        let raw = self.campaigns.create(&command).await?;
        let campaign = adapt_campaign(RawCampaignPayload::classify(raw));
        tracing::info!(campaign = %campaign.id(), name = %campaign.name(), "campaign created");
        Ok(campaign)
    }

    async fn commit_customizing(&self, editor: &mut PipelineEditor) -> Result<()> {
        let mut next = editor.clone();
        next.finish_customizing()?;
        self.save(&mut next).await?;
        *editor = next;
        Ok(())
    }

    async fn rename_stage(&self, editor: &mut PipelineEditor, stage_id: &EntityId, name: &str) -> Result<()> {
        self.persist(editor, |e| e.rename_stage(stage_id, name)).await
    }

    async fn set_stage_service(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        service_id: Option<&str>,
    ) -> Result<()> {
        let service_id = service_id.map(str::trim).filter(|s| !s.is_empty());
        if let Some(service_id) = service_id {
            let services = self.catalog.list_services().await?;
            if !services.iter().any(|s| s.id == service_id) {
                return Err(MarketingError::Validation(format!("unknown service '{}'", service_id)));
            }
        }
        self.persist(editor, |e| e.set_stage_service(stage_id, service_id)).await
    }

    async fn set_requires_purchase(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        required: bool,
    ) -> Result<()> {
        self.persist(editor, |e| e.set_requires_purchase(stage_id, required)).await
    }

    async fn add_email_unit(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        draft: EmailDraft,
    ) -> Result<EntityId> {
        let (email_id, assigned) = self.persist_now(editor, |e| e.add_email_unit(stage_id, draft)).await?;
        Ok(assigned.get(&email_id).cloned().unwrap_or(email_id))
    }

    async fn remove_email_unit(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        email_id: &EntityId,
    ) -> Result<()> {
        self.persist_now(editor, |e| e.remove_email_unit(stage_id, email_id).map(|_| ()))
            .await?;
        Ok(())
    }

    async fn refresh_statuses(&self, editor: &mut PipelineEditor) -> Result<usize> {
        let raw = self.campaigns.fetch(editor.campaign().id()).await?;
        let remote = adapt_campaign(RawCampaignPayload::classify(raw));
        let changed = editor.merge_remote_statuses(&remote);
        tracing::info!(campaign = %remote.id(), changed, "email statuses refreshed");
        Ok(changed)
    }

    async fn list_services(&self) -> Result<Vec<ServiceOffering>> {
        Ok(self.catalog.list_services().await?)
    }

    async fn generate_draft(&self, request: DraftRequest) -> Result<String> {
        if request.topic.trim().is_empty() {
            return Err(MarketingError::Validation("draft topic cannot be empty".into()));
        }
        let response = self.catalog.generate_draft(&request).await?;
        Ok(response.content)
    }
}

// =============================================================================
// Segments
// =============================================================================

/// Segment application service
pub struct SegmentService {
    segments: Arc<dyn SegmentRepository>,
    catalog: Arc<dyn CatalogGateway>,
}

impl SegmentService {
    pub fn new(segments: Arc<dyn SegmentRepository>, catalog: Arc<dyn CatalogGateway>) -> Self {
        Self { segments, catalog }
    }

    /// Apply `edit` to a copy of the session and persist the segment if it
    /// changed; the caller's session is replaced only on success.
    async fn persist<T, F>(&self, session: &mut MembershipSession, edit: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut MembershipSession) -> Result<T> + Send,
    {
        let mut next = session.clone();
        let value = edit(&mut next)?;

        if next.segment() != session.segment() {
            self.segments.save(next.segment()).await?;
            tracing::info!(segment = %next.segment().id, "segment saved");
        }
        log_events(next.take_events());
        *session = next;
        Ok(value)
    }
}

#[async_trait]
impl SegmentUseCases for SegmentService {
    async fn list_segments(&self) -> Result<Vec<Segment>> {
        Ok(self.segments.list().await?)
    }

    async fn get_segment(&self, id: &EntityId) -> Result<Segment> {
        Ok(self.segments.get(id).await?)
    }

    async fn segments_for_campaign(&self, campaign_id: &EntityId) -> Result<Vec<Segment>> {
        Ok(self.segments.list_for_campaign(campaign_id).await?)
    }

    async fn create_segment(&self, command: CreateSegmentCommand) -> Result<Segment> {
        let name = required_name(&command.name, "segment")?;
        let mut segment = Segment::new(name, command.description.trim());
        segment.campaign_id = command.campaign_id.map(EntityId::from_string);
        for (variable, value) in command.variables {
            segment = segment.with_variable(variable, value);
        }

        let created = self.segments.create(&segment).await?;
        tracing::info!(segment = %created.id, name = %created.name, "segment created");
        Ok(created)
    }

    async fn delete_segment(&self, id: &EntityId) -> Result<()> {
        self.segments.delete(id).await?;
        tracing::info!(segment = %id, "segment deleted");
        Ok(())
    }

    async fn load_contact_pool(&self) -> Result<ContactPool> {
        let (clients, leads) =
            tokio::try_join!(self.catalog.list_clients(), self.catalog.list_leads())?;
        let clients = clients
            .into_iter()
            .filter_map(|r| r.into_contact(ContactKind::Client))
            .collect();
        let leads = leads
            .into_iter()
            .filter_map(|r| r.into_contact(ContactKind::Lead))
            .collect();
        Ok(ContactPool::from_records(clients, leads))
    }

    async fn open_membership(
        &self,
        segment_id: &EntityId,
        pipeline: Option<&Pipeline>,
    ) -> Result<MembershipSession> {
        let segment = self.segments.get(segment_id).await?;
        let pool = self.load_contact_pool().await?;
        Ok(MembershipSession::open(segment, &pool, pipeline))
    }

    async fn move_selected_in(&self, session: &mut MembershipSession) -> Result<Vec<EntityId>> {
        self.persist(session, |s| Ok(s.move_selected_in())).await
    }

    async fn move_selected_out(&self, session: &mut MembershipSession) -> Result<Vec<EntityId>> {
        self.persist(session, |s| Ok(s.move_selected_out())).await
    }

    async fn assign_to_stage(
        &self,
        session: &mut MembershipSession,
        contact_id: &EntityId,
        stage_id: &EntityId,
    ) -> Result<()> {
        self.persist(session, |s| s.assign_to_stage(contact_id, stage_id)).await
    }

    async fn unassign(&self, session: &mut MembershipSession, contact_id: &EntityId) -> Result<bool> {
        self.persist(session, |s| Ok(s.unassign(contact_id))).await
    }
}
