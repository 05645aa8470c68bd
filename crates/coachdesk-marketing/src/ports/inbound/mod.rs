//! Inbound ports (Use case traits)
//!
//! Every use case that talks to the backend either applies fully or leaves
//! the caller's editor/session untouched.

use async_trait::async_trait;

use crate::application::dto::{CreateSegmentCommand, DraftRequest, NewCampaign, ServiceOffering};
use crate::domain::aggregates::{Campaign, ContactPool, Pipeline, Segment};
use crate::domain::services::{EmailDraft, MembershipSession, PipelineEditor};
use crate::domain::value_objects::EntityId;
use crate::Result;

/// Campaign and pipeline use cases
#[async_trait]
pub trait CampaignUseCases: Send + Sync {
    /// Load a campaign with its pipeline and attached segments
    async fn load_campaign(&self, id: &EntityId) -> Result<Campaign>;

    async fn create_campaign(&self, command: NewCampaign) -> Result<Campaign>;

    /// Persist the structural edits of a customizing session and leave
    /// customizing mode
    async fn commit_customizing(&self, editor: &mut PipelineEditor) -> Result<()>;

    async fn rename_stage(&self, editor: &mut PipelineEditor, stage_id: &EntityId, name: &str) -> Result<()>;

    /// Link a service from the catalog to a stage, or clear it
    async fn set_stage_service(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        service_id: Option<&str>,
    ) -> Result<()>;

    async fn set_requires_purchase(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        required: bool,
    ) -> Result<()>;

    async fn add_email_unit(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        draft: EmailDraft,
    ) -> Result<EntityId>;

    async fn remove_email_unit(
        &self,
        editor: &mut PipelineEditor,
        stage_id: &EntityId,
        email_id: &EntityId,
    ) -> Result<()>;

    /// Refetch the campaign and merge email statuses forward. Returns the
    /// number of units whose status changed.
    async fn refresh_statuses(&self, editor: &mut PipelineEditor) -> Result<usize>;

    async fn list_services(&self) -> Result<Vec<ServiceOffering>>;

    /// AI-assisted body draft; the content is opaque
    async fn generate_draft(&self, request: DraftRequest) -> Result<String>;
}

/// Segment and membership use cases
#[async_trait]
pub trait SegmentUseCases: Send + Sync {
    async fn list_segments(&self) -> Result<Vec<Segment>>;

    async fn get_segment(&self, id: &EntityId) -> Result<Segment>;

    async fn segments_for_campaign(&self, campaign_id: &EntityId) -> Result<Vec<Segment>>;

    async fn create_segment(&self, command: CreateSegmentCommand) -> Result<Segment>;

    async fn delete_segment(&self, id: &EntityId) -> Result<()>;

    async fn load_contact_pool(&self) -> Result<ContactPool>;

    /// Open the membership editor of a segment. The stage snapshot is copied
    /// from `pipeline` when the segment has none.
    async fn open_membership(
        &self,
        segment_id: &EntityId,
        pipeline: Option<&Pipeline>,
    ) -> Result<MembershipSession>;

    async fn move_selected_in(&self, session: &mut MembershipSession) -> Result<Vec<EntityId>>;

    async fn move_selected_out(&self, session: &mut MembershipSession) -> Result<Vec<EntityId>>;

    async fn assign_to_stage(
        &self,
        session: &mut MembershipSession,
        contact_id: &EntityId,
        stage_id: &EntityId,
    ) -> Result<()>;

    async fn unassign(&self, session: &mut MembershipSession, contact_id: &EntityId) -> Result<bool>;
}
