//! Coachdesk Marketing Engine
//!
//! Campaign pipeline and segmentation engine behind the marketing module of
//! the coachdesk dashboard.
//!
//! ## Architecture
//!
//! - **Domain Layer**: campaign and segment aggregates, stage pipeline,
//!   contact pool, personalization catalog, domain events and services
//! - **Application Layer**: backend payload adapter, use case orchestration
//! - **Ports Layer**: use case traits and backend gateway traits
//! - **Infrastructure Layer**: in-memory gateways for tests and offline runs
//!
//! ## Features
//!
//! - Ordered pipeline stages with purchase gating on a linked service
//! - Customizing mode with snapshot/rollback of stage-level edits
//! - Personalization variables validated against every attached segment
//! - Contact migration between the pipeline pool and the other contacts
//! - Funnel percentages derived from raw counts, never stored

pub mod domain;
pub mod application;
pub mod ports;
pub mod infrastructure;

use thiserror::Error;

// Re-exports for convenience
pub use domain::aggregates::{
    Campaign, CampaignStats, CampaignStatus, ContactPool, EmailStatus, EmailUnit, Pipeline,
    PipelineStage, Segment, SegmentStage,
};
pub use domain::value_objects::{Contact, ContactKind, Email, EntityId, PersonalizationVariable};
pub use domain::events::{DomainEvent, CampaignEvent, SegmentEvent};
pub use domain::services::{
    EmailDraft, MembershipSession, PersonalizationResolver, PipelineEditor, Pool, StageBreakdown,
    StageCount, StatisticsAggregator, FunnelCounts, FunnelPercentages,
};
pub use application::{CampaignService, SegmentService};
pub use application::dto::{
    CampaignView, ContactRecord, CreateSegmentCommand, DraftRequest, DraftResponse, NewCampaign,
    RawCampaign, RawCampaignPayload, ServiceOffering, StageView,
};
pub use ports::inbound::{CampaignUseCases, SegmentUseCases};
pub use ports::outbound::{CampaignRepository, CatalogGateway, GatewayError, SegmentRepository};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("segment '{segment}' does not define variable '{variable}'")]
    MissingSegmentVariable { segment: String, variable: String },

    #[error("pipeline is not in customizing mode")]
    NotEditing,

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),
}

impl MarketingError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    /// Local validation failures are shown next to the offending control and
    /// are always fixable by correcting the input.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::MissingSegmentVariable { .. } | Self::NotEditing
        )
    }
}

pub type Result<T> = std::result::Result<T, MarketingError>;
