//! Outbound ports
//!
//! Interfaces the backend adapters must implement. Campaigns cross this
//! boundary as raw payloads; the application layer adapts them.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::dto::{
    ContactRecord, DraftRequest, DraftResponse, NewCampaign, RawCampaign, ServiceOffering,
};
use crate::domain::aggregates::Segment;
use crate::domain::value_objects::EntityId;
use crate::MarketingError;

/// Campaign persistence port
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Fetch a campaign payload by id
    async fn fetch(&self, id: &EntityId) -> Result<RawCampaign, GatewayError>;

    /// Create a campaign; the returned payload carries the assigned id
    async fn create(&self, campaign: &NewCampaign) -> Result<RawCampaign, GatewayError>;

    /// Replace a stored campaign. Stages and email units sent without an id
    /// get one from the backend; the stored copy is returned when the
    /// backend sends it back, `None` when the response body is empty.
    async fn save(&self, campaign: &RawCampaign) -> Result<Option<RawCampaign>, GatewayError>;
}

/// Segment persistence port
#[async_trait]
pub trait SegmentRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Segment>, GatewayError>;

    async fn get(&self, id: &EntityId) -> Result<Segment, GatewayError>;

    /// Segments attached to a campaign
    async fn list_for_campaign(&self, campaign_id: &EntityId) -> Result<Vec<Segment>, GatewayError>;

    async fn create(&self, segment: &Segment) -> Result<Segment, GatewayError>;

    async fn save(&self, segment: &Segment) -> Result<(), GatewayError>;

    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError>;
}

/// Read-only backend collaborators: service catalog, contacts, AI drafts.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ServiceOffering>, GatewayError>;

    async fn list_clients(&self) -> Result<Vec<ContactRecord>, GatewayError>;

    async fn list_leads(&self) -> Result<Vec<ContactRecord>, GatewayError>;

    async fn generate_draft(&self, request: &DraftRequest) -> Result<DraftResponse, GatewayError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("missing credential")]
    MissingCredential,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<GatewayError> for MarketingError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { entity, id } => Self::NotFound { entity, id },
            GatewayError::MissingCredential => Self::Auth("missing credential".into()),
            GatewayError::Unauthorized(message) => Self::Auth(message),
            GatewayError::Network(message) => Self::Network(message),
            GatewayError::Decode(message) => Self::Network(format!("unexpected response: {}", message)),
        }
    }
}
