//! Service endpoints
//!
//! Thin typed wrappers over the backend routes. Path segments are escaped
//! by the client, ids are passed through verbatim.

use serde::de::IgnoredAny;

use coachdesk_marketing::{
    ContactRecord, DraftRequest, DraftResponse, NewCampaign, RawCampaign, Segment, ServiceOffering,
};

use crate::{Client, Result};

const CAMPAIGNS: &str = "campanas-correo";
const SEGMENTS: &str = "segments";

// Campaigns
pub struct CampaignsService {
    client: Client,
}

impl CampaignsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, campaign_id: &str) -> Result<RawCampaign> {
        self.client.get(&[CAMPAIGNS, campaign_id]).await
    }

    pub async fn create(&self, campaign: &NewCampaign) -> Result<RawCampaign> {
        self.client.post(&[CAMPAIGNS], campaign).await
    }

    /// Replace the stored campaign. Returns the stored copy when the response
    /// carries one; an empty body or an acknowledgement without a campaign id
    /// gives `None`.
    pub async fn update(&self, campaign: &RawCampaign) -> Result<Option<RawCampaign>> {
        let body: Option<serde_json::Value> = self
            .client
            .put(&[CAMPAIGNS, campaign.id.as_str()], campaign)
            .await?;
        Ok(body
            .and_then(|body| serde_json::from_value::<RawCampaign>(body).ok())
            .filter(|stored| !stored.id.is_empty()))
    }

    /// Ask the backend for an AI-written email body.
    pub async fn generate_draft(&self, request: &DraftRequest) -> Result<DraftResponse> {
        self.client
            .post(&[CAMPAIGNS, "generar-correo-ia"], request)
            .await
    }
}

// Segments
pub struct SegmentsService {
    client: Client,
}

impl SegmentsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Segment>> {
        self.client.get(&[SEGMENTS]).await
    }

    pub async fn get(&self, segment_id: &str) -> Result<Segment> {
        self.client.get(&[SEGMENTS, segment_id]).await
    }

    pub async fn for_campaign(&self, campaign_id: &str) -> Result<Vec<Segment>> {
        self.client.get(&[SEGMENTS, "campaign", campaign_id]).await
    }

    /// Create a segment. The backend assigns the id, so the local one is
    /// left out of the body.
    pub async fn create(&self, segment: &Segment) -> Result<Segment> {
        let mut body = serde_json::to_value(segment)?;
        if let Some(fields) = body.as_object_mut() {
            fields.remove("id");
        }
        self.client.post(&[SEGMENTS], &body).await
    }

    pub async fn update(&self, segment: &Segment) -> Result<()> {
        self.client
            .put::<IgnoredAny, _>(&[SEGMENTS, segment.id.as_str()], segment)
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, segment_id: &str) -> Result<()> {
        self.client.delete(&[SEGMENTS, segment_id]).await
    }
}

// Catalog
pub struct CatalogService {
    client: Client,
}

impl CatalogService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn services(&self) -> Result<Vec<ServiceOffering>> {
        self.client.get(&["servicios", "services"]).await
    }

    pub async fn clients(&self) -> Result<Vec<ContactRecord>> {
        self.client.get(&["clientes"]).await
    }

    pub async fn leads(&self) -> Result<Vec<ContactRecord>> {
        self.client.get(&["leads"]).await
    }
}
