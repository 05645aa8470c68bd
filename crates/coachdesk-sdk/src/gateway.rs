//! Backend gateway
//!
//! Implements the marketing engine's outbound ports on top of [`Client`].

use async_trait::async_trait;

use coachdesk_marketing::{
    CampaignRepository, CatalogGateway, ContactRecord, DraftRequest, DraftResponse, EntityId,
    GatewayError, NewCampaign, RawCampaign, Segment, SegmentRepository, ServiceOffering,
};

use crate::Client;

#[async_trait]
impl CampaignRepository for Client {
    async fn fetch(&self, id: &EntityId) -> Result<RawCampaign, GatewayError> {
        self.campaigns()
            .get(id.as_str())
            .await
            .map_err(|e| e.into_gateway("campaign", id.as_str()))
    }

    async fn create(&self, campaign: &NewCampaign) -> Result<RawCampaign, GatewayError> {
        Ok(self.campaigns().create(campaign).await?)
    }

    async fn save(&self, campaign: &RawCampaign) -> Result<Option<RawCampaign>, GatewayError> {
        self.campaigns()
            .update(campaign)
            .await
            .map_err(|e| e.into_gateway("campaign", &campaign.id))
    }
}

#[async_trait]
impl SegmentRepository for Client {
    async fn list(&self) -> Result<Vec<Segment>, GatewayError> {
        Ok(self.segments().list().await?)
    }

    async fn get(&self, id: &EntityId) -> Result<Segment, GatewayError> {
        self.segments()
            .get(id.as_str())
            .await
            .map_err(|e| e.into_gateway("segment", id.as_str()))
    }

    async fn list_for_campaign(&self, campaign_id: &EntityId) -> Result<Vec<Segment>, GatewayError> {
        self.segments()
            .for_campaign(campaign_id.as_str())
            .await
            .map_err(|e| e.into_gateway("campaign", campaign_id.as_str()))
    }

    async fn create(&self, segment: &Segment) -> Result<Segment, GatewayError> {
        Ok(self.segments().create(segment).await?)
    }

    async fn save(&self, segment: &Segment) -> Result<(), GatewayError> {
        self.segments()
            .update(segment)
            .await
            .map_err(|e| e.into_gateway("segment", segment.id.as_str()))
    }

    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError> {
        self.segments()
            .delete(id.as_str())
            .await
            .map_err(|e| e.into_gateway("segment", id.as_str()))
    }
}

#[async_trait]
impl CatalogGateway for Client {
    async fn list_services(&self) -> Result<Vec<ServiceOffering>, GatewayError> {
        Ok(self.catalog().services().await?)
    }

    async fn list_clients(&self) -> Result<Vec<ContactRecord>, GatewayError> {
        Ok(self.catalog().clients().await?)
    }

    async fn list_leads(&self) -> Result<Vec<ContactRecord>, GatewayError> {
        Ok(self.catalog().leads().await?)
    }

    async fn generate_draft(&self, request: &DraftRequest) -> Result<DraftResponse, GatewayError> {
        Ok(self.campaigns().generate_draft(request).await?)
    }
}
