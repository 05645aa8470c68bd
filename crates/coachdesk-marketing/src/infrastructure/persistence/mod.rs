//! In-memory gateway implementations for tests and offline runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::dto::{
    ContactRecord, DraftRequest, DraftResponse, NewCampaign, RawCampaign, ServiceOffering,
};
use crate::domain::aggregates::Segment;
use crate::domain::value_objects::EntityId;
use crate::ports::outbound::{CampaignRepository, CatalogGateway, GatewayError, SegmentRepository};

/// Switch that makes the next write fail with a network error.
#[derive(Default)]
struct FailSwitch(AtomicBool);

impl FailSwitch {
    fn arm(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.0.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Network("connection reset".into()));
        }
        Ok(())
    }
}

/// In-memory campaign repository
#[derive(Default)]
pub struct InMemoryCampaignRepository {
    campaigns: DashMap<String, RawCampaign>,
    fail_next_write: FailSwitch,
    empty_save_response: AtomicBool,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, campaign: RawCampaign) {
        self.campaigns.insert(campaign.id.clone(), campaign);
    }

    pub fn stored(&self, id: &str) -> Option<RawCampaign> {
        self.campaigns.get(id).map(|c| c.value().clone())
    }

    pub fn fail_next_write(&self) {
        self.fail_next_write.arm();
    }

    /// Answer saves with an empty body, like backends that only send a status.
    pub fn respond_empty_on_save(&self) {
        self.empty_save_response.store(true, Ordering::SeqCst);
    }
}

/// Give every stage and email unit sent without an id a fresh one.
fn assign_missing_ids(campaign: &mut RawCampaign) {
    let stages = campaign.pipeline.iter_mut().flat_map(|p| p.stages.iter_mut().flatten());
    for stage in stages {
        stage.id.get_or_insert_with(|| EntityId::new().to_string());
        for email in &mut stage.emails {
            email.id.get_or_insert_with(|| EntityId::new().to_string());
        }
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn fetch(&self, id: &EntityId) -> Result<RawCampaign, GatewayError> {
        self.campaigns
            .get(id.as_str())
            .map(|c| c.value().clone())
            .ok_or_else(|| GatewayError::NotFound { entity: "campaign", id: id.to_string() })
    }

    async fn create(&self, campaign: &NewCampaign) -> Result<RawCampaign, GatewayError> {
        self.fail_next_write.check()?;
        let raw = RawCampaign {
            id: EntityId::new().to_string(),
            name: campaign.name.clone(),
            description: campaign.description.clone(),
            tags: campaign.tags.clone(),
            status: campaign.status,
            created_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        self.insert(raw.clone());
        Ok(raw)
    }

    async fn save(&self, campaign: &RawCampaign) -> Result<Option<RawCampaign>, GatewayError> {
        self.fail_next_write.check()?;
        if !self.campaigns.contains_key(&campaign.id) {
            return Err(GatewayError::NotFound { entity: "campaign", id: campaign.id.clone() });
        }
        let mut stored = campaign.clone();
        assign_missing_ids(&mut stored);
        self.insert(stored.clone());
        if self.empty_save_response.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(stored))
    }
}

/// In-memory segment repository
#[derive(Default)]
pub struct InMemorySegmentRepository {
    segments: DashMap<String, Segment>,
    fail_next_write: FailSwitch,
}

impl InMemorySegmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, segment: Segment) {
        self.segments.insert(segment.id.to_string(), segment);
    }

    pub fn stored(&self, id: &str) -> Option<Segment> {
        self.segments.get(id).map(|s| s.value().clone())
    }

    pub fn fail_next_write(&self) {
        self.fail_next_write.arm();
    }

    fn not_found(id: &EntityId) -> GatewayError {
        GatewayError::NotFound { entity: "segment", id: id.to_string() }
    }
}

#[async_trait]
impl SegmentRepository for InMemorySegmentRepository {
    async fn list(&self) -> Result<Vec<Segment>, GatewayError> {
        let mut segments: Vec<Segment> = self.segments.iter().map(|s| s.value().clone()).collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(segments)
    }

    async fn get(&self, id: &EntityId) -> Result<Segment, GatewayError> {
        self.segments
            .get(id.as_str())
            .map(|s| s.value().clone())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn list_for_campaign(&self, campaign_id: &EntityId) -> Result<Vec<Segment>, GatewayError> {
        let mut segments: Vec<Segment> = self
            .segments
            .iter()
            .filter(|s| s.campaign_id.as_ref() == Some(campaign_id))
            .map(|s| s.value().clone())
            .collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(segments)
    }

    async fn create(&self, segment: &Segment) -> Result<Segment, GatewayError> {
        self.fail_next_write.check()?;
        let mut created = segment.clone();
        created.id = EntityId::new();
        self.insert(created.clone());
        Ok(created)
    }

    async fn save(&self, segment: &Segment) -> Result<(), GatewayError> {
        self.fail_next_write.check()?;
        if !self.segments.contains_key(segment.id.as_str()) {
            return Err(Self::not_found(&segment.id));
        }
        self.insert(segment.clone());
        Ok(())
    }

    async fn delete(&self, id: &EntityId) -> Result<(), GatewayError> {
        self.fail_next_write.check()?;
        self.segments
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}

/// In-memory catalog with a canned draft generator
#[derive(Default)]
pub struct InMemoryCatalog {
    services: RwLock<Vec<ServiceOffering>>,
    clients: RwLock<Vec<ContactRecord>>,
    leads: RwLock<Vec<ContactRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(self, services: Vec<ServiceOffering>) -> Self {
        Self { services: RwLock::new(services), ..self }
    }

    pub fn with_contacts(self, clients: Vec<ContactRecord>, leads: Vec<ContactRecord>) -> Self {
        Self {
            clients: RwLock::new(clients),
            leads: RwLock::new(leads),
            ..self
        }
    }
}

fn read<T: Clone>(lock: &RwLock<Vec<T>>) -> Result<Vec<T>, GatewayError> {
    lock.read()
        .map(|items| items.clone())
        .map_err(|_| GatewayError::Network("catalog lock poisoned".into()))
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn list_services(&self) -> Result<Vec<ServiceOffering>, GatewayError> {
        read(&self.services)
    }

    async fn list_clients(&self) -> Result<Vec<ContactRecord>, GatewayError> {
        read(&self.clients)
    }

    async fn list_leads(&self) -> Result<Vec<ContactRecord>, GatewayError> {
        read(&self.leads)
    }

    async fn generate_draft(&self, request: &DraftRequest) -> Result<DraftResponse, GatewayError> {
        Ok(DraftResponse {
            content: format!(
                "Hola {{{{nombre}}}}, hoy hablamos de {} en tono {}. {}",
                request.topic, request.tone, request.instructions
            ),
        })
    }
}
