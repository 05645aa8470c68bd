//! CLI Commands

pub mod campaign;
pub mod catalog;
pub mod config;
pub mod email;
pub mod segment;
pub mod stage;

use std::sync::Arc;

use coachdesk_marketing::{
    CampaignService, CampaignUseCases, EntityId, MarketingError, PipelineEditor, SegmentService,
};
use coachdesk_sdk::{Client, ClientConfig, FileTokenStore, StaticToken, TokenSource, DEFAULT_BASE_URL};

use crate::config::Config;
use crate::output::OutputFormat;

/// Everything a backend-facing command needs.
pub struct Context {
    pub campaigns: CampaignService,
    pub segments: SegmentService,
    pub format: OutputFormat,
}

impl Context {
    /// Flags win over the profile's config file. Without a `--token` the
    /// config file is consulted on every request.
    pub fn build(
        api_url: Option<String>,
        token: Option<String>,
        format: Option<OutputFormat>,
        profile: Option<&str>,
    ) -> Result<Self, String> {
        let config = Config::load(profile)?;

        let base_url = api_url
            .or(config.api_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let token: Arc<dyn TokenSource> = match token {
            Some(token) => Arc::new(StaticToken::new(token)),
            None => Arc::new(FileTokenStore::new(Config::config_path(profile)?)),
        };
        let format = format
            .or_else(|| config.default_format.as_deref().and_then(OutputFormat::parse))
            .unwrap_or_default();

        let client = Client::with_config(
            ClientConfig { base_url, ..Default::default() },
            token,
        )
        .map_err(|e| e.to_string())?;
        let backend = Arc::new(client);

        Ok(Self {
            campaigns: CampaignService::new(backend.clone(), backend.clone(), backend.clone()),
            segments: SegmentService::new(backend.clone(), backend),
            format,
        })
    }

    /// Load a campaign into a fresh editor.
    pub async fn editor(&self, campaign_id: &str) -> Result<PipelineEditor, String> {
        let campaign = self
            .campaigns
            .load_campaign(&EntityId::from(campaign_id))
            .await
            .map_err(describe)?;
        Ok(PipelineEditor::new(campaign))
    }
}

/// Render an engine error for the terminal.
pub fn describe(err: MarketingError) -> String {
    match &err {
        MarketingError::Auth(_) => format!(
            "{} (set a token with `coachdesk config set token <TOKEN>` or --token)",
            err
        ),
        _ => err.to_string(),
    }
}
