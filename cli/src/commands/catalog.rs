//! Service catalog and AI draft commands

use tabled::Tabled;

use coachdesk_marketing::{CampaignUseCases, DraftRequest, ServiceOffering};

use super::{describe, Context};
use crate::output::{self, OutputFormat};
use crate::{DraftCommands, ServiceCommands};

#[derive(Tabled)]
struct ServiceRow {
    id: String,
    name: String,
    price: String,
}

impl From<&ServiceOffering> for ServiceRow {
    fn from(service: &ServiceOffering) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            price: service
                .price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into()),
        }
    }
}

pub async fn services(action: ServiceCommands, ctx: &Context) -> Result<(), String> {
    match action {
        ServiceCommands::List => {
            let services = ctx.campaigns.list_services().await.map_err(describe)?;
            let rows = services.iter().map(ServiceRow::from).collect();
            ctx.format.print_rows(&services, rows)?;
        }
    }
    Ok(())
}

pub async fn draft(action: DraftCommands, ctx: &Context) -> Result<(), String> {
    match action {
        DraftCommands::Generate { topic, tone, instructions } => {
            let content = ctx
                .campaigns
                .generate_draft(DraftRequest { topic, tone, instructions })
                .await
                .map_err(describe)?;
            match ctx.format {
                OutputFormat::Table => {
                    output::heading("Draft");
                    println!("{}", content);
                }
                format => format.print(&serde_json::json!({ "content": content }))?,
            }
        }
    }
    Ok(())
}
