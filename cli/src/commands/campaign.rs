//! Campaign commands

use serde::Serialize;
use tabled::Tabled;

use coachdesk_marketing::{
    CampaignUseCases, CampaignView, FunnelPercentages, NewCampaign, StageBreakdown, StageView,
    StatisticsAggregator,
};

use super::{describe, Context};
use crate::output::{self, optional, percent};
use crate::CampaignCommands;

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "#")]
    order: u32,
    id: String,
    name: String,
    contacts: u64,
    emails: usize,
    #[tabled(rename = "%")]
    percentage: String,
    service: String,
    gated: bool,
}

impl From<&StageView> for StageRow {
    fn from(stage: &StageView) -> Self {
        let name = if stage.synthetic {
            format!("{} (derived)", stage.name)
        } else {
            stage.name.clone()
        };
        Self {
            order: stage.order,
            id: stage.id.clone(),
            name,
            contacts: stage.contacts,
            emails: stage.emails,
            percentage: percent(stage.percentage),
            service: optional(stage.service_id.as_deref()),
            gated: stage.requires_purchase,
        }
    }
}

#[derive(Tabled)]
struct FunnelRow {
    scope: String,
    sent: String,
    received: String,
    opened: String,
    clicked: String,
    converted: String,
}

impl FunnelRow {
    fn new(scope: impl Into<String>, funnel: &FunnelPercentages) -> Self {
        Self {
            scope: scope.into(),
            sent: percent(funnel.sent),
            received: percent(funnel.received),
            opened: percent(funnel.opened),
            clicked: percent(funnel.clicked),
            converted: percent(funnel.converted),
        }
    }
}

#[derive(Serialize)]
struct StatsReport {
    campaign: FunnelPercentages,
    stages: Vec<StageBreakdown>,
}

pub async fn handle(action: CampaignCommands, ctx: &Context) -> Result<(), String> {
    match action {
        CampaignCommands::Show { id } => {
            let editor = ctx.editor(&id).await?;
            let view = CampaignView::from(editor.campaign());
            if ctx.format == output::OutputFormat::Table {
                output::heading(&format!("{} [{}] ({})", view.name, view.status, view.id));
                if !view.tags.is_empty() {
                    println!("tags: {}", view.tags.join(", "));
                }
                let segments = view.segments.join(", ");
                println!("segments: {}", optional(Some(segments.as_str()).filter(|s| !s.is_empty())));
                println!(
                    "sent {} | received {} | opened {} | clicked {} | converted {}",
                    view.stats.sent,
                    view.stats.received,
                    view.stats.opened,
                    view.stats.clicked,
                    view.stats.converted
                );
            }
            let rows = view.stages.iter().map(StageRow::from).collect();
            ctx.format.print_rows(&view, rows)?;
        }
        CampaignCommands::Stats { id } => {
            let editor = ctx.editor(&id).await?;
            let campaign = editor.campaign();
            let report = StatsReport {
                campaign: StatisticsAggregator::campaign_breakdown(campaign),
                stages: StatisticsAggregator::stage_breakdowns(campaign),
            };

            let mut rows = vec![FunnelRow::new("campaign", &report.campaign)];
            rows.extend(
                report
                    .stages
                    .iter()
                    .map(|stage| FunnelRow::new(stage.name.clone(), &stage.funnel)),
            );
            ctx.format.print_rows(&report, rows)?;
        }
        CampaignCommands::Refresh { id } => {
            let mut editor = ctx.editor(&id).await?;
            let changed = ctx
                .campaigns
                .refresh_statuses(&mut editor)
                .await
                .map_err(describe)?;
            output::success(&format!("{} email status(es) advanced", changed));
        }
        CampaignCommands::Create { name, description, tags } => {
            let campaign = ctx
                .campaigns
                .create_campaign(NewCampaign {
                    name,
                    description,
                    tags,
                    status: Default::default(),
                })
                .await
                .map_err(describe)?;
            output::success(&format!("Created campaign: {}", campaign.id()));
        }
    }
    Ok(())
}
