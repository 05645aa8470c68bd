//! Segment commands

use std::collections::HashMap;

use serde::Serialize;
use tabled::Tabled;

use coachdesk_marketing::{
    Contact, CreateSegmentCommand, EntityId, MembershipSession, PipelineEditor, Pool, Segment,
    SegmentUseCases, StageCount,
};

use super::{describe, Context};
use crate::output::{self, optional};
use crate::SegmentCommands;

#[derive(Tabled)]
struct SegmentRow {
    id: String,
    name: String,
    campaign: String,
    clients: usize,
    leads: usize,
    variables: String,
}

impl From<&Segment> for SegmentRow {
    fn from(segment: &Segment) -> Self {
        let mut variables: Vec<&str> = segment
            .variables
            .iter()
            .flat_map(|vars| vars.keys().map(String::as_str))
            .collect();
        variables.sort_unstable();
        Self {
            id: segment.id.to_string(),
            name: segment.name.clone(),
            campaign: optional(segment.campaign_id.as_ref().map(EntityId::as_str)),
            clients: segment.clients.len(),
            leads: segment.leads.len(),
            variables: variables.join(", "),
        }
    }
}

#[derive(Clone, Tabled, Serialize)]
struct MemberRow {
    id: String,
    email: String,
    name: String,
    kind: String,
    stage: String,
}

impl MemberRow {
    fn new(contact: &Contact, segment: &Segment) -> Self {
        Self {
            id: contact.id.to_string(),
            email: contact.email.as_str().to_string(),
            name: optional(contact.display_name.as_deref()),
            kind: contact.kind.to_string(),
            stage: optional(segment.stage_of(&contact.id).map(|s| s.name.as_str())),
        }
    }
}

#[derive(Tabled)]
struct StageCountRow {
    #[tabled(rename = "#")]
    order: u32,
    stage: String,
    clients: usize,
    leads: usize,
}

impl From<&StageCount> for StageCountRow {
    fn from(count: &StageCount) -> Self {
        Self {
            order: count.order,
            stage: count.name.clone(),
            clients: count.clients,
            leads: count.leads,
        }
    }
}

#[derive(Serialize)]
struct MembershipReport<'a> {
    segment: &'a Segment,
    members: Vec<MemberRow>,
    stages: Vec<StageCount>,
    others: usize,
}

pub async fn handle(action: SegmentCommands, ctx: &Context) -> Result<(), String> {
    match action {
        SegmentCommands::List { campaign } => {
            let segments = match campaign {
                Some(campaign) => ctx.segments.segments_for_campaign(&EntityId::from(campaign.as_str())).await,
                None => ctx.segments.list_segments().await,
            }
            .map_err(describe)?;
            let rows = segments.iter().map(SegmentRow::from).collect();
            ctx.format.print_rows(&segments, rows)?;
        }
        SegmentCommands::Show { id, campaign } => {
            let session = open(ctx, &id, campaign).await?;
            let segment = session.segment();
            let report = MembershipReport {
                segment,
                members: session.pipeline_pool().map(|c| MemberRow::new(c, segment)).collect(),
                stages: session.stage_counts(),
                others: session.other_pool().len(),
            };

            if ctx.format == output::OutputFormat::Table {
                output::heading(&format!("{} ({})", segment.name, segment.id));
                if !report.stages.is_empty() {
                    let rows: Vec<StageCountRow> = report.stages.iter().map(StageCountRow::from).collect();
                    ctx.format.print_rows(&report.stages, rows)?;
                }
                println!("{} contact(s) outside the segment", report.others);
                ctx.format.print_rows(&report.members, report.members.clone())?;
            } else {
                ctx.format.print(&report)?;
            }
        }
        SegmentCommands::Create { name, description, campaign, variables } => {
            let variables = parse_variables(&variables)?;
            let segment = ctx
                .segments
                .create_segment(CreateSegmentCommand {
                    name,
                    description,
                    campaign_id: campaign,
                    variables,
                })
                .await
                .map_err(describe)?;
            output::success(&format!("Created segment: {}", segment.id));
        }
        SegmentCommands::Delete { id } => {
            ctx.segments
                .delete_segment(&EntityId::from(id.as_str()))
                .await
                .map_err(describe)?;
            output::success(&format!("Deleted segment {}", id));
        }
        SegmentCommands::MoveIn { id, contacts } => {
            let mut session = open(ctx, &id, None).await?;
            select(&mut session, &contacts, Pool::Other)?;
            let moved = ctx
                .segments
                .move_selected_in(&mut session)
                .await
                .map_err(describe)?;
            output::success(&format!("Moved {} contact(s) into {}", moved.len(), session.segment().name));
        }
        SegmentCommands::MoveOut { id, contacts } => {
            let mut session = open(ctx, &id, None).await?;
            select(&mut session, &contacts, Pool::Pipeline)?;
            let moved = ctx
                .segments
                .move_selected_out(&mut session)
                .await
                .map_err(describe)?;
            output::success(&format!("Moved {} contact(s) out of {}", moved.len(), session.segment().name));
        }
        SegmentCommands::Assign { id, contact, stage, campaign } => {
            let mut session = open(ctx, &id, campaign).await?;
            ctx.segments
                .assign_to_stage(
                    &mut session,
                    &EntityId::from(contact.as_str()),
                    &EntityId::from(stage.as_str()),
                )
                .await
                .map_err(describe)?;
            output::success(&format!("Assigned {} to stage {}", contact, stage));
        }
        SegmentCommands::Unassign { id, contact } => {
            let mut session = open(ctx, &id, None).await?;
            let removed = ctx
                .segments
                .unassign(&mut session, &EntityId::from(contact.as_str()))
                .await
                .map_err(describe)?;
            if removed {
                output::success(&format!("Removed {} from its stage", contact));
            } else {
                println!("{} was not assigned to a stage", contact);
            }
        }
    }
    Ok(())
}

/// Open the membership editor. The stage snapshot comes from `campaign`, or
/// from the segment's own campaign when the flag is absent.
async fn open(ctx: &Context, segment_id: &str, campaign: Option<String>) -> Result<MembershipSession, String> {
    let segment_id = EntityId::from(segment_id);
    let campaign = match campaign {
        Some(campaign) => Some(EntityId::from(campaign.as_str())),
        None => ctx
            .segments
            .get_segment(&segment_id)
            .await
            .map_err(describe)?
            .campaign_id,
    };

    let editor: Option<PipelineEditor> = match campaign {
        Some(campaign) => Some(ctx.editor(campaign.as_str()).await?),
        None => None,
    };

    ctx.segments
        .open_membership(&segment_id, editor.as_ref().map(|e| e.pipeline()))
        .await
        .map_err(describe)
}

fn select(session: &mut MembershipSession, contacts: &[String], expected: Pool) -> Result<(), String> {
    for contact in contacts {
        let id = EntityId::from(contact.as_str());
        match session.pool_of(&id) {
            Some(pool) if pool == expected => {
                if !session.is_selected(&id) {
                    session.toggle_selection(&id).map_err(describe)?;
                }
            }
            Some(Pool::Pipeline) => return Err(format!("{} is already in the segment", contact)),
            Some(Pool::Other) => return Err(format!("{} is not in the segment", contact)),
            None => return Err(format!("unknown contact: {}", contact)),
        }
    }
    Ok(())
}

/// Parse `key=value` pairs; values that are valid JSON keep their type.
fn parse_variables(pairs: &[String]) -> Result<HashMap<String, serde_json::Value>, String> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            Ok((key.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables(&["nombre=Ana".into(), "edad=31".into()]).unwrap();
        assert_eq!(vars["nombre"], json!("Ana"));
        assert_eq!(vars["edad"], json!(31));
        assert!(parse_variables(&["nombre".into()]).is_err());
    }
}
