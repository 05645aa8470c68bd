//! Stage commands
//!
//! Structural edits run inside a customizing session that is committed in
//! the same invocation.

use coachdesk_marketing::{CampaignUseCases, EntityId, PipelineEditor};

use super::{describe, Context};
use crate::output;
use crate::StageCommands;

pub async fn handle(action: StageCommands, ctx: &Context) -> Result<(), String> {
    match action {
        StageCommands::Insert { campaign, at, name } => {
            let mut editor = ctx.editor(&campaign).await?;
            let stage = customize(ctx, &mut editor, |e| {
                e.insert_stage(at, &name).map(|stage| stage.name().to_string())
            })
            .await?;
            output::success(&format!("Inserted stage '{}' at position {}", stage, at));
        }
        StageCommands::Rename { campaign, stage, name } => {
            let mut editor = ctx.editor(&campaign).await?;
            ctx.campaigns
                .rename_stage(&mut editor, &EntityId::from(stage.as_str()), &name)
                .await
                .map_err(describe)?;
            output::success(&format!("Renamed stage {}", stage));
        }
        StageCommands::Remove { campaign, stage } => {
            let mut editor = ctx.editor(&campaign).await?;
            let removed = customize(ctx, &mut editor, |e| {
                e.remove_stage(&EntityId::from(stage.as_str()))
            })
            .await?;
            output::success(&format!("Removed stage '{}'", removed.name()));
        }
        StageCommands::Move { campaign, stage, to } => {
            let mut editor = ctx.editor(&campaign).await?;
            customize(ctx, &mut editor, |e| e.move_stage(&EntityId::from(stage.as_str()), to)).await?;
            output::success(&format!("Moved stage {} to position {}", stage, to));
        }
        StageCommands::Service { campaign, stage, service, clear: _ } => {
            let mut editor = ctx.editor(&campaign).await?;
            ctx.campaigns
                .set_stage_service(&mut editor, &EntityId::from(stage.as_str()), service.as_deref())
                .await
                .map_err(describe)?;
            match service {
                Some(service) => output::success(&format!("Linked service {} to stage {}", service, stage)),
                None => output::success(&format!("Cleared service of stage {}", stage)),
            }
        }
        StageCommands::Gate { campaign, stage, required } => {
            let mut editor = ctx.editor(&campaign).await?;
            ctx.campaigns
                .set_requires_purchase(&mut editor, &EntityId::from(stage.as_str()), required)
                .await
                .map_err(describe)?;
            let state = if required { "now requires" } else { "no longer requires" };
            output::success(&format!("Stage {} {} a purchase to advance", stage, state));
        }
    }
    Ok(())
}

/// Apply a structural edit in a customizing session and commit it. The
/// session is cancelled when the edit is rejected.
async fn customize<T, F>(ctx: &Context, editor: &mut PipelineEditor, edit: F) -> Result<T, String>
where
    F: FnOnce(&mut PipelineEditor) -> coachdesk_marketing::Result<T>,
{
    editor.begin_customizing();
    let value = match edit(editor) {
        Ok(value) => value,
        Err(e) => {
            editor.cancel_customizing().map_err(describe)?;
            return Err(describe(e));
        }
    };
    ctx.campaigns
        .commit_customizing(editor)
        .await
        .map_err(describe)?;
    Ok(value)
}
