//! Email unit commands

use coachdesk_marketing::{CampaignUseCases, EmailDraft, EntityId, PersonalizationResolver};

use super::{describe, Context};
use crate::output;
use crate::EmailCommands;

pub async fn handle(action: EmailCommands, ctx: &Context) -> Result<(), String> {
    match action {
        EmailCommands::Add { campaign, stage, subject, body, variables } => {
            let mut editor = ctx.editor(&campaign).await?;
            let segments = editor.campaign().segments().to_vec();

            let mut draft = EmailDraft::new(subject, body.clone());
            // tokens already typed into the body must be backed by every segment too
            for name in PersonalizationResolver::referenced(&body) {
                let variable =
                    PersonalizationResolver::ensure_available(&name, &segments).map_err(describe)?;
                if !draft.variables.contains(&variable) {
                    draft.variables.push(variable);
                }
            }
            for name in &variables {
                editor.insert_variable(&mut draft, name).map_err(describe)?;
            }

            let email_id = ctx
                .campaigns
                .add_email_unit(&mut editor, &EntityId::from(stage.as_str()), draft)
                .await
                .map_err(describe)?;
            output::success(&format!("Added email {} to stage {}", email_id, stage));
        }
        EmailCommands::Remove { campaign, stage, email } => {
            let mut editor = ctx.editor(&campaign).await?;
            ctx.campaigns
                .remove_email_unit(
                    &mut editor,
                    &EntityId::from(stage.as_str()),
                    &EntityId::from(email.as_str()),
                )
                .await
                .map_err(describe)?;
            output::success(&format!("Removed email {} from stage {}", email, stage));
        }
    }
    Ok(())
}
