//! Pipeline editor
//!
//! The mutation surface of a campaign's pipeline. Structural edits (insert,
//! remove, move) are only accepted in customizing mode; entering that mode
//! snapshots the stage list so the whole session can be rolled back.
//!
//! Email units are authored from separate dialogs and are not covered by the
//! snapshot: they are saved as soon as they change, and a cancelled session
//! keeps the email edits of every stage that survives the rollback.

use std::collections::HashMap;

use crate::domain::aggregates::{Campaign, EmailUnit, Pipeline, PipelineStage};
use crate::domain::events::{CampaignEvent, DomainEvent};
use crate::domain::services::personalization::{EmailDraft, PersonalizationResolver};
use crate::domain::value_objects::EntityId;
use crate::{MarketingError, Result};

#[derive(Clone, Debug)]
struct EditSession {
    snapshot: Pipeline,
    events_mark: usize,
}

#[derive(Clone, Debug)]
pub struct PipelineEditor {
    campaign: Campaign,
    session: Option<EditSession>,
}

impl PipelineEditor {
    pub fn new(campaign: Campaign) -> Self {
        Self { campaign, session: None }
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn into_campaign(self) -> Campaign {
        self.campaign
    }

    pub fn pipeline(&self) -> &Pipeline {
        self.campaign.pipeline()
    }

    /// Apply email statuses from a freshly fetched copy of the campaign.
    pub fn merge_remote_statuses(&mut self, remote: &Campaign) -> usize {
        self.campaign.merge_remote_statuses(remote)
    }

    pub fn is_customizing(&self) -> bool {
        self.session.is_some()
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        if let Some(session) = self.session.as_mut() {
            session.events_mark = 0;
        }
        self.campaign.take_events()
    }

    /// Drain the events covered by a save of `persisted_view`. Inside a
    /// customizing session only email events are drained; stage events wait
    /// for the session to be committed or cancelled.
    pub fn take_persisted_events(&mut self) -> Vec<DomainEvent> {
        let Some(session) = self.session.as_mut() else {
            return self.campaign.take_events();
        };
        let (drained, before_mark) = self.campaign.drain_events(is_email_event, session.events_mark);
        session.events_mark -= before_mark;
        drained
    }

    /// The campaign as it should be stored right now. During a customizing
    /// session that is the layout from before the session, carrying the
    /// current email units of every stage it shares with the live layout.
    pub fn persisted_view(&self) -> Campaign {
        let mut view = self.campaign.clone();
        if let Some(session) = &self.session {
            view.replace_pipeline(with_current_emails(session.snapshot.clone(), self.campaign.pipeline()));
        }
        view
    }

    /// Adopt the ids the backend assigned to stages and email units that were
    /// created locally. Returns how many were swapped in the live layout.
    pub fn adopt_ids(&mut self, assigned: &HashMap<EntityId, EntityId>) -> usize {
        if let Some(session) = self.session.as_mut() {
            session.snapshot.apply_ids(assigned);
        }
        self.campaign.apply_ids(assigned)
    }

    // =========================================================================
    // Customizing mode
    // =========================================================================
    // Customizing mode
    // =========================================================================

    /// Enter customizing mode. Re-entering keeps the original snapshot.
    pub fn begin_customizing(&mut self) {
        if self.session.is_some() {
            return;
        }
        tracing::debug!(campaign = %self.campaign.id(), "entering customizing mode");
        self.session = Some(EditSession {
            snapshot: self.campaign.pipeline().clone(),
            events_mark: self.campaign.pending_events().len(),
        });
    }

    /// Discard every stage-level edit made since `begin_customizing`.
    pub fn cancel_customizing(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(MarketingError::NotEditing)?;

        let restored = with_current_emails(session.snapshot, self.campaign.pipeline());
        self.campaign.replace_pipeline(restored);

        let discarded = self
            .campaign
            .discard_events_since(session.events_mark, is_email_event);
        tracing::debug!(campaign = %self.campaign.id(), discarded, "customizing cancelled");

        let campaign_id = self.campaign.id().clone();
        self.campaign.raise_event(DomainEvent::Campaign(CampaignEvent::CustomizingCancelled {
            campaign_id,
            discarded_events: discarded,
        }));
        Ok(())
    }

    /// Leave customizing mode keeping the edits.
    pub fn finish_customizing(&mut self) -> Result<()> {
        self.session.take().ok_or(MarketingError::NotEditing)?;
        tracing::debug!(campaign = %self.campaign.id(), "customizing finished");
        Ok(())
    }

    // =========================================================================
    // Stage operations
    // =========================================================================

    /// Insert a new empty stage at `at` (0..=len).
    pub fn insert_stage(&mut self, at: usize, name: &str) -> Result<&PipelineStage> {
        self.require_customizing()?;
        let name = valid_name(name)?;

        let stage = PipelineStage::new(name);
        let stage_id = stage.id().clone();
        self.campaign.pipeline_mut().insert(at, stage)?;
        self.campaign.refresh_percentages();
        self.raise(|campaign_id| CampaignEvent::StageInserted {
            campaign_id,
            stage_id: stage_id.clone(),
            order: at as u32,
        });

        self.campaign
            .pipeline()
            .get(&stage_id)
            .ok_or_else(|| MarketingError::not_found("stage", &stage_id))
    }

    pub fn remove_stage(&mut self, stage_id: &EntityId) -> Result<PipelineStage> {
        self.require_customizing()?;
        let removed = self.campaign.pipeline_mut().remove(stage_id)?;
        self.raise(|campaign_id| CampaignEvent::StageRemoved {
            campaign_id,
            stage_id: stage_id.clone(),
        });
        Ok(removed)
    }

    /// Move a stage to position `to` (0..len).
    pub fn move_stage(&mut self, stage_id: &EntityId, to: usize) -> Result<()> {
        self.require_customizing()?;
        let from = self
            .campaign
            .pipeline()
            .position(stage_id)
            .ok_or_else(|| MarketingError::not_found("stage", stage_id))?;
        if from == to {
            return Ok(());
        }
        self.campaign.pipeline_mut().move_to(stage_id, to)?;
        self.raise(|campaign_id| CampaignEvent::StageMoved {
            campaign_id,
            stage_id: stage_id.clone(),
            from: from as u32,
            to: to as u32,
        });
        Ok(())
    }

    pub fn rename_stage(&mut self, stage_id: &EntityId, name: &str) -> Result<()> {
        let name = valid_name(name)?;
        let stage = self.campaign.pipeline_mut().get_mut(stage_id)?;
        if stage.name() == name {
            return Ok(());
        }
        stage.rename(name.clone());
        self.raise(|campaign_id| CampaignEvent::StageRenamed {
            campaign_id,
            stage_id: stage_id.clone(),
            name,
        });
        Ok(())
    }

    /// Link a purchasable service to a stage, or clear it with `None`.
    /// Clearing also drops the purchase gate.
    pub fn set_stage_service(&mut self, stage_id: &EntityId, service_id: Option<&str>) -> Result<()> {
        let service_id = service_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let stage = self.campaign.pipeline_mut().get_mut(stage_id)?;
        stage.set_service(service_id.clone());
        let requires_purchase = stage.requires_purchase_to_advance();

        self.raise(|campaign_id| CampaignEvent::StageServiceChanged {
            campaign_id,
            stage_id: stage_id.clone(),
            service_id,
            requires_purchase,
        });
        Ok(())
    }

    /// Toggle the purchase gate. Gating a stage with no linked service is
    /// rejected.
    pub fn set_requires_purchase(&mut self, stage_id: &EntityId, required: bool) -> Result<()> {
        let stage = self.campaign.pipeline_mut().get_mut(stage_id)?;
        if required && stage.linked_service_id().is_none() {
            return Err(MarketingError::Validation(format!(
                "stage '{}' has no linked service to require",
                stage.name()
            )));
        }
        if stage.requires_purchase_to_advance() == required {
            return Ok(());
        }
        stage.set_requires_purchase(required);
        let service_id = stage.linked_service_id().map(String::from);

        self.raise(|campaign_id| CampaignEvent::StageServiceChanged {
            campaign_id,
            stage_id: stage_id.clone(),
            service_id,
            requires_purchase: required,
        });
        Ok(())
    }

    // =========================================================================
    // Email units
    // =========================================================================

    /// Insert a personalization token into a draft, checking it against the
    /// segments attached to this campaign.
    pub fn insert_variable(&self, draft: &mut EmailDraft, name: &str) -> Result<()> {
        draft.insert_variable(name, self.campaign.segments())
    }

    /// Append a draft email unit to a stage. Every variable must be declared
    /// by every attached segment; on failure the stage is left untouched.
    pub fn add_email_unit(&mut self, stage_id: &EntityId, draft: EmailDraft) -> Result<EntityId> {
        let stage = self
            .campaign
            .pipeline()
            .get(stage_id)
            .ok_or_else(|| MarketingError::not_found("stage", stage_id))?;
        if stage.is_synthetic() {
            return Err(synthetic_stage(stage));
        }
        PersonalizationResolver::ensure_all_available(&draft.variables, self.campaign.segments())?;

        let unit = EmailUnit::draft(draft.subject, draft.body, draft.variables);
        let email_id = unit.id().clone();
        self.campaign.pipeline_mut().get_mut(stage_id)?.push_email(unit);
        self.campaign.refresh_percentages();

        self.raise(|campaign_id| CampaignEvent::EmailUnitAdded {
            campaign_id,
            stage_id: stage_id.clone(),
            email_id: email_id.clone(),
        });
        Ok(email_id)
    }

    pub fn remove_email_unit(&mut self, stage_id: &EntityId, email_id: &EntityId) -> Result<EmailUnit> {
        let stage = self.campaign.pipeline_mut().get_mut(stage_id)?;
        if stage.is_synthetic() {
            return Err(synthetic_stage(stage));
        }
        let removed = stage
            .remove_email(email_id)
            .ok_or_else(|| MarketingError::not_found("email", email_id))?;
        self.campaign.refresh_percentages();

        self.raise(|campaign_id| CampaignEvent::EmailUnitRemoved {
            campaign_id,
            stage_id: stage_id.clone(),
            email_id: email_id.clone(),
        });
        Ok(removed)
    }

    fn require_customizing(&self) -> Result<()> {
        if self.session.is_none() {
            return Err(MarketingError::NotEditing);
        }
        Ok(())
    }

    fn raise(&mut self, event: impl FnOnce(EntityId) -> CampaignEvent) {
        let event = event(self.campaign.id().clone());
        self.campaign.raise_event(DomainEvent::Campaign(event));
        self.campaign.touch();
    }
}

fn valid_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MarketingError::Validation("stage name cannot be empty".into()));
    }
    Ok(name.to_string())
}

fn synthetic_stage(stage: &PipelineStage) -> MarketingError {
    MarketingError::Validation(format!(
        "stage '{}' is derived from campaign statistics and has no editable emails",
        stage.name()
    ))
}

fn with_current_emails(mut layout: Pipeline, current: &Pipeline) -> Pipeline {
    for stage in layout.stages_mut() {
        if let Some(live) = current.get(stage.id()) {
            stage.set_emails(live.emails().to_vec());
        }
    }
    layout
}

fn is_email_event(event: &DomainEvent) -> bool {
    matches!(
        event,
        DomainEvent::Campaign(
            CampaignEvent::EmailUnitAdded { .. } | CampaignEvent::EmailUnitRemoved { .. }
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CampaignParts, CampaignStats, Segment};
    use crate::domain::value_objects::PersonalizationVariable;
    use proptest::prelude::*;
    use serde_json::json;

    fn stage(id: &str, name: &str, order: u32) -> PipelineStage {
        PipelineStage::restore(EntityId::from(id), name.into(), order, 0, vec![], None, false)
    }

    fn editor_with(names: &[&str]) -> PipelineEditor {
        let stages = names
            .iter()
            .enumerate()
            .map(|(i, n)| stage(&n.to_lowercase(), n, i as u32))
            .collect();
        PipelineEditor::new(Campaign::restore(CampaignParts {
            id: EntityId::from("camp"),
            name: "Reto".into(),
            pipeline: Pipeline::from_stages(stages),
            ..Default::default()
        }))
    }

    fn layout(editor: &PipelineEditor) -> Vec<(String, String, u32)> {
        editor
            .pipeline()
            .stages()
            .iter()
            .map(|s| (s.id().to_string(), s.name().to_string(), s.order()))
            .collect()
    }

    fn names(editor: &PipelineEditor) -> Vec<(&str, u32)> {
        editor.pipeline().stages().iter().map(|s| (s.name(), s.order())).collect()
    }

    fn draft_with(vars: &[&str]) -> EmailDraft {
        let mut draft = EmailDraft::new("Hola", "Cuerpo");
        draft.variables = vars
            .iter()
            .filter_map(|v| PersonalizationVariable::from_catalog(v))
            .collect();
        draft
    }

    #[test]
    fn test_insert_requires_customizing() {
        let mut editor = editor_with(&["A", "B"]);
        assert_eq!(editor.insert_stage(0, "X").unwrap_err(), MarketingError::NotEditing);
        assert_eq!(editor.remove_stage(&EntityId::from("a")).unwrap_err(), MarketingError::NotEditing);
        assert_eq!(editor.move_stage(&EntityId::from("a"), 1).unwrap_err(), MarketingError::NotEditing);
        assert_eq!(editor.pipeline().len(), 2);
    }

    #[test]
    fn test_insert_at_index_one() {
        let mut editor = editor_with(&["A", "B", "C"]);
        editor.begin_customizing();
        let inserted = editor.insert_stage(1, "New").unwrap();
        assert!(inserted.id().is_temporary());
        assert_eq!(inserted.contact_count(), 0);
        assert_eq!(inserted.percentage(), 0.0);
        assert_eq!(names(&editor), vec![("A", 0), ("New", 1), ("B", 2), ("C", 3)]);
    }

    #[test]
    fn test_rename_validation() {
        let mut editor = editor_with(&["A"]);
        let a = EntityId::from("a");
        assert!(matches!(editor.rename_stage(&a, "   "), Err(MarketingError::Validation(_))));
        editor.rename_stage(&a, "  Bienvenida ").unwrap();
        assert_eq!(names(&editor), vec![("Bienvenida", 0)]);
        assert!(matches!(
            editor.rename_stage(&EntityId::from("zz"), "X"),
            Err(MarketingError::NotFound { .. })
        ));
    }

    #[test]
    fn test_service_and_gate() {
        let mut editor = editor_with(&["A", "B"]);
        let a = EntityId::from("a");

        assert!(matches!(
            editor.set_requires_purchase(&a, true),
            Err(MarketingError::Validation(_))
        ));

        editor.set_stage_service(&a, Some("svc-1")).unwrap();
        editor.set_requires_purchase(&a, true).unwrap();
        assert!(editor.pipeline().stages()[0].is_gate());
        assert_eq!(
            editor.pipeline().gated_successor(&a).map(|s| s.name()),
            Some("B")
        );

        editor.set_stage_service(&a, None).unwrap();
        let stage = &editor.pipeline().stages()[0];
        assert_eq!(stage.linked_service_id(), None);
        assert!(!stage.requires_purchase_to_advance());
    }

    #[test]
    fn test_cancel_restores_snapshot() {
        let mut editor = editor_with(&["A", "B", "C"]);
        let before = layout(&editor);

        editor.begin_customizing();
        editor.insert_stage(0, "X").unwrap();
        editor.rename_stage(&EntityId::from("b"), "Renamed").unwrap();
        editor.remove_stage(&EntityId::from("c")).unwrap();
        editor.move_stage(&EntityId::from("a"), 2).unwrap();
        editor.cancel_customizing().unwrap();

        assert_eq!(layout(&editor), before);
        assert!(!editor.is_customizing());
        assert_eq!(editor.cancel_customizing().unwrap_err(), MarketingError::NotEditing);
    }

    #[test]
    fn test_cancel_keeps_email_edits() {
        let mut editor = editor_with(&["A", "B"]);
        let a = EntityId::from("a");

        editor.begin_customizing();
        editor.insert_stage(2, "C").unwrap();
        let email_id = editor.add_email_unit(&a, draft_with(&[])).unwrap();
        editor.cancel_customizing().unwrap();

        assert_eq!(editor.pipeline().len(), 2);
        assert!(editor.pipeline().get(&a).unwrap().email(&email_id).is_some());

        let events = editor.take_events();
        let names: Vec<_> = events.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["campaign.email_added", "campaign.customizing_cancelled"]);
    }

    #[test]
    fn test_persisted_view_keeps_pre_session_layout() {
        let mut editor = editor_with(&["A", "B"]);
        let a = EntityId::from("a");
        let first = editor.add_email_unit(&a, draft_with(&[])).unwrap();

        editor.begin_customizing();
        editor.insert_stage(0, "X").unwrap();
        editor.rename_stage(&EntityId::from("b"), "Renamed").unwrap();
        let second = editor.add_email_unit(&a, draft_with(&[])).unwrap();

        let view = editor.persisted_view();
        let stored: Vec<_> = view.pipeline().stages().iter().map(|s| s.name()).collect();
        assert_eq!(stored, vec!["A", "B"]);
        let stage = view.pipeline().get(&a).unwrap();
        assert!(stage.email(&first).is_some());
        assert!(stage.email(&second).is_some());
        assert_eq!(editor.pipeline().len(), 3);

        let saved = editor.take_persisted_events();
        let saved: Vec<_> = saved.iter().map(|e| e.name()).collect();
        assert_eq!(saved, vec!["campaign.email_added", "campaign.email_added"]);

        editor.cancel_customizing().unwrap();
        let rest = editor.take_events();
        let rest: Vec<_> = rest.iter().map(|e| e.name()).collect();
        assert_eq!(rest, vec!["campaign.customizing_cancelled"]);
    }

    #[test]
    fn test_adopt_ids_survives_cancel() {
        let mut editor = editor_with(&["A"]);
        let a = EntityId::from("a");
        editor.begin_customizing();
        let x = editor.insert_stage(1, "X").unwrap().id().clone();
        let email = editor.add_email_unit(&a, draft_with(&[])).unwrap();

        let assigned = HashMap::from([
            (x, EntityId::from("s-x")),
            (email.clone(), EntityId::from("e-1")),
        ]);
        assert_eq!(editor.adopt_ids(&assigned), 2);
        assert!(editor.pipeline().get(&EntityId::from("s-x")).is_some());

        editor.cancel_customizing().unwrap();
        let stage = editor.pipeline().get(&a).unwrap();
        assert!(stage.email(&EntityId::from("e-1")).is_some());
        assert!(stage.email(&email).is_none());
    }

    #[test]
    fn test_finish_keeps_edits() {
        let mut editor = editor_with(&["A"]);
        editor.begin_customizing();
        editor.insert_stage(1, "B").unwrap();
        editor.finish_customizing().unwrap();
        assert_eq!(names(&editor), vec![("A", 0), ("B", 1)]);
        assert_eq!(editor.insert_stage(0, "Z").unwrap_err(), MarketingError::NotEditing);
    }

    #[test]
    fn test_add_email_missing_variable_leaves_stage_untouched() {
        let mut editor = editor_with(&["A"]);
        editor
            .campaign
            .attach_segment(Segment::new("Mujeres 30+", "").with_variable("nombre", json!("Ana")));
        let a = EntityId::from("a");

        let err = editor.add_email_unit(&a, draft_with(&["nombre", "edad"])).unwrap_err();
        assert_eq!(
            err,
            MarketingError::MissingSegmentVariable {
                segment: "Mujeres 30+".into(),
                variable: "edad".into(),
            }
        );
        assert!(editor.pipeline().get(&a).unwrap().emails().is_empty());

        editor.add_email_unit(&a, draft_with(&["nombre"])).unwrap();
        assert_eq!(editor.pipeline().get(&a).unwrap().emails().len(), 1);
    }

    #[test]
    fn test_insert_variable_uses_campaign_segments() {
        let mut editor = editor_with(&["A"]);
        editor
            .campaign
            .attach_segment(Segment::new("VIP", "").with_variable("nombre", json!("Ana")));
        let mut draft = EmailDraft::new("Hola", "Hola ");
        editor.insert_variable(&mut draft, "nombre").unwrap();
        assert_eq!(draft.body, "Hola {{nombre}}");
        assert!(matches!(
            editor.insert_variable(&mut draft, "edad"),
            Err(MarketingError::MissingSegmentVariable { .. })
        ));
    }

    #[test]
    fn test_email_edits_update_percentage() {
        let mut editor = PipelineEditor::new(Campaign::restore(CampaignParts {
            id: EntityId::from("camp"),
            pipeline: Pipeline::from_stages(vec![stage("a", "Abiertos", 0)]),
            stats: CampaignStats { sent: 200, ..Default::default() },
            ..Default::default()
        }));
        let a = EntityId::from("a");
        let mut ids = vec![];
        for _ in 0..3 {
            ids.push(editor.add_email_unit(&a, draft_with(&[])).unwrap());
        }
        assert_eq!(editor.pipeline().stages()[0].percentage(), 1.5);

        editor.remove_email_unit(&a, &ids[0]).unwrap();
        assert_eq!(editor.pipeline().stages()[0].percentage(), 1.0);
        assert!(matches!(
            editor.remove_email_unit(&a, &ids[0]),
            Err(MarketingError::NotFound { .. })
        ));
    }

    #[test]
    fn test_synthetic_stages_reject_emails() {
        let mut editor = PipelineEditor::new(Campaign::restore(CampaignParts {
            pipeline: Pipeline::from_stages(vec![PipelineStage::synthetic("Enviados", 10)]),
            ..Default::default()
        }));
        let id = editor.pipeline().stages()[0].id().clone();
        assert!(matches!(
            editor.add_email_unit(&id, draft_with(&[])),
            Err(MarketingError::Validation(_))
        ));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(usize),
        Remove(usize),
        Move(usize, usize),
        Rename(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8).prop_map(Op::Insert),
            (0usize..8).prop_map(Op::Remove),
            (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Move(a, b)),
            (0usize..8).prop_map(Op::Rename),
        ]
    }

    fn apply(editor: &mut PipelineEditor, op: &Op) {
        let len = editor.pipeline().len();
        match *op {
            Op::Insert(at) => {
                editor.insert_stage(at % (len + 1), "New").unwrap();
            }
            Op::Remove(i) if len > 0 => {
                let id = editor.pipeline().stages()[i % len].id().clone();
                editor.remove_stage(&id).unwrap();
            }
            Op::Move(i, to) if len > 0 => {
                let id = editor.pipeline().stages()[i % len].id().clone();
                editor.move_stage(&id, to % len).unwrap();
            }
            Op::Rename(i) if len > 0 => {
                let id = editor.pipeline().stages()[i % len].id().clone();
                editor.rename_stage(&id, "Renamed").unwrap();
            }
            _ => {}
        }
    }

    proptest! {
        #[test]
        fn prop_order_stays_dense(ops in prop::collection::vec(op(), 0..40)) {
            let mut editor = editor_with(&["A", "B", "C"]);
            editor.begin_customizing();
            for op in &ops {
                apply(&mut editor, op);
                prop_assert!(editor.pipeline().is_dense());
            }
        }

        #[test]
        fn prop_cancel_restores_layout(ops in prop::collection::vec(op(), 0..40)) {
            let mut editor = editor_with(&["A", "B", "C", "D"]);
            let before = layout(&editor);
            editor.begin_customizing();
            for op in &ops {
                apply(&mut editor, op);
            }
            editor.cancel_customizing().unwrap();
            prop_assert_eq!(layout(&editor), before);
        }
    }
}
