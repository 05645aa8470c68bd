//! Personalization resolver
//!
//! Syntactic insertion of `{{variable}}` tokens while an email unit is being
//! authored, plus availability checks against the segments attached to the
//! campaign. Substituting real contact data is done by the backend.

use crate::domain::aggregates::Segment;
use crate::domain::value_objects::PersonalizationVariable;
use crate::{MarketingError, Result};

/// Authoring buffer for a new email unit.
///
/// `cursor` is a character offset into `body`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    pub cursor: usize,
    pub variables: Vec<PersonalizationVariable>,
}

impl EmailDraft {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let cursor = body.chars().count();
        Self {
            subject: subject.into(),
            body,
            cursor,
            variables: vec![],
        }
    }

    /// Move the edit cursor, clamped to the end of the body.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.body.chars().count());
    }

    /// Validate `name` against the catalog and every segment, then insert
    /// its token at the cursor. The cursor ends right after the token.
    pub fn insert_variable(&mut self, name: &str, segments: &[Segment]) -> Result<()> {
        let variable = PersonalizationResolver::ensure_available(name, segments)?;

        let cursor = self.cursor.min(self.body.chars().count());
        let byte_index = self
            .body
            .char_indices()
            .nth(cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.body.len());

        self.body.insert_str(byte_index, variable.token());
        self.cursor = cursor + variable.token().chars().count();

        if !self.variables.contains(&variable) {
            self.variables.push(variable);
        }
        Ok(())
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name()).collect()
    }
}

pub struct PersonalizationResolver;

impl PersonalizationResolver {
    /// Resolve a catalog variable and check that every attached segment
    /// declares it. The first segment missing it is reported.
    pub fn ensure_available(name: &str, segments: &[Segment]) -> Result<PersonalizationVariable> {
        let variable = PersonalizationVariable::from_catalog(name).ok_or_else(|| {
            MarketingError::Validation(format!("unknown personalization variable '{}'", name.trim()))
        })?;

        if let Some(segment) = segments.iter().find(|s| !s.has_variable(variable.name())) {
            return Err(MarketingError::MissingSegmentVariable {
                segment: segment.name.clone(),
                variable: variable.name().to_string(),
            });
        }

        Ok(variable)
    }

    /// Check a whole variable list, failing on the first unavailable one.
    pub fn ensure_all_available(
        variables: &[PersonalizationVariable],
        segments: &[Segment],
    ) -> Result<()> {
        for variable in variables {
            Self::ensure_available(variable.name(), segments)?;
        }
        Ok(())
    }

    /// Names of the variables whose tokens appear in `text`, in order of
    /// first appearance.
    pub fn referenced(text: &str) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                break;
            };
            let name = after[..end].trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
            rest = &after[end + 2..];
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segment_with(vars: &[&str]) -> Segment {
        vars.iter().fold(Segment::new("Clientes VIP", ""), |s, v| s.with_variable(*v, json!("x")))
    }

    #[test]
    fn test_insert_at_cursor() {
        let mut draft = EmailDraft::new("Hola", "Hola , bienvenida");
        draft.set_cursor(5);
        draft.insert_variable("nombre", &[segment_with(&["nombre"])]).unwrap();
        assert_eq!(draft.body, "Hola {{nombre}}, bienvenida");
        assert_eq!(draft.cursor, 5 + "{{nombre}}".len());
        assert_eq!(draft.variable_names(), vec!["nombre"]);
    }

    #[test]
    fn test_cursor_counts_characters() {
        let mut draft = EmailDraft::new("", "¡Olé!");
        draft.set_cursor(4);
        draft.insert_variable("nombre", &[]).unwrap();
        assert_eq!(draft.body, "¡Olé{{nombre}}!");
        assert_eq!(draft.cursor, 14);
    }

    #[test]
    fn test_variable_recorded_once() {
        let mut draft = EmailDraft::new("", "");
        draft.insert_variable("nombre", &[]).unwrap();
        draft.insert_variable("nombre", &[]).unwrap();
        assert_eq!(draft.body, "{{nombre}}{{nombre}}");
        assert_eq!(draft.variables.len(), 1);
    }

    #[test]
    fn test_missing_variable_names_segment() {
        let segments = vec![segment_with(&["nombre"])];
        let mut draft = EmailDraft::new("", "Hola");
        let err = draft.insert_variable("edad", &segments).unwrap_err();
        assert_eq!(
            err,
            MarketingError::MissingSegmentVariable {
                segment: "Clientes VIP".into(),
                variable: "edad".into(),
            }
        );
        assert_eq!(draft.body, "Hola");
        assert!(draft.variables.is_empty());
    }

    #[test]
    fn test_unknown_variable_is_validation_error() {
        let mut draft = EmailDraft::new("", "");
        assert!(matches!(
            draft.insert_variable("telefono", &[]),
            Err(MarketingError::Validation(_))
        ));
    }

    #[test]
    fn test_referenced_tokens() {
        let names = PersonalizationResolver::referenced("{{nombre}} y {{ edad }} y {{nombre}} {{rota");
        assert_eq!(names, vec!["nombre".to_string(), "edad".to_string()]);
    }
}
