//! Personalization variables
//!
//! The catalog is closed: authors can only insert the variables listed in
//! [`VARIABLE_CATALOG`]. Resolution against real contact data happens on the
//! backend at send time.

use serde::{Deserialize, Serialize};

/// Names of every variable an email author may insert.
pub const VARIABLE_CATALOG: &[&str] = &["nombre", "apellido", "correo", "edad"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationVariable {
    pub name: String,
    pub placeholder_token: String,
}

impl PersonalizationVariable {
    /// Look a variable up in the catalog.
    pub fn from_catalog(name: &str) -> Option<Self> {
        let name = name.trim();
        VARIABLE_CATALOG
            .iter()
            .find(|candidate| **candidate == name)
            .map(|candidate| Self {
                name: candidate.to_string(),
                placeholder_token: Self::token_for(candidate),
            })
    }

    pub fn catalog() -> Vec<Self> {
        VARIABLE_CATALOG
            .iter()
            .filter_map(|name| Self::from_catalog(name))
            .collect()
    }

    pub fn token_for(name: &str) -> String {
        format!("{{{{{}}}}}", name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.placeholder_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_tokens() {
        let var = PersonalizationVariable::from_catalog("nombre").unwrap();
        assert_eq!(var.token(), "{{nombre}}");
        assert_eq!(PersonalizationVariable::catalog().len(), VARIABLE_CATALOG.len());
    }

    #[test]
    fn test_unknown_variable() {
        assert!(PersonalizationVariable::from_catalog("telefono").is_none());
        assert!(PersonalizationVariable::from_catalog("").is_none());
    }
}
