//! Bearer token sources

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Supplies the bearer token for each request.
///
/// Implementations are consulted on every call, so a token stored after the
/// client was built is used by the next request.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Result<String>;
}

/// A fixed token, typically from a flag or an environment variable.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Result<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(Error::MissingCredential);
        }
        Ok(token.to_string())
    }
}

/// Reads the `token` key of a TOML file on every call.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct TokenFile {
    #[serde(default)]
    token: Option<String>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenSource for FileTokenStore {
    fn token(&self) -> Result<String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingCredential)
            }
            Err(e) => return Err(Error::Config(format!("{}: {}", self.path.display(), e))),
        };

        let file: TokenFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", self.path.display(), e)))?;

        StaticToken::new(file.token.unwrap_or_default()).token()
    }
}
