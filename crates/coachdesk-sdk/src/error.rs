//! Error types

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use coachdesk_marketing::GatewayError;

/// Error type for coachdesk SDK operations
#[derive(Error, Debug)]
pub enum Error {
    /// API error returned by the server
    #[error("API error: {code} - {message}")]
    Api {
        code: String,
        message: String,
        status_code: u16,
    },

    /// No bearer token is available
    #[error("missing credential: no API token configured")]
    MissingCredential,

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an API error from a non-success response. Both
    /// `{"message": ...}` and `{"error": {"code", "message"}}` bodies are
    /// understood.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ErrorResponse {
            #[serde(default)]
            error: Option<ErrorBody>,
            #[serde(default)]
            message: Option<String>,
        }

        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            code: Option<String>,
            message: String,
        }

        let default_code = || {
            status
                .canonical_reason()
                .unwrap_or("unknown_error")
                .to_lowercase()
                .replace(' ', "_")
        };

        match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(ErrorResponse { error: Some(error), .. }) => Error::Api {
                code: error.code.unwrap_or_else(default_code),
                message: error.message,
                status_code: status.as_u16(),
            },
            Ok(ErrorResponse { message: Some(message), .. }) => Error::Api {
                code: default_code(),
                message,
                status_code: status.as_u16(),
            },
            _ => Error::Api {
                code: default_code(),
                message: String::from_utf8_lossy(body).trim().to_string(),
                status_code: status.as_u16(),
            },
        }
    }

    /// Returns true if this is an authentication error (401)
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Error::Api { status_code: 401, .. })
    }

    /// Returns true if this is an authorization error (403)
    pub fn is_authorization_error(&self) -> bool {
        matches!(self, Error::Api { status_code: 403, .. })
    }

    /// Returns true if this is a not found error (404)
    pub fn is_not_found_error(&self) -> bool {
        matches!(self, Error::Api { status_code: 404, .. })
    }

    /// Returns true if this is a validation error (400 or 422)
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Api { status_code: 400 | 422, .. })
    }

    /// Convert into a gateway error, naming the entity a 404 refers to.
    pub fn into_gateway(self, entity: &'static str, id: &str) -> GatewayError {
        if self.is_not_found_error() {
            return GatewayError::NotFound { entity, id: id.to_string() };
        }
        self.into()
    }
}

impl From<Error> for GatewayError {
    fn from(err: Error) -> Self {
        if err.is_authentication_error() || err.is_authorization_error() {
            return GatewayError::Unauthorized(err.to_string());
        }
        match err {
            Error::MissingCredential => GatewayError::MissingCredential,
            Error::Api { status_code: 404, message, .. } => GatewayError::NotFound {
                entity: "resource",
                id: message,
            },
            Error::Json(e) => GatewayError::Decode(e.to_string()),
            other => GatewayError::Network(other.to_string()),
        }
    }
}
