use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// AuthError
///
/// The terminal outcomes of the gateway for API callers. UI callers see the same
/// three cases as redirects instead (see `gateway::Decision`).
#[derive(Error, Debug)]
pub enum AuthError {
    /// No session cookie was presented.
    #[error("Unauthorized")]
    Unauthenticated,

    /// A cookie was presented but failed signature or claims validation.
    #[error("Invalid Token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// The token is valid but its role is not allowed on the matched route.
    #[error("Forbidden")]
    Forbidden,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // The Display text is the wire contract: {"error": "<message>"}.
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// ConfigError
///
/// Startup failures. Any of these aborts the process before the listener binds.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingVar(&'static str),

    #[error("failed to read access policy {path}: {source}")]
    PolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid access policy: {0}")]
    PolicyParse(#[from] toml::de::Error),

    #[error("unknown role `{0}` in access policy")]
    UnknownRole(String),

    #[error("route prefix `{0}` must start with '/'")]
    InvalidPrefix(String),

    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
