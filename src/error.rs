//! Mediation error taxonomy and its HTTP mapping.
//!
//! | Error | Status |
//! |---|---|
//! | Authentication (credentials) | 401 |
//! | NoChannelMatch | 404 |
//! | MethodNotAllowed | 405 |
//! | RouteConfigurationFault | 500 |
//! | Upstream (connect / body) | 502 |
//! | Upstream (timeout) | 504 |
//! | Repository, auth lookup | 500 |
//!
//! Secondary route failures never become a `MediatorError`; they are
//! recorded on the transaction.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{AuthError, AuthMode};
use crate::forwarding::ForwardError;
use crate::repository::RepositoryError;
use crate::routing::MethodNotAllowed;

pub const TRANSACTION_ID_HEADER: &str = "x-transaction-id";

const BASIC_CHALLENGE: &str = "Basic realm=\"interop-mediator\"";

#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("authentication failed: {source}")]
    Authentication {
        mode: AuthMode,
        #[source]
        source: AuthError,
    },

    #[error("No matching channel found for {path}")]
    NoChannelMatch { path: String },

    #[error(transparent)]
    MethodNotAllowed(#[from] MethodNotAllowed),

    #[error("Channel {channel} has no enabled primary route")]
    RouteConfigurationFault { channel: String },

    #[error("upstream request to route {route} failed: {source}")]
    Upstream {
        route: String,
        transaction_id: Uuid,
        #[source]
        source: ForwardError,
    },

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("request body too large or unreadable: {0}")]
    RequestBody(String),
}

pub type MediatorResult<T> = Result<T, MediatorError>;

impl MediatorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication { source, .. } if source.is_credential_failure() => StatusCode::UNAUTHORIZED,
            Self::Authentication { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoChannelMatch { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RouteConfigurationFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { source, .. } if source.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RequestBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Body text returned to the caller. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Authentication { source, .. } if source.is_credential_failure() => "Unauthorized".to_string(),
            Self::NoChannelMatch { .. } | Self::MethodNotAllowed(_) | Self::RouteConfigurationFault { .. } => {
                self.to_string()
            }
            Self::Upstream { source, .. } if source.is_timeout() => "Upstream request timed out".to_string(),
            Self::Upstream { .. } => "Upstream request failed".to_string(),
            Self::RequestBody(_) => "Request body too large".to_string(),
            Self::Authentication { .. } | Self::Repository(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for MediatorError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), self.public_message()).into_response();
        let headers = response.headers_mut();

        match &self {
            Self::Authentication {
                mode: AuthMode::Basic,
                source,
            } if source.is_credential_failure() => {
                headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
            }
            Self::Upstream { transaction_id, .. } => {
                if let Ok(value) = HeaderValue::from_str(&transaction_id.to_string()) {
                    headers.insert(TRANSACTION_ID_HEADER, value);
                }
            }
            _ => {}
        }

        response
    }
}
