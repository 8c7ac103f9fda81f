//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce that exactly one authentication mode is enabled, and that
//!   mutual TLS has a client CA to verify against
//! - Check uniqueness of channel, route and client names
//! - Validate value ranges (timeouts > 0, ports valid) and URL patterns
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MediatorConfig → Result<(), Vec<ValidationError>>
//! - A channel without an enabled primary route is NOT rejected here; it
//!   fails loudly on the first request that reaches it

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::auth::AuthMode;
use crate::config::schema::{AuthConfig, MediatorConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mutual TLS and basic authentication cannot both be enabled")]
    ConflictingAuthModes,

    #[error("one of mutual TLS or basic authentication must be enabled")]
    NoAuthMode,

    #[error("mutual TLS requires [listener.tls] with a client_ca_path")]
    MutualTlsWithoutClientCa,

    #[error("routing.default_timeout_ms must be greater than zero")]
    ZeroDefaultTimeout,

    #[error("routing.max_retained_transactions must be greater than zero")]
    ZeroRetention,

    #[error("duplicate channel name '{0}'")]
    DuplicateChannel(String),

    #[error("channel '{channel}' has an invalid url_pattern: {reason}")]
    InvalidPattern { channel: String, reason: String },

    #[error("channel '{0}' has no routes")]
    NoRoutes(String),

    #[error("channel '{channel}' has duplicate route name '{route}'")]
    DuplicateRoute { channel: String, route: String },

    #[error("route '{route}' on channel '{channel}' has an invalid {field}")]
    InvalidRoute {
        channel: String,
        route: String,
        field: &'static str,
    },

    #[error("duplicate client id '{0}'")]
    DuplicateClient(String),

    #[error("client '{0}' has a password hash but no algorithm")]
    MissingHashAlgorithm(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Resolve the two mode flags into the single active mode.
pub fn resolve_auth_mode(auth: &AuthConfig) -> Result<AuthMode, ValidationError> {
    match (auth.enable_mutual_tls, auth.enable_basic_auth) {
        (true, true) => Err(ValidationError::ConflictingAuthModes),
        (true, false) => Ok(AuthMode::MutualTls),
        (false, true) => Ok(AuthMode::Basic),
        (false, false) => Err(ValidationError::NoAuthMode),
    }
}

pub fn validate_config(config: &MediatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match resolve_auth_mode(&config.auth) {
        Ok(AuthMode::MutualTls) => {
            let has_client_ca = config
                .listener
                .tls
                .as_ref()
                .is_some_and(|tls| tls.client_ca_path.is_some());
            if !has_client_ca {
                errors.push(ValidationError::MutualTlsWithoutClientCa);
            }
        }
        Ok(AuthMode::Basic) => {}
        Err(e) => errors.push(e),
    }
    if config.routing.default_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDefaultTimeout);
    }
    if config.routing.max_retained_transactions == 0 {
        errors.push(ValidationError::ZeroRetention);
    }
    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    let mut channel_names = HashSet::new();
    for channel in &config.channels {
        if !channel_names.insert(channel.name.as_str()) {
            errors.push(ValidationError::DuplicateChannel(channel.name.clone()));
        }
        if let Err(e) = Regex::new(&channel.url_pattern) {
            errors.push(ValidationError::InvalidPattern {
                channel: channel.name.clone(),
                reason: e.to_string(),
            });
        }
        if channel.routes.is_empty() {
            errors.push(ValidationError::NoRoutes(channel.name.clone()));
        }

        let mut route_names = HashSet::new();
        for route in &channel.routes {
            if !route_names.insert(route.name.as_str()) {
                errors.push(ValidationError::DuplicateRoute {
                    channel: channel.name.clone(),
                    route: route.name.clone(),
                });
            }
            let invalid = |field| ValidationError::InvalidRoute {
                channel: channel.name.clone(),
                route: route.name.clone(),
                field,
            };
            if route.host.trim().is_empty() {
                errors.push(invalid("host"));
            }
            if route.port == 0 {
                errors.push(invalid("port"));
            }
            if route.timeout_ms == Some(0) {
                errors.push(invalid("timeout_ms"));
            }
            if route.path.as_deref().is_some_and(|p| !p.starts_with('/')) {
                errors.push(invalid("path"));
            }
        }
    }

    let mut client_ids = HashSet::new();
    for client in &config.clients {
        if !client_ids.insert(client.client_id.as_str()) {
            errors.push(ValidationError::DuplicateClient(client.client_id.clone()));
        }
        if client.password_hash.is_some() && client.password_algorithm.is_none() {
            errors.push(ValidationError::MissingHashAlgorithm(client.client_id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
