//! Configuration loading from disk and normalization into the domain model.

use std::fs;
use std::path::Path;
use std::time::Duration;

use regex::Regex;

use crate::config::schema::{ChannelConfig, ClientConfig, MediatorConfig, RouteConfig, StatusConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::model::client::normalize_fingerprint;
use crate::model::{Channel, Client, MethodSet, PasswordCredential, RoleSet, RouteCredentials, RouteDescriptor};
use crate::repository::Registry;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MediatorConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<MediatorConfig, ConfigError> {
    let config: MediatorConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Normalize channel and client records into a lookup registry.
///
/// Runs validation again so a registry is never built from an unchecked
/// config.
pub fn build_registry(config: &MediatorConfig) -> Result<Registry, ConfigError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let channels = config
        .channels
        .iter()
        .map(build_channel)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::Validation(vec![e]))?;
    let clients = config.clients.iter().map(build_client).collect();

    Ok(Registry::new(channels, clients))
}

fn is_enabled(status: Option<StatusConfig>) -> bool {
    status != Some(StatusConfig::Disabled)
}

fn build_channel(config: &ChannelConfig) -> Result<Channel, ValidationError> {
    let url_pattern = Regex::new(&config.url_pattern).map_err(|e| ValidationError::InvalidPattern {
        channel: config.name.clone(),
        reason: e.to_string(),
    })?;

    let mut channel = Channel::new(&config.name, url_pattern, RoleSet::new(config.allow.iter().cloned()));
    if let Some(methods) = &config.methods {
        channel = channel.with_methods(MethodSet::new(methods.iter().cloned()));
    }
    channel.enabled = is_enabled(config.status);
    channel.updated_by = config.updated_by.clone();
    channel.routes = config.routes.iter().map(build_route).collect();
    Ok(channel)
}

fn build_route(config: &RouteConfig) -> RouteDescriptor {
    let credentials = match (&config.username, &config.password) {
        (Some(username), password) => Some(RouteCredentials {
            username: username.clone(),
            password: password.clone().unwrap_or_default(),
        }),
        (None, _) => None,
    };

    RouteDescriptor {
        name: config.name.clone(),
        host: config.host.clone(),
        port: config.port,
        primary: config.primary,
        enabled: is_enabled(config.status),
        path: config.path.clone(),
        credentials,
        timeout: config.timeout_ms.map(Duration::from_millis),
    }
}

fn build_client(config: &ClientConfig) -> Client {
    let mut client = Client::new(&config.client_id, RoleSet::new(config.roles.iter().cloned()));
    if let Some(name) = &config.name {
        client.name = name.clone();
    }
    client.domain = config.domain.clone();
    client.password = match (config.password_algorithm, &config.password_hash) {
        (Some(algorithm), Some(hash)) => Some(PasswordCredential {
            algorithm,
            hash: hash.to_ascii_lowercase(),
            salt: config.password_salt.clone().unwrap_or_default(),
        }),
        _ => None,
    };
    client.cert_fingerprint = config.cert_fingerprint.as_deref().map(normalize_fingerprint);
    client
}
