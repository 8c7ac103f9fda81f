//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mediator.
//! All types derive Serde traits for deserialization from config files.
//! Records here are raw; `loader::build_registry` normalizes them into the
//! domain model.

use serde::{Deserialize, Serialize};

use crate::auth::password::HashAlgorithm;
use crate::repository::memory::DEFAULT_MAX_RETAINED_TRANSACTIONS;

/// Root configuration for the mediator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MediatorConfig {
    /// Listener configuration (bind address, TLS, body limit).
    pub listener: ListenerConfig,

    /// Authentication mode flags.
    pub auth: AuthConfig,

    /// Forwarding defaults.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Known clients.
    pub clients: Vec<ClientConfig>,

    /// Channels, in matching order.
    pub channels: Vec<ChannelConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5001").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Largest inbound or upstream body buffered, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5001".to_string(),
            tls: None,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// CA bundle (PEM) that client certificates must chain to. Required
    /// for mutual TLS authentication.
    #[serde(default)]
    pub client_ca_path: Option<String>,
}

/// Authentication flags. Exactly one must be enabled.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enable_mutual_tls: bool,
    pub enable_basic_auth: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enable_mutual_tls: false,
            enable_basic_auth: true,
        }
    }
}

/// Forwarding defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Timeout for routes without their own `timeout_ms`.
    pub default_timeout_ms: u64,

    /// Transactions kept in memory before the oldest settled one is evicted.
    pub max_retained_transactions: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            max_retained_transactions: DEFAULT_MAX_RETAINED_TRANSACTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API, served on its own listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    pub bind_address: String,

    /// Bearer token required on every admin request.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:5002".to_string(),
            api_key: String::new(),
        }
    }
}

/// A client record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub client_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub password_algorithm: Option<HashAlgorithm>,

    /// Hex digest of `password || salt`.
    #[serde(default)]
    pub password_hash: Option<String>,

    #[serde(default)]
    pub password_salt: Option<String>,

    /// Hex SHA-256 of the client's DER certificate; `:` separators allowed.
    #[serde(default)]
    pub cert_fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusConfig {
    Enabled,
    Disabled,
}

/// A channel record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub name: String,

    /// Regular expression tested against the request path.
    pub url_pattern: String,

    /// Roles permitted to use the channel.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Allowed methods; absent or empty allows all.
    #[serde(default)]
    pub methods: Option<Vec<String>>,

    /// Unset means enabled.
    #[serde(default)]
    pub status: Option<StatusConfig>,

    #[serde(default)]
    pub updated_by: Option<String>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// A route record.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    pub name: String,

    pub host: String,

    pub port: u16,

    #[serde(default)]
    pub primary: bool,

    /// Unset means enabled.
    #[serde(default)]
    pub status: Option<StatusConfig>,

    /// Replaces the request path when set.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RouteConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            primary: false,
            status: None,
            path: None,
            username: None,
            password: None,
            timeout_ms: None,
        }
    }
}
