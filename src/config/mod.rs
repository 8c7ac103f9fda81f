//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, auth mode resolution)
//!     → loader::build_registry (normalize into Channel / Client)
//!     → InMemoryRepository (atomic registry swap)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads + validates
//!     → server swaps the registry; in-flight requests keep their snapshot
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Listener, auth mode and timeouts are read at startup only; reload
//!   replaces channels and clients

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{build_registry, load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, ChannelConfig, ClientConfig, ListenerConfig, MediatorConfig, ObservabilityConfig,
    RouteConfig, RoutingConfig, StatusConfig,
};
pub use validation::{resolve_auth_mode, validate_config, ValidationError};
