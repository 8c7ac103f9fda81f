//! Health-interoperability message mediator.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod forwarding;
pub mod http;
pub mod lifecycle;
pub mod mediator;
pub mod model;
pub mod net;
pub mod observability;
pub mod recorder;
pub mod repository;
pub mod routing;

pub use config::schema::MediatorConfig;
pub use error::{MediatorError, MediatorResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use mediator::{InboundRequest, MediatedResponse, Mediator};
