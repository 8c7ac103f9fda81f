//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! RouteSelection + buffered inbound request
//!     → request.rs (ForwardRequest: one immutable copy, replayed per route
//!       with only the authority/path substituted)
//!     → multiplexer.rs
//!         secondaries: spawned first, each its own task, outcome handed
//!                      to the recorder on completion
//!         primary:     awaited; response goes back to the caller
//!     → upstream.rs (hyper client, per-call timeout)
//! ```
//!
//! # Design Decisions
//! - Secondary tasks are detached: the caller's reply never waits on them,
//!   and a primary failure never cancels them
//! - Secondary failures are recorded, never surfaced or retried
//! - Each backend call has its own deadline (route override or default)

pub mod multiplexer;
pub mod request;
pub mod upstream;

use std::time::Duration;

use thiserror::Error;

pub use multiplexer::{Forwarded, Multiplexer, SecondaryDispatch};
pub use request::ForwardRequest;
pub use upstream::{HttpUpstream, Upstream, UpstreamResponse};

/// Failure to obtain a response from a route.
#[derive(Debug, Clone, Error)]
pub enum ForwardError {
    #[error("invalid route target: {0}")]
    InvalidTarget(String),

    #[error("connection to upstream failed: {0}")]
    Connect(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read upstream body: {0}")]
    Body(String),
}

impl ForwardError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ForwardError::Timeout(_))
    }
}
