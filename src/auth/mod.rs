//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → gatekeeper.rs (AuthMode picks the credential source)
//!         MutualTls: PeerCertificate extension → SHA-256 fingerprint
//!         Basic:     Authorization header → client id + password
//!     → repository lookup
//!     → password.rs (hash verification, basic mode only)
//!     → Client (with roles) or AuthError
//! ```
//!
//! # Design Decisions
//! - The mode is a value handed to the gatekeeper, never a global flag
//! - Every credential problem is the same `Unauthorized` to the caller;
//!   the specific reason is only logged
//! - Runs before channel matching so unauthenticated callers learn nothing
//!   about configured channels

pub mod gatekeeper;
pub mod password;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::RepositoryError;

pub use gatekeeper::Gatekeeper;

/// Which credential source identifies callers. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    MutualTls,
    Basic,
}

/// DER-encoded certificate presented by the peer, attached to the request
/// by the TLS listener after chain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate(pub Vec<u8>);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials presented")]
    MissingCredentials,

    #[error("malformed credentials: {0}")]
    Malformed(&'static str),

    #[error("unknown client")]
    UnknownClient,

    #[error("credential mismatch for client {0}")]
    Mismatch(String),

    /// The lookup itself failed; not the caller's fault.
    #[error("client lookup failed: {0}")]
    Lookup(#[from] RepositoryError),
}

impl AuthError {
    /// True for failures caused by the presented credentials.
    pub fn is_credential_failure(&self) -> bool {
        !matches!(self, AuthError::Lookup(_))
    }
}
