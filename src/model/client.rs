//! Authenticated callers.

use std::fmt;

use crate::auth::password::HashAlgorithm;
use crate::model::RoleSet;

/// A stored password hash for basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredential {
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest of `password || salt`.
    pub hash: String,
    pub salt: String,
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A client known to the mediator. Read-only to request handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub client_id: String,
    pub name: String,
    pub domain: Option<String>,
    pub roles: RoleSet,
    pub password: Option<PasswordCredential>,
    /// Normalized (lowercase hex, no separators) SHA-256 of the client certificate.
    pub cert_fingerprint: Option<String>,
}

impl Client {
    pub fn new(client_id: impl Into<String>, roles: RoleSet) -> Self {
        let client_id = client_id.into();
        Self {
            name: client_id.clone(),
            client_id,
            domain: None,
            roles,
            password: None,
            cert_fingerprint: None,
        }
    }
}

/// The identity material a client is looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCredential {
    /// Basic auth username.
    ClientId(String),
    /// Normalized certificate fingerprint.
    CertificateFingerprint(String),
}

/// Normalize a fingerprint as written by operators (`AB:CD:...`) to the
/// form produced by hashing a certificate.
pub fn normalize_fingerprint(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
