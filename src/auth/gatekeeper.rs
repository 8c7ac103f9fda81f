//! Resolves request credentials to a known client.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use crate::auth::password::verify_password;
use crate::auth::{AuthError, AuthMode, PeerCertificate};
use crate::model::{Client, ClientCredential};
use crate::repository::Repository;

/// Authenticates callers according to a fixed [`AuthMode`].
#[derive(Clone)]
pub struct Gatekeeper {
    mode: AuthMode,
    repository: Arc<dyn Repository>,
}

impl Gatekeeper {
    pub fn new(mode: AuthMode, repository: Arc<dyn Repository>) -> Self {
        Self { mode, repository }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Resolve the caller to a client, or fail.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        peer: Option<&PeerCertificate>,
    ) -> Result<Client, AuthError> {
        match self.mode {
            AuthMode::MutualTls => self.authenticate_certificate(peer).await,
            AuthMode::Basic => self.authenticate_basic(headers).await,
        }
    }

    async fn authenticate_certificate(&self, peer: Option<&PeerCertificate>) -> Result<Client, AuthError> {
        let cert = peer.ok_or(AuthError::MissingCredentials)?;
        if cert.0.is_empty() {
            return Err(AuthError::Malformed("empty certificate"));
        }

        let fingerprint = certificate_fingerprint(&cert.0);
        self.repository
            .find_client_by_credential(ClientCredential::CertificateFingerprint(fingerprint))
            .await?
            .ok_or(AuthError::UnknownClient)
    }

    async fn authenticate_basic(&self, headers: &HeaderMap) -> Result<Client, AuthError> {
        let (client_id, password) = parse_basic_authorization(headers)?;

        let client = self
            .repository
            .find_client_by_credential(ClientCredential::ClientId(client_id.clone()))
            .await?
            .ok_or(AuthError::UnknownClient)?;

        match &client.password {
            Some(credential) if verify_password(credential, &password) => Ok(client),
            _ => Err(AuthError::Mismatch(client_id)),
        }
    }
}

/// Lowercase hex SHA-256 of a DER certificate.
pub fn certificate_fingerprint(der: &[u8]) -> String {
    hex::encode(Sha256::digest(der))
}

/// Extract `(client id, password)` from an `Authorization: Basic ...` header.
pub fn parse_basic_authorization(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::Malformed("authorization header is not ASCII"))?;

    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::Malformed("authorization header has no scheme"))?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::Malformed("unsupported authorization scheme"));
    }

    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed("invalid base64"))?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed("credentials are not UTF-8"))?;

    let (client_id, password) = decoded
        .split_once(':')
        .ok_or(AuthError::Malformed("missing ':' separator"))?;
    if client_id.is_empty() {
        return Err(AuthError::Malformed("empty client id"));
    }

    Ok((client_id.to_string(), password.to_string()))
}
