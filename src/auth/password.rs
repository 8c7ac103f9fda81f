//! Salted password hashes for basic authentication.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::model::PasswordCredential;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

/// Lowercase hex digest of `password || salt`.
pub fn hash_password(algorithm: HashAlgorithm, password: &str, salt: &str) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(password.as_bytes());
            hasher.update(salt.as_bytes());
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(password.as_bytes());
            hasher.update(salt.as_bytes());
            hex::encode(hasher.finalize())
        }
    }
}

/// Check `candidate` against a stored credential.
pub fn verify_password(credential: &PasswordCredential, candidate: &str) -> bool {
    let computed = hash_password(credential.algorithm, candidate, &credential.salt);
    let stored = credential.hash.to_ascii_lowercase();
    bool::from(computed.as_bytes().ct_eq(stored.as_bytes()))
}
