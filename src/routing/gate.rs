//! Method gate: enforces a channel's allowed HTTP methods.

use axum::http::Method;
use thiserror::Error;

use crate::model::{Channel, MethodSet};

/// The request method is not in the channel's restriction.
///
/// The display text is the exact body returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Request with method {method} is not allowed. Only {allowed} methods are allowed")]
pub struct MethodNotAllowed {
    pub method: String,
    pub allowed: MethodSet,
}

/// Accept the method if the channel has no restriction or lists it.
pub fn check_method(channel: &Channel, method: &Method) -> Result<(), MethodNotAllowed> {
    match &channel.methods {
        Some(allowed) if !allowed.allows(method.as_str()) => Err(MethodNotAllowed {
            method: method.as_str().to_string(),
            allowed: allowed.clone(),
        }),
        _ => Ok(()),
    }
}
