//! Durable record of one mediated request.
//!
//! # Lifecycle
//! ```text
//! begin            → Processing
//! primary response → Successful (2xx) | Completed (other) | Failed (5xx / no response)
//! secondary route  → appended; a failed or non-2xx secondary turns
//!                    Successful into CompletedWithErrors
//! ```
//! Secondary outcomes may arrive before or after the primary one, so the
//! status is re-derived from the whole record after every mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Processing,
    Successful,
    Completed,
    CompletedWithErrors,
    Failed,
}

/// The request as it was received (credentials are never recorded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// A backend response as recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl RecordedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What came back from a route: a response of any status, or a failure
/// to get one (connect error, timeout, unreadable body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteResult {
    Response(RecordedResponse),
    Failure { error: String },
}

impl RouteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RouteResult::Response(r) if r.is_success())
    }
}

/// Outcome of one secondary route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub name: String,
    pub request: RecordedRequest,
    pub result: RouteResult,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of the primary route.
pub type PrimaryOutcome = RouteResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub client_id: String,
    pub channel: String,
    pub request: RecordedRequest,
    pub response: Option<RecordedResponse>,
    /// Set instead of `response` when the primary route produced no response.
    pub error: Option<String>,
    pub routes: Vec<RouteOutcome>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(client_id: impl Into<String>, channel: impl Into<String>, request: RecordedRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            channel: channel.into(),
            request,
            response: None,
            error: None,
            routes: Vec::new(),
            status: TransactionStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_primary(&self) -> bool {
        self.response.is_some() || self.error.is_some()
    }

    /// Set the primary outcome. Returns `false` (and changes nothing) if
    /// one was already recorded.
    pub fn record_primary(&mut self, outcome: PrimaryOutcome) -> bool {
        if self.has_primary() {
            return false;
        }
        match outcome {
            RouteResult::Response(response) => self.response = Some(response),
            RouteResult::Failure { error } => self.error = Some(error),
        }
        self.touch();
        true
    }

    pub fn push_route(&mut self, outcome: RouteOutcome) {
        self.routes.push(outcome);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.status = self.derive_status();
    }

    fn derive_status(&self) -> TransactionStatus {
        let primary = match (&self.response, &self.error) {
            (_, Some(_)) => TransactionStatus::Failed,
            (Some(r), None) if r.is_success() => TransactionStatus::Successful,
            (Some(r), None) if r.status >= 500 => TransactionStatus::Failed,
            (Some(_), None) => TransactionStatus::Completed,
            (None, None) => TransactionStatus::Processing,
        };

        if primary == TransactionStatus::Successful && self.routes.iter().any(|r| !r.result.is_success()) {
            TransactionStatus::CompletedWithErrors
        } else {
            primary
        }
    }
}
