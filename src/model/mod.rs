//! Domain model shared by every stage of the mediation pipeline.
//!
//! # Data Flow
//! ```text
//! config / repository records
//!     → normalized once at load (regex compiled, roles & methods as sets,
//!       route status folded into `enabled`)
//!     → Channel, RouteDescriptor, Client (read-only during requests)
//!
//! per request:
//!     → Transaction created by the recorder
//!     → primary outcome + secondary RouteOutcomes appended over time
//! ```

pub mod channel;
pub mod client;
pub mod transaction;

pub use channel::{Channel, MethodSet, RoleSet, RouteCredentials, RouteDescriptor};
pub use client::{Client, ClientCredential, PasswordCredential};
pub use transaction::{
    PrimaryOutcome, RecordedRequest, RecordedResponse, RouteOutcome, RouteResult, Transaction,
    TransactionStatus,
};
