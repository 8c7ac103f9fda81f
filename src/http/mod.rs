//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → mediate_handler (buffer body, pick up PeerCertificate extension)
//!     → Mediator::handle
//!     → primary response relayed with x-transaction-id, or MediatorError
//!       rendered through IntoResponse
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
