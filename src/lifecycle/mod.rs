//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl-C / SIGTERM (main.rs)
//!     → Shutdown::trigger
//!     → every subscriber (HTTP server, TLS handle) stops accepting
//!     → in-flight requests drain, then the process exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
