//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticated request (path, method, client roles)
//!     → matcher.rs (first channel whose pattern matches AND whose
//!       allow-set intersects the client's roles)
//!     → gate.rs (channel method restriction)
//!     → selector.rs (effective primary + secondary routes)
//!     → RouteSelection handed to the forwarding multiplexer
//! ```
//!
//! # Design Decisions
//! - Deterministic: channels are scanned in configuration order and the
//!   first match wins
//! - All three stages are pure functions of configuration + request, so
//!   the same request always selects the same routes
//! - No eligible primary is a loud configuration fault, never a fallback

pub mod gate;
pub mod matcher;
pub mod selector;

pub use gate::{check_method, MethodNotAllowed};
pub use matcher::find_channel;
pub use selector::{select_routes, RouteSelection};
