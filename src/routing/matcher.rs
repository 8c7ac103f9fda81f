//! Channel matching.
//!
//! # Responsibilities
//! - Test the request path against each channel's URL pattern
//! - Require the client's roles to intersect the channel's allow-set
//! - Combine both conditions with AND semantics
//!
//! # Design Decisions
//! - Patterns are compiled once at load; matching never compiles a regex
//! - Patterns are unanchored (`is_match`); anchor them in configuration
//! - Disabled channels are skipped as if absent
//! - First match in configuration order wins

use std::sync::Arc;

use crate::model::{Channel, RoleSet};

/// Find the first channel serving `path` for a client holding `roles`.
pub fn find_channel(channels: &[Arc<Channel>], path: &str, roles: &RoleSet) -> Option<Arc<Channel>> {
    channels
        .iter()
        .find(|channel| channel.enabled && channel.matches_path(path) && channel.permits(roles))
        .cloned()
}
