//! Primary route selection.
//!
//! # Algorithm
//! Scan routes in list order. The first route flagged `primary` that is
//! enabled becomes the effective primary. Every other enabled route is a
//! secondary, whatever its own `primary` flag says. Disabled routes are
//! never forwarded to.

use crate::model::RouteDescriptor;

/// Routes chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSelection {
    /// Carries the client-facing response.
    pub primary: RouteDescriptor,
    /// Mirrored to; responses recorded only. In list order.
    pub secondaries: Vec<RouteDescriptor>,
}

/// Returns `None` when no enabled route is flagged primary.
pub fn select_routes(routes: &[RouteDescriptor]) -> Option<RouteSelection> {
    let primary_index = routes.iter().position(|r| r.primary && r.enabled)?;

    let secondaries = routes
        .iter()
        .enumerate()
        .filter(|(i, r)| *i != primary_index && r.enabled)
        .map(|(_, r)| r.clone())
        .collect();

    Some(RouteSelection {
        primary: routes[primary_index].clone(),
        secondaries,
    })
}
