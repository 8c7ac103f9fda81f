//! Channels, routes and the set types used to match them.
//!
//! # Design Decisions
//! - Role and method lists are explicit sets with defined membership and
//!   intersection, so matching semantics are testable on their own
//! - A route's "unset means enabled" status is resolved once, when the
//!   channel is built; everything downstream reads `enabled`
//! - An empty method restriction is the same as no restriction

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A set of role names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// True when at least one role is present in both sets.
    pub fn intersects(&self, other: &RoleSet) -> bool {
        let (small, large) = if self.0.len() <= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.0.iter().any(|role| large.0.contains(role))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// The HTTP verbs a channel accepts.
///
/// Membership is case-sensitive. Configuration order is kept (duplicates
/// dropped) so the rejection message lists methods the way they were
/// configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(Vec<String>);

impl MethodSet {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: Vec<String> = Vec::new();
        for method in methods {
            let method = method.into();
            if !set.contains(&method) {
                set.push(method);
            }
        }
        Self(set)
    }

    pub fn allows(&self, method: &str) -> bool {
        self.0.iter().any(|m| m == method)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// Basic credentials a route presents to its backend.
#[derive(Clone, PartialEq, Eq)]
pub struct RouteCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RouteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One physical backend destination of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Candidate for carrying the client-facing response.
    pub primary: bool,
    /// Normalized status: `false` only when explicitly disabled.
    pub enabled: bool,
    /// Replaces the inbound request path when set.
    pub path: Option<String>,
    pub credentials: Option<RouteCredentials>,
    /// Per-route deadline; the routing default applies when unset.
    pub timeout: Option<Duration>,
}

impl RouteDescriptor {
    /// A primary-candidate-free, enabled route with no overrides.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            primary: false,
            enabled: true,
            path: None,
            credentials: None,
            timeout: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `host:port`, used as the request authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A logical endpoint matched by URL pattern, roles and methods.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub url_pattern: Regex,
    pub allow: RoleSet,
    /// `None` allows every method.
    pub methods: Option<MethodSet>,
    pub enabled: bool,
    pub routes: Vec<RouteDescriptor>,
    pub updated_by: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, url_pattern: Regex, allow: RoleSet) -> Self {
        Self {
            name: name.into(),
            url_pattern,
            allow,
            methods: None,
            enabled: true,
            routes: Vec::new(),
            updated_by: None,
        }
    }

    /// Restrict the channel to `methods`. An empty restriction clears it.
    pub fn with_methods(mut self, methods: MethodSet) -> Self {
        self.methods = if methods.is_empty() { None } else { Some(methods) };
        self
    }

    pub fn with_route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    pub fn matches_path(&self, path: &str) -> bool {
        self.url_pattern.is_match(path)
    }

    pub fn permits(&self, roles: &RoleSet) -> bool {
        self.allow.intersects(roles)
    }
}
