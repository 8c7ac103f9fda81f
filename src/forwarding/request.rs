//! The replayable request forwarded to every route.
//!
//! # Responsibilities
//! - Hold one buffered copy of the inbound request (method, headers, body)
//! - Build a per-route HTTP request: authority, `Host` and optionally the
//!   path substituted, everything else identical
//! - Produce the recorded form of the request for transactions
//!
//! # Design Decisions
//! - Hop-by-hop headers are dropped once, at construction
//! - The caller's `Authorization` header is never forwarded or recorded;
//!   routes with their own credentials get a fresh Basic header

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::forwarding::ForwardError;
use crate::model::{RecordedRequest, RouteDescriptor};

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub(crate) fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy `headers` without hop-by-hop entries, including any header named
/// by a `Connection` option.
pub(crate) fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let connection_options: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|option| option.trim().to_ascii_lowercase())
        .filter(|option| !option.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let listed = connection_options.iter().any(|option| option == name.as_str());
        if !is_hop_by_hop(name) && !listed {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Flatten headers for recording. Repeated headers are joined with `, `;
/// values that are not valid UTF-8 are skipped.
pub fn record_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        if name == header::AUTHORIZATION {
            continue;
        }
        let Ok(value) = value.to_str() else { continue };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

#[derive(Debug, Clone)]
pub struct ForwardRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    received_at: DateTime<Utc>,
}

impl ForwardRequest {
    pub fn new(method: Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Self {
        let mut headers = end_to_end_headers(headers);
        headers.remove(header::HOST);
        headers.remove(header::AUTHORIZATION);

        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
            body,
            received_at: Utc::now(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    fn path_for<'a>(&'a self, route: &'a RouteDescriptor) -> &'a str {
        route.path.as_deref().unwrap_or(&self.path)
    }

    /// `http://host:port/path?query` for `route`.
    pub fn target_uri(&self, route: &RouteDescriptor) -> Result<Uri, ForwardError> {
        let mut target = format!("http://{}{}", route.authority(), self.path_for(route));
        if let Some(query) = &self.query {
            target.push('?');
            target.push_str(query);
        }
        target
            .parse::<Uri>()
            .map_err(|e| ForwardError::InvalidTarget(format!("{}: {}", target, e)))
    }

    /// Build the HTTP request sent to `route`.
    pub fn to_http(&self, route: &RouteDescriptor) -> Result<Request<Body>, ForwardError> {
        let uri = self.target_uri(route)?;
        let host = HeaderValue::from_str(&route.authority())
            .map_err(|e| ForwardError::InvalidTarget(e.to_string()))?;

        let mut builder = Request::builder().method(self.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
            headers.insert(header::HOST, host);
            if let Some(creds) = &route.credentials {
                let token = BASE64.encode(format!("{}:{}", creds.username, creds.password));
                let value = HeaderValue::from_str(&format!("Basic {}", token))
                    .map_err(|e| ForwardError::InvalidTarget(e.to_string()))?;
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        builder
            .body(Body::from(self.body.clone()))
            .map_err(|e| ForwardError::InvalidTarget(e.to_string()))
    }

    /// The request as the mediator received it.
    pub fn recorded(&self) -> RecordedRequest {
        RecordedRequest {
            method: self.method.to_string(),
            path: self.path.clone(),
            query: self.query.clone(),
            headers: record_headers(&self.headers),
            body: String::from_utf8_lossy(&self.body).into_owned(),
            timestamp: self.received_at,
        }
    }

    /// The request as sent to `route`.
    pub fn recorded_for(&self, route: &RouteDescriptor) -> RecordedRequest {
        let mut recorded = self.recorded();
        recorded.path = self.path_for(route).to_string();
        recorded
            .headers
            .insert(header::HOST.as_str().to_string(), route.authority());
        recorded.timestamp = Utc::now();
        recorded
    }
}
