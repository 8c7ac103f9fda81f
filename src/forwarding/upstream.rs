//! Outbound calls to routes.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::forwarding::request::{end_to_end_headers, record_headers};
use crate::forwarding::{ForwardError, ForwardRequest};
use crate::model::{RecordedResponse, RouteDescriptor};

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn recorded(&self) -> RecordedResponse {
        RecordedResponse {
            status: self.status.as_u16(),
            headers: record_headers(&self.headers),
            body: String::from_utf8_lossy(&self.body).into_owned(),
            timestamp: Utc::now(),
        }
    }
}

/// Sends a request to one route and waits for its full response.
///
/// Any status code is a response; only transport problems and timeouts
/// are errors.
#[async_trait]
pub trait Upstream: Send + Sync + 'static {
    async fn send(
        &self,
        route: &RouteDescriptor,
        request: &ForwardRequest,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ForwardError>;
}

/// Plain-HTTP upstream backed by the hyper-util pooled client.
#[derive(Clone)]
pub struct HttpUpstream {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HttpUpstream {
    pub fn new(max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, max_body_bytes }
    }

    async fn exchange(&self, route: &RouteDescriptor, request: &ForwardRequest) -> Result<UpstreamResponse, ForwardError> {
        let outbound = request.to_http(route)?;
        let response = self
            .client
            .request(outbound)
            .await
            .map_err(|e| ForwardError::Connect(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| ForwardError::Body(e.to_string()))?;

        Ok(UpstreamResponse {
            status: parts.status,
            headers: end_to_end_headers(&parts.headers),
            body,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(
        &self,
        route: &RouteDescriptor,
        request: &ForwardRequest,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ForwardError> {
        tokio::time::timeout(timeout, self.exchange(route, request))
            .await
            .map_err(|_| ForwardError::Timeout(timeout))?
    }
}
