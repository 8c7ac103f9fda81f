//! Request mediation pipeline.
//!
//! ```text
//! InboundRequest
//!     → Gatekeeper        (401 before anything else runs)
//!     → find_channel      (404)
//!     → check_method      (405, no backend traffic)
//!     → select_routes     (500 on a channel with no enabled primary)
//!     → recorder.begin    (transaction exists before any backend call)
//!     → Multiplexer       (primary awaited; secondaries detached)
//!     → recorder.record_primary
//!     → MediatedResponse  (primary status/headers/body)
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use bytes::Bytes;
use uuid::Uuid;

use crate::auth::{AuthMode, Gatekeeper, PeerCertificate};
use crate::error::{MediatorError, MediatorResult};
use crate::forwarding::{ForwardRequest, Multiplexer, SecondaryDispatch, Upstream};
use crate::model::RouteResult;
use crate::recorder::TransactionRecorder;
use crate::repository::Repository;
use crate::routing::{check_method, find_channel, select_routes};

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub peer_certificate: Option<PeerCertificate>,
}

impl InboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer_certificate: None,
        }
    }
}

/// The primary route's response plus a handle on the mirrored calls.
#[derive(Debug)]
pub struct MediatedResponse {
    pub transaction_id: Uuid,
    pub channel: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Drop to detach; await `settled()` to observe completion.
    pub secondaries: SecondaryDispatch,
}

pub struct Mediator {
    repository: Arc<dyn Repository>,
    gatekeeper: Gatekeeper,
    recorder: TransactionRecorder,
    multiplexer: Multiplexer,
}

impl Mediator {
    pub fn new(
        auth_mode: AuthMode,
        repository: Arc<dyn Repository>,
        upstream: Arc<dyn Upstream>,
        default_timeout: Duration,
    ) -> Self {
        let recorder = TransactionRecorder::new(repository.clone());
        Self {
            gatekeeper: Gatekeeper::new(auth_mode, repository.clone()),
            multiplexer: Multiplexer::new(upstream, recorder.clone(), default_timeout),
            recorder,
            repository,
        }
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.gatekeeper.mode()
    }

    pub async fn handle(&self, inbound: InboundRequest) -> MediatorResult<MediatedResponse> {
        let client = self
            .gatekeeper
            .authenticate(&inbound.headers, inbound.peer_certificate.as_ref())
            .await
            .map_err(|source| {
                tracing::warn!(reason = %source, mode = ?self.gatekeeper.mode(), "Authentication failed");
                MediatorError::Authentication {
                    mode: self.gatekeeper.mode(),
                    source,
                }
            })?;

        let channels = self.repository.find_channels_ordered().await?;
        let path = inbound.uri.path();
        let channel = find_channel(&channels, path, &client.roles).ok_or_else(|| {
            tracing::info!(path = %path, client = %client.client_id, "No channel matched");
            MediatorError::NoChannelMatch { path: path.to_string() }
        })?;

        check_method(&channel, &inbound.method)?;

        let selection = select_routes(&channel.routes).ok_or_else(|| {
            tracing::error!(
                channel = %channel.name,
                routes = channel.routes.len(),
                "Channel has no enabled primary route; refusing to forward"
            );
            MediatorError::RouteConfigurationFault {
                channel: channel.name.clone(),
            }
        })?;

        let request = Arc::new(ForwardRequest::new(
            inbound.method,
            &inbound.uri,
            &inbound.headers,
            inbound.body,
        ));
        let transaction_id = self.recorder.begin(request.recorded(), &client, &channel).await?;
        let primary_route = selection.primary.name.clone();

        tracing::debug!(
            transaction_id = %transaction_id,
            channel = %channel.name,
            primary = %primary_route,
            secondaries = selection.secondaries.len(),
            "Routing request"
        );

        let forwarded = self.multiplexer.forward(transaction_id, request, selection).await;

        let outcome = match &forwarded.primary {
            Ok(response) => RouteResult::Response(response.recorded()),
            Err(e) => RouteResult::Failure { error: e.to_string() },
        };
        if let Err(e) = self.recorder.record_primary(transaction_id, outcome).await {
            tracing::error!(transaction_id = %transaction_id, error = %e, "Failed to record primary response");
        }

        match forwarded.primary {
            Ok(response) => Ok(MediatedResponse {
                transaction_id,
                channel: channel.name.clone(),
                status: response.status,
                headers: response.headers,
                body: response.body,
                secondaries: forwarded.secondaries,
            }),
            Err(source) => {
                tracing::error!(
                    transaction_id = %transaction_id,
                    route = %primary_route,
                    error = %source,
                    "Primary route failed"
                );
                Err(MediatorError::Upstream {
                    route: primary_route,
                    transaction_id,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_password, HashAlgorithm};
    use crate::forwarding::{ForwardError, UpstreamResponse};
    use crate::model::{Channel, Client, MethodSet, PasswordCredential, RoleSet, RouteDescriptor, TransactionStatus};
    use crate::repository::{InMemoryRepository, Registry};
    use async_trait::async_trait;
    use axum::http::{header, HeaderValue};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use regex::Regex;
    use std::sync::Mutex;

    /// Echoes the route name; records which routes were called.
    #[derive(Default)]
    struct EchoUpstream {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Upstream for EchoUpstream {
        async fn send(
            &self,
            route: &RouteDescriptor,
            _request: &ForwardRequest,
            _timeout: Duration,
        ) -> Result<UpstreamResponse, ForwardError> {
            self.calls.lock().unwrap().push(route.name.clone());
            if route.port == 1 {
                return Err(ForwardError::Connect("refused".into()));
            }
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::from(route.name.clone()),
            })
        }
    }

    fn client() -> Client {
        let mut client = Client::new("lab", RoleSet::new(["lab"]));
        client.password = Some(PasswordCredential {
            algorithm: HashAlgorithm::Sha256,
            hash: hash_password(HashAlgorithm::Sha256, "pw", "s"),
            salt: "s".into(),
        });
        client
    }

    fn channel(name: &str, path: &str, routes: Vec<RouteDescriptor>) -> Channel {
        let mut channel = Channel::new(name, Regex::new(&format!("^{}$", path)).unwrap(), RoleSet::new(["lab"]));
        channel.routes = routes;
        channel
    }

    fn route(name: &str) -> RouteDescriptor {
        RouteDescriptor::new(name, "127.0.0.1", 9000)
    }

    fn setup(channels: Vec<Channel>) -> (Mediator, Arc<InMemoryRepository>, Arc<EchoUpstream>) {
        let repo = Arc::new(InMemoryRepository::new(Registry::new(channels, vec![client()])));
        let upstream = Arc::new(EchoUpstream::default());
        let mediator = Mediator::new(AuthMode::Basic, repo.clone(), upstream.clone(), Duration::from_secs(1));
        (mediator, repo, upstream)
    }

    fn request(method: Method, path: &str, password: &str) -> InboundRequest {
        let mut inbound = InboundRequest::new(method, path.parse().unwrap());
        let token = BASE64.encode(format!("lab:{}", password));
        inbound.headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", token)).unwrap(),
        );
        inbound
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let (mediator, repo, _) = setup(vec![channel("c", "/c", vec![route("main").primary(), route("mirror")])]);

        let response = mediator.handle(request(Method::GET, "/c", "pw")).await.unwrap();
        assert_eq!(response.body, Bytes::from("main"));
        let id = response.transaction_id;
        response.secondaries.settled().await;

        let tx = repo.find_transaction(id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Successful);
        assert_eq!(tx.routes.len(), 1);
        assert_eq!(tx.routes[0].name, "mirror");
    }

    #[tokio::test]
    async fn test_auth_runs_before_matching() {
        let (mediator, repo, upstream) = setup(vec![channel("c", "/c", vec![route("main").primary()])]);

        let err = mediator.handle(request(Method::GET, "/c", "wrong")).await.unwrap_err();
        assert!(matches!(err, MediatorError::Authentication { .. }));
        // Unknown path gives the same answer: channel existence is not leaked.
        let err = mediator.handle(request(Method::GET, "/nope", "wrong")).await.unwrap_err();
        assert!(matches!(err, MediatorError::Authentication { .. }));

        assert!(upstream.calls.lock().unwrap().is_empty());
        assert_eq!(repo.transaction_count(), 0);
    }

    fn assert_nothing_forwarded_or_recorded(repo: &InMemoryRepository, upstream: &EchoUpstream) {
        assert!(upstream.calls.lock().unwrap().is_empty());
        assert_eq!(repo.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_no_channel_match_records_nothing() {
        let (mediator, repo, upstream) = setup(vec![channel("c", "/c", vec![route("main").primary()])]);

        let err = mediator.handle(request(Method::GET, "/missing", "pw")).await.unwrap_err();
        assert!(matches!(err, MediatorError::NoChannelMatch { .. }));
        assert_nothing_forwarded_or_recorded(&repo, &upstream);
    }

    #[tokio::test]
    async fn test_method_not_allowed_records_nothing() {
        let get_only = channel("get-only", "/g", vec![route("main").primary()]).with_methods(MethodSet::new(["GET"]));
        let (mediator, repo, upstream) = setup(vec![get_only]);

        let err = mediator.handle(request(Method::POST, "/g", "pw")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request with method POST is not allowed. Only GET methods are allowed"
        );
        assert_nothing_forwarded_or_recorded(&repo, &upstream);
    }

    #[tokio::test]
    async fn test_missing_primary_records_nothing() {
        let no_primary = channel("broken", "/b", vec![route("a"), route("b").primary().disabled()]);
        let (mediator, repo, upstream) = setup(vec![no_primary]);

        let err = mediator.handle(request(Method::GET, "/b", "pw")).await.unwrap_err();
        assert!(matches!(err, MediatorError::RouteConfigurationFault { ref channel } if channel == "broken"));
        assert_nothing_forwarded_or_recorded(&repo, &upstream);
    }

    #[tokio::test]
    async fn test_primary_failure_is_recorded_and_surfaced() {
        let down = RouteDescriptor::new("down", "127.0.0.1", 1).primary();
        let (mediator, repo, _) = setup(vec![channel("c", "/c", vec![down, route("mirror")])]);

        let err = mediator.handle(request(Method::GET, "/c", "pw")).await.unwrap_err();
        let id = match err {
            MediatorError::Upstream { transaction_id, ref route, .. } => {
                assert_eq!(route, "down");
                transaction_id
            }
            other => panic!("unexpected error {:?}", other),
        };

        let tx = repo.find_transaction(id).await.unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert!(tx.error.is_some());
    }
}
