//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the single mediation handler
//! - Wire up middleware (request ID, tracing)
//! - Buffer inbound bodies up to the configured limit
//! - Hand requests to the `Mediator` and translate its result to HTTP
//! - Apply hot-reloaded channel and client registries
//! - Serve plain TCP or TLS with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsAcceptor;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthMode, PeerCertificate};
use crate::config::{build_registry, resolve_auth_mode, ConfigError, MediatorConfig};
use crate::error::{MediatorError, TRANSACTION_ID_HEADER};
use crate::forwarding::HttpUpstream;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::mediator::{InboundRequest, MediatedResponse, Mediator};
use crate::net::{ListenerTls, PeerCertificateAcceptor};
use crate::observability::metrics;
use crate::repository::InMemoryRepository;

const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub mediator: Arc<Mediator>,
    pub max_body_bytes: usize,
}

/// HTTP front end of the mediator.
pub struct HttpServer {
    router: Router,
    repository: Arc<InMemoryRepository>,
    auth_mode: AuthMode,
}

impl HttpServer {
    /// Build the server from a configuration. Fails on an invalid config.
    pub fn new(config: MediatorConfig) -> Result<Self, ConfigError> {
        let registry = build_registry(&config)?;
        let auth_mode = resolve_auth_mode(&config.auth).map_err(|e| ConfigError::Validation(vec![e]))?;

        tracing::info!(
            channels = registry.channel_count(),
            clients = registry.client_count(),
            auth_mode = ?auth_mode,
            "Registry loaded"
        );

        let repository = Arc::new(InMemoryRepository::with_retention(
            registry,
            config.routing.max_retained_transactions,
        ));
        let upstream = Arc::new(HttpUpstream::new(config.listener.max_body_bytes));
        let mediator = Arc::new(Mediator::new(
            auth_mode,
            repository.clone(),
            upstream,
            Duration::from_millis(config.routing.default_timeout_ms),
        ));

        let state = AppState {
            mediator,
            max_body_bytes: config.listener.max_body_bytes,
        };

        Ok(Self {
            router: Self::build_router(state),
            repository,
            auth_mode,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(mediate_handler))
            .route("/", any(mediate_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Store backing this server; transactions can be inspected through it.
    pub fn repository(&self) -> Arc<InMemoryRepository> {
        self.repository.clone()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<MediatorConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reloader = self.spawn_reloader(config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    ///
    /// With client authentication on, each request carries the verified
    /// client certificate as a `PeerCertificate` extension.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: ListenerTls,
        config_updates: mpsc::UnboundedReceiver<MediatorConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, client_auth = tls.client_auth, "HTTPS server starting");

        let reloader = self.spawn_reloader(config_updates);
        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            shutdown_handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let server = axum_server::bind(addr).handle(handle);
        if tls.client_auth {
            server
                .acceptor(PeerCertificateAcceptor::new(tls.config))
                .serve(self.router.into_make_service())
                .await?;
        } else {
            server
                .acceptor(RustlsAcceptor::new(tls.config))
                .serve(self.router.into_make_service())
                .await?;
        }

        reloader.abort();
        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Swap in each valid registry received on `updates`.
    ///
    /// Listener, auth mode and timeouts are fixed at startup; only channels
    /// and clients change.
    fn spawn_reloader(&self, mut updates: mpsc::UnboundedReceiver<MediatorConfig>) -> JoinHandle<()> {
        let repository = self.repository.clone();
        let auth_mode = self.auth_mode;

        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                if let Ok(mode) = resolve_auth_mode(&config.auth) {
                    if mode != auth_mode {
                        tracing::warn!(
                            current = ?auth_mode,
                            requested = ?mode,
                            "Authentication mode changes require a restart; keeping current mode"
                        );
                    }
                }

                match build_registry(&config) {
                    Ok(registry) => {
                        tracing::info!(
                            channels = registry.channel_count(),
                            clients = registry.client_count(),
                            "Registry reloaded"
                        );
                        repository.replace_registry(registry);
                    }
                    Err(e) => tracing::error!(error = %e, "Rejected configuration update"),
                }
            }
        })
    }
}

/// Buffer the request, run it through the mediator, relay the primary's
/// response.
async fn mediate_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().to_string();

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            let err = MediatorError::RequestBody(e.to_string());
            metrics::record_request(&method, err.status_code().as_u16(), "none", start);
            return err.into_response();
        }
    };

    let inbound = InboundRequest {
        peer_certificate: parts.extensions.get::<PeerCertificate>().cloned(),
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };

    tracing::debug!(
        request_id = %request_id,
        method = %inbound.method,
        path = %inbound.uri.path(),
        "Mediating request"
    );

    match state.mediator.handle(inbound).await {
        Ok(mediated) => {
            metrics::record_request(&method, mediated.status.as_u16(), &mediated.channel, start);
            tracing::info!(
                request_id = %request_id,
                transaction_id = %mediated.transaction_id,
                channel = %mediated.channel,
                status = mediated.status.as_u16(),
                secondaries = mediated.secondaries.len(),
                "Request mediated"
            );
            relay(mediated)
        }
        Err(e) => {
            metrics::record_request(&method, e.status_code().as_u16(), "none", start);
            e.into_response()
        }
    }
}

fn relay(mediated: MediatedResponse) -> Response {
    let MediatedResponse {
        transaction_id,
        status,
        headers,
        body,
        secondaries,
        ..
    } = mediated;
    // Detached: mirrored calls finish and record on their own.
    drop(secondaries);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    if let Ok(value) = HeaderValue::from_str(&transaction_id.to_string()) {
        response.headers_mut().insert(TRANSACTION_ID_HEADER, value);
    }
    response
}
