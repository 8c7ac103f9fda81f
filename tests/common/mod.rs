//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use uuid::Uuid;

use interop_mediator::auth::password::{hash_password, HashAlgorithm};
use interop_mediator::config::{ChannelConfig, ClientConfig, MediatorConfig, RouteConfig, StatusConfig};
use interop_mediator::error::TRANSACTION_ID_HEADER;
use interop_mediator::http::HttpServer;
use interop_mediator::lifecycle::Shutdown;
use interop_mediator::model::Transaction;
use interop_mediator::repository::{InMemoryRepository, Repository};

pub const CLIENT_ID: &str = "lab";
pub const PASSWORD: &str = "secret";
pub const ROLE: &str = "lab";

/// One request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub host: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct BackendState {
    name: &'static str,
    status: StatusCode,
    delay: Duration,
    log: Arc<Mutex<Vec<Received>>>,
}

/// A mock backend that answers every request with its own name.
pub struct Backend {
    pub name: &'static str,
    pub addr: SocketAddr,
    log: Arc<Mutex<Vec<Received>>>,
}

impl Backend {
    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<Received> {
        self.log.lock().unwrap().clone()
    }

    pub fn route(&self) -> RouteConfig {
        RouteConfig::new(self.name, "127.0.0.1", self.addr.port())
    }

    pub fn primary_route(&self) -> RouteConfig {
        let mut route = self.route();
        route.primary = true;
        route
    }
}

async fn backend_handler(State(state): State<BackendState>, request: Request<Body>) -> (StatusCode, String) {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let header_value = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.log.lock().unwrap().push(Received {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        host: header_value(header::HOST),
        authorization: header_value(header::AUTHORIZATION),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.name.to_string())
}

/// Start a backend on an ephemeral port returning `status` after `delay`.
pub async fn start_backend_with(name: &'static str, status: StatusCode, delay: Duration) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let state = BackendState {
        name,
        status,
        delay,
        log: log.clone(),
    };
    let app = Router::new().fallback(backend_handler).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Backend { name, addr, log }
}

pub async fn start_backend(name: &'static str) -> Backend {
    start_backend_with(name, StatusCode::OK, Duration::ZERO).await
}

/// A port with nothing listening on it.
pub async fn dead_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn client_config() -> ClientConfig {
    ClientConfig {
        client_id: CLIENT_ID.into(),
        name: Some("Lab system".into()),
        domain: None,
        roles: vec![ROLE.into()],
        password_algorithm: Some(HashAlgorithm::Sha512),
        password_hash: Some(hash_password(HashAlgorithm::Sha512, PASSWORD, "pepper")),
        password_salt: Some("pepper".into()),
        cert_fingerprint: None,
    }
}

pub fn channel(name: &str, url_pattern: &str, routes: Vec<RouteConfig>) -> ChannelConfig {
    ChannelConfig {
        name: name.into(),
        url_pattern: url_pattern.into(),
        allow: vec![ROLE.into()],
        methods: None,
        status: Some(StatusConfig::Enabled),
        updated_by: None,
        routes,
    }
}

pub fn config(channels: Vec<ChannelConfig>) -> MediatorConfig {
    let mut config = MediatorConfig::default();
    config.routing.default_timeout_ms = 5_000;
    config.clients.push(client_config());
    config.channels = channels;
    config
}

/// A mediator serving on an ephemeral port.
pub struct RunningMediator {
    pub addr: SocketAddr,
    pub repository: Arc<InMemoryRepository>,
    pub updates: mpsc::UnboundedSender<MediatorConfig>,
    pub shutdown: Shutdown,
}

impl RunningMediator {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Poll until `done` holds for transaction `id`, or panic after 5s.
    pub async fn wait_for_transaction<F>(&self, id: Uuid, done: F) -> Transaction
    where
        F: Fn(&Transaction) -> bool,
    {
        for _ in 0..100 {
            if let Some(tx) = self.repository.find_transaction(id).await.unwrap() {
                if done(&tx) {
                    return tx;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("transaction {} did not reach the expected state", id);
    }
}

pub async fn start_mediator(config: MediatorConfig) -> RunningMediator {
    let server = HttpServer::new(config).unwrap();
    let repository = server.repository();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    RunningMediator {
        addr,
        repository,
        updates,
        shutdown,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn transaction_id(response: &reqwest::Response) -> Uuid {
    let value = response
        .headers()
        .get(TRANSACTION_ID_HEADER)
        .expect("response carries a transaction id")
        .to_str()
        .unwrap();
    Uuid::parse_str(value).unwrap()
}

/// Wait until `check` holds, polling every 20ms for up to 5s.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..250 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
