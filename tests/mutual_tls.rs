//! Mutual TLS authentication over a real rustls listener.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use interop_mediator::auth::gatekeeper::certificate_fingerprint;
use interop_mediator::config::schema::TlsConfig;
use interop_mediator::config::{ClientConfig, MediatorConfig};
use interop_mediator::http::HttpServer;
use interop_mediator::lifecycle::Shutdown;
use interop_mediator::net::load_tls_config;

mod common;

use common::{channel, config, start_backend, Backend};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/tls/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn read_fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).unwrap()
}

fn fingerprint_of(name: &str) -> String {
    let pem = read_fixture(name);
    let cert = rustls_pemfile::certs(&mut pem.as_slice()).next().unwrap().unwrap();
    certificate_fingerprint(cert.as_ref())
}

fn device_client() -> ClientConfig {
    ClientConfig {
        client_id: "lab-device".into(),
        name: None,
        domain: None,
        roles: vec![common::ROLE.into()],
        password_algorithm: None,
        password_hash: None,
        password_salt: None,
        cert_fingerprint: Some(fingerprint_of("client.pem")),
    }
}

fn mtls_config(backend: &Backend) -> MediatorConfig {
    let mut config = config(vec![channel("results", "^/results$", vec![backend.primary_route()])]);
    config.auth.enable_basic_auth = false;
    config.auth.enable_mutual_tls = true;
    config.listener.tls = Some(TlsConfig {
        cert_path: fixture("server.pem"),
        key_path: fixture("server.key"),
        client_ca_path: Some(fixture("ca.pem")),
    });
    config.clients = vec![device_client()];
    config
}

struct TlsMediator {
    addr: SocketAddr,
    _shutdown: Shutdown,
}

async fn start_tls_mediator(config: MediatorConfig) -> TlsMediator {
    let tls = load_tls_config(config.listener.tls.as_ref().unwrap()).await.unwrap();
    let server = HttpServer::new(config).unwrap();

    let addr = {
        let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
        reserved.local_addr().unwrap()
    };

    let shutdown = Shutdown::new();
    let (_updates, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run_tls(addr, tls, config_updates, server_shutdown).await;
    });

    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    TlsMediator {
        addr,
        _shutdown: shutdown,
    }
}

fn tls_client(addr: SocketAddr, identity: Option<(&str, &str)>) -> reqwest::Client {
    let ca = reqwest::Certificate::from_pem(&read_fixture("ca.pem")).unwrap();
    let mut builder = reqwest::Client::builder()
        .add_root_certificate(ca)
        .resolve("localhost", addr)
        .pool_max_idle_per_host(0)
        .no_proxy();
    if let Some((cert, key)) = identity {
        let identity = reqwest::Identity::from_pkcs8_pem(&read_fixture(cert), &read_fixture(key)).unwrap();
        builder = builder.identity(identity);
    }
    builder.build().unwrap()
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("https://localhost:{}{}", addr.port(), path)
}

#[tokio::test]
async fn test_registered_certificate_is_mediated() {
    let backend = start_backend("A").await;
    let mediator = start_tls_mediator(mtls_config(&backend)).await;

    let res = tls_client(mediator.addr, Some(("client.pem", "client.key")))
        .post(url(mediator.addr, "/results"))
        .body("<observation/>")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-transaction-id"));
    assert_eq!(res.text().await.unwrap(), "A");
    assert_eq!(backend.calls(), 1);
    assert_eq!(backend.received()[0].body, "<observation/>");
}

#[tokio::test]
async fn test_unregistered_certificate_is_unauthorized() {
    let backend = start_backend("A").await;
    let mut config = mtls_config(&backend);
    config.clients[0].cert_fingerprint = Some(fingerprint_of("server.pem"));
    let mediator = start_tls_mediator(config).await;

    let res = tls_client(mediator.addr, Some(("client.pem", "client.key")))
        .get(url(mediator.addr, "/results"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_missing_client_certificate_fails_handshake() {
    let backend = start_backend("A").await;
    let mediator = start_tls_mediator(mtls_config(&backend)).await;

    let result = tls_client(mediator.addr, None)
        .get(url(mediator.addr, "/results"))
        .send()
        .await;

    assert!(result.is_err());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_certificate_from_untrusted_ca_fails_handshake() {
    let backend = start_backend("A").await;
    let mut config = mtls_config(&backend);
    config.clients[0].cert_fingerprint = Some(fingerprint_of("stranger.pem"));
    let mediator = start_tls_mediator(config).await;

    let result = tls_client(mediator.addr, Some(("stranger.pem", "stranger.key")))
        .get(url(mediator.addr, "/results"))
        .send()
        .await;

    assert!(result.is_err());
    assert_eq!(backend.calls(), 0);
}
