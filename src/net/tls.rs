//! TLS configuration, certificate loading and client certificate capture.

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tokio::io::{AsyncRead, AsyncWrite};
use tower_http::add_extension::AddExtension;

use crate::auth::PeerCertificate;
use crate::config::schema::TlsConfig;

/// Loaded listener TLS state.
#[derive(Clone)]
pub struct ListenerTls {
    pub config: RustlsConfig,
    /// Clients must present a certificate chaining to the configured CA.
    pub client_auth: bool,
}

/// Load the listener's certificate chain, private key and, when
/// `client_ca_path` is set, the CA bundle client certificates must chain to.
pub async fn load_tls_config(config: &TlsConfig) -> Result<ListenerTls, io::Error> {
    let certs = read_certificates(Path::new(&config.cert_path), "Certificate").await?;
    let key = read_private_key(Path::new(&config.key_path)).await?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(invalid_data)?;

    let (builder, client_auth) = match &config.client_ca_path {
        Some(ca_path) => {
            let mut roots = RootCertStore::empty();
            for cert in read_certificates(Path::new(ca_path), "Client CA").await? {
                roots.add(cert).map_err(invalid_data)?;
            }
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .build()
                .map_err(invalid_data)?;
            (builder.with_client_cert_verifier(verifier), true)
        }
        None => (builder.with_no_client_auth(), false),
    };

    let mut server_config = builder.with_single_cert(certs, key).map_err(invalid_data)?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(ListenerTls {
        config: RustlsConfig::from_config(Arc::new(server_config)),
        client_auth,
    })
}

async fn read_certificates(path: &Path, what: &str) -> Result<Vec<CertificateDer<'static>>, io::Error> {
    let pem = read_pem(path, what).await?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice()).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} file contains no certificates: {:?}", what, path),
        ));
    }
    Ok(certs)
}

async fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, io::Error> {
    let pem = read_pem(path, "Private key").await?;
    rustls_pemfile::private_key(&mut pem.as_slice())?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Private key file contains no key: {:?}", path),
        )
    })
}

async fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>, io::Error> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} file not found: {:?}", what, path),
        ));
    }
    tokio::fs::read(path).await
}

fn invalid_data<E: std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// Rustls acceptor that attaches the verified end-entity certificate to
/// every request on the connection as a `PeerCertificate` extension.
#[derive(Clone)]
pub struct PeerCertificateAcceptor {
    inner: RustlsAcceptor,
}

impl PeerCertificateAcceptor {
    pub fn new(config: RustlsConfig) -> Self {
        Self {
            inner: RustlsAcceptor::new(config),
        }
    }
}

type AcceptFuture<T, S> = Pin<Box<dyn Future<Output = io::Result<(T, S)>> + Send>>;

impl<I, S> Accept<I, S> for PeerCertificateAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = <RustlsAcceptor as Accept<I, S>>::Stream;
    type Service = AddExtension<S, PeerCertificate>;
    type Future = AcceptFuture<Self::Stream, Self::Service>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            let (stream, service) = inner.accept(stream, service).await?;
            let (_, session) = stream.get_ref();
            let der = session
                .peer_certificates()
                .and_then(|chain| chain.first())
                .map(|cert| cert.as_ref().to_vec())
                .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "client presented no certificate"))?;
            Ok((stream, AddExtension::new(service, PeerCertificate(der))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/tls/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn tls_config(client_ca_path: Option<String>) -> TlsConfig {
        TlsConfig {
            cert_path: fixture("server.pem"),
            key_path: fixture("server.key"),
            client_ca_path,
        }
    }

    #[tokio::test]
    async fn test_missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = TlsConfig {
            cert_path: dir.path().join("cert.pem").display().to_string(),
            key_path: dir.path().join("key.pem").display().to_string(),
            client_ca_path: None,
        };
        let err = match load_tls_config(&config).await {
            Ok(_) => panic!("expected missing certificate error"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("Certificate"));
    }

    #[tokio::test]
    async fn test_server_only_tls() {
        let tls = load_tls_config(&tls_config(None)).await.unwrap();
        assert!(!tls.client_auth);
    }

    #[tokio::test]
    async fn test_client_ca_enables_client_auth() {
        let tls = load_tls_config(&tls_config(Some(fixture("ca.pem")))).await.unwrap();
        assert!(tls.client_auth);
    }

    #[tokio::test]
    async fn test_client_ca_without_certificates_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.pem");
        std::fs::write(&empty, "").unwrap();

        let err = match load_tls_config(&tls_config(Some(empty.display().to_string()))).await {
            Ok(_) => panic!("expected an empty CA bundle to be rejected"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
