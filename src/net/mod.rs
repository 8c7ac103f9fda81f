//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly in `main.rs`; this module holds
//! the TLS configuration used when `[listener.tls]` is set. With a
//! `client_ca_path`, rustls verifies client certificates during the
//! handshake and `PeerCertificateAcceptor` attaches the verified leaf to
//! each request as a `PeerCertificate` extension.

pub mod tls;

pub use tls::{load_tls_config, ListenerTls, PeerCertificateAcceptor};
