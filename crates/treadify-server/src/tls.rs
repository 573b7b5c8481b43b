use std::io::{BufReader, Cursor};
use std::sync::Arc;

use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::CertificateDer;

/// Build a TLS acceptor from PEM-encoded certificate chain and private key.
pub fn acceptor(cert_pem: &str, key_pem: &str) -> anyhow::Result<TlsAcceptor> {
    let cert_reader = &mut BufReader::new(Cursor::new(cert_pem.as_bytes()));
    let certs: Vec<CertificateDer<'static>> = certs(cert_reader).collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        anyhow::bail!("No certificates found in CERT_PEM");
    }

    let key_reader = &mut BufReader::new(Cursor::new(key_pem.as_bytes()));
    let Some(key) = private_key(key_reader)? else {
        anyhow::bail!("No private key found in KEY_PEM");
    };

    let mut tls_config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    tls_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}
