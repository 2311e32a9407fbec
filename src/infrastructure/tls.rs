use std::sync::Arc;
use log::debug;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::io::AsyncWriteExt;
use tokio_rustls::TlsConnector;
use crate::domain::VmInfoError;
use crate::ports::CertificateSource;
use super::tcp::connect;

/// Accepts any certificate chain (trust on first use). Handshake signatures are still verified.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(&self, message: &[u8], cert: &CertificateDer<'_>, dss: &DigitallySignedStruct) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(&self, message: &[u8], cert: &CertificateDer<'_>, dss: &DigitallySignedStruct) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

pub struct RustlsCertificateSource {
    connector: TlsConnector,
}

impl RustlsCertificateSource {
    pub fn new() -> Result<Self, VmInfoError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| VmInfoError::other(format!("failed to configure TLS: {}", e)))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
            .with_no_client_auth();
        Ok(Self { connector: TlsConnector::from(Arc::new(config)) })
    }
}

impl CertificateSource for RustlsCertificateSource {
    async fn leaf_certificate(&self, host: &str, port: u16) -> Result<Vec<u8>, VmInfoError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| VmInfoError::fingerprint(format!("invalid server name: {}", host)))?;

        let stream = connect(host, port).await?;
        let mut tls_stream = self.connector.connect(server_name, stream).await
            .map_err(|e| VmInfoError::fingerprint(format!("TLS handshake failed: {}", e)))?;

        let (_, conn) = tls_stream.get_ref();
        let leaf = conn.peer_certificates()
            .and_then(|certs| certs.first())
            .map(|c| c.as_ref().to_vec())
            .ok_or_else(|| VmInfoError::fingerprint(format!("{}:{} presented no certificate", host, port)));

        if let Err(e) = tls_stream.shutdown().await {
            debug!("TLS shutdown with {}:{} failed: {}", host, port, e);
        }
        leaf
    }
}
