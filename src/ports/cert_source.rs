use crate::domain::VmInfoError;

pub trait CertificateSource: Send + Sync {
    /// DER bytes of the leaf certificate presented by `host:port`.
    fn leaf_certificate(&self, host: &str, port: u16) -> impl std::future::Future<Output = Result<Vec<u8>, VmInfoError>> + Send;
}
