mod cert_source;
mod management;
mod renderer;

pub use cert_source::CertificateSource;
pub use management::{ManagedObjectRef, ManagementClient};
pub use renderer::Renderer;
