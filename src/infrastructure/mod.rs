mod renderer;
mod soap;
mod tcp;
mod tls;
mod vim;
mod vsphere;

pub use renderer::TextRenderer;
pub use tls::RustlsCertificateSource;
pub use vsphere::{VsphereSession, VsphereSoapClient};
