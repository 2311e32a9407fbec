use super::{Fingerprint, VmRecord};

#[derive(Debug, Clone)]
pub struct Report {
    pub vm: VmRecord,
    /// `None` when the server certificate could not be read.
    pub thumbprint: Option<Fingerprint>,
    pub url: String,
}

impl Report {
    pub fn new(vm: VmRecord, thumbprint: Option<Fingerprint>, url: String) -> Self {
        Self { vm, thumbprint, url }
    }
}
