use url::Url;
use crate::domain::{ConfigBag, VmInfoError};

/// Typed reference to a server-side managed object, e.g. `Datacenter:datacenter-3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedObjectRef {
    pub kind: String,
    pub value: String,
}

impl ManagedObjectRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self { kind: kind.into(), value: value.into() }
    }
}

impl std::fmt::Display for ManagedObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

pub trait ManagementClient: Send + Sync {
    /// Authenticated session handle. Owned by the adapter and handed back to
    /// [`ManagementClient::logout`] when the caller is done with it.
    type Session: Send + Sync;

    fn login(&self, endpoint: &Url, username: &str, password: &str)
        -> impl std::future::Future<Output = Result<Self::Session, VmInfoError>> + Send;

    fn default_datacenter(&self, session: &Self::Session)
        -> impl std::future::Future<Output = Result<ManagedObjectRef, VmInfoError>> + Send;

    fn find_vm(&self, session: &Self::Session, datacenter: &ManagedObjectRef, name: &str)
        -> impl std::future::Future<Output = Result<ManagedObjectRef, VmInfoError>> + Send;

    fn fetch_config(&self, session: &Self::Session, vm: &ManagedObjectRef)
        -> impl std::future::Future<Output = Result<ConfigBag, VmInfoError>> + Send;

    /// Best effort; failures are the adapter's to report.
    fn logout(&self, session: Self::Session) -> impl std::future::Future<Output = ()> + Send;
}
