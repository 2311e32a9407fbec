use std::future::Future;
use std::time::Duration;
use log::{debug, info, warn};
use crate::domain::*;
use crate::ports::*;
use super::{compute_sha1_fingerprint, map_config, Config};

pub const HTTPS_PORT: u16 = 443;

/// Looks up one VM and the server's certificate thumbprint.
///
/// Management errors are fatal. A failed certificate fetch only drops the
/// thumbprint from the report.
pub struct QueryVmUseCase<M, P>
where
    M: ManagementClient,
    P: CertificateSource,
{
    management: M,
    certs: P,
}

impl<M, P> QueryVmUseCase<M, P>
where
    M: ManagementClient,
    P: CertificateSource,
{
    pub fn new(management: M, certs: P) -> Self {
        Self { management, certs }
    }

    /// Reads the configuration through `vars` and runs the query. Nothing
    /// touches the network when the configuration is incomplete.
    pub async fn run<F>(&self, vars: F) -> Result<Report, VmInfoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config::from_vars(vars)?;
        self.execute(&config).await
    }

    pub async fn execute(&self, config: &Config) -> Result<Report, VmInfoError> {
        let bag = self.fetch_config_bag(config).await?;
        let vm = map_config(&bag);

        let thumbprint = match self.thumbprint(config).await {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!("failed to retrieve thumbprint: {}", e.message);
                None
            }
        };

        Ok(Report::new(vm, thumbprint, config.server_url()))
    }

    async fn fetch_config_bag(&self, config: &Config) -> Result<ConfigBag, VmInfoError> {
        let endpoint = config.sdk_url()?;
        info!("connecting to {}", endpoint);

        let session = with_timeout(
            config.timeout,
            "login",
            self.management.login(&endpoint, &config.username, &config.password),
        ).await??;

        let result = self.lookup(&session, config).await;

        if with_timeout(config.timeout, "logout", self.management.logout(session)).await.is_err() {
            warn!("logout did not complete within {:?}", config.timeout);
        }
        result
    }

    async fn lookup(&self, session: &M::Session, config: &Config) -> Result<ConfigBag, VmInfoError> {
        let datacenter = with_timeout(config.timeout, "datacenter lookup", self.management.default_datacenter(session)).await??;
        debug!("default datacenter: {}", datacenter);

        let vm = with_timeout(config.timeout, "vm lookup", self.management.find_vm(session, &datacenter, &config.vm_name)).await??;
        debug!("vm '{}' is {}", config.vm_name, vm);

        with_timeout(config.timeout, "config fetch", self.management.fetch_config(session, &vm)).await?
    }

    async fn thumbprint(&self, config: &Config) -> Result<Fingerprint, VmInfoError> {
        let der = with_timeout(config.timeout, "certificate fetch", self.certs.leaf_certificate(&config.host, HTTPS_PORT)).await??;
        Ok(compute_sha1_fingerprint(&der))
    }
}

async fn with_timeout<F, T>(duration: Duration, what: &str, future: F) -> Result<T, VmInfoError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future).await
        .map_err(|_| VmInfoError::timeout(format!("{} timed out after {:?}", what, duration)))
}
