use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;
use url::Url;
use crate::domain::VmInfoError;

pub const HOST_VAR: &str = "VCENTER_HOST";
pub const USERNAME_VAR: &str = "VCENTER_USERNAME";
pub const PASSWORD_VAR: &str = "VCENTER_PASSWORD";
pub const VM_NAME_VAR: &str = "VM_NAME";
pub const TIMEOUT_VAR: &str = "VMINFO_TIMEOUT";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Config {
    /// Hostname or IP literal, no scheme.
    pub host: String,
    pub username: String,
    pub password: String,
    pub vm_name: String,
    /// Deadline for each step against the server.
    pub timeout: Duration,
}

impl Config {
    /// Builds the configuration from `lookup`; unset and empty values both count as missing.
    pub fn from_vars<F>(lookup: F) -> Result<Self, VmInfoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let host = required(HOST_VAR);
        let username = required(USERNAME_VAR);
        let password = required(PASSWORD_VAR);
        let vm_name = required(VM_NAME_VAR);

        match (host, username, password, vm_name) {
            (Some(host), Some(username), Some(password), Some(vm_name)) => Ok(Self {
                host,
                username,
                password,
                vm_name,
                timeout: lookup(TIMEOUT_VAR).and_then(|v| parse_duration(&v)).unwrap_or(DEFAULT_TIMEOUT),
            }),
            (host, username, password, vm_name) => {
                let missing: Vec<&str> = [
                    (HOST_VAR, host.is_none()),
                    (USERNAME_VAR, username.is_none()),
                    (PASSWORD_VAR, password.is_none()),
                    (VM_NAME_VAR, vm_name.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, absent)| absent.then_some(key))
                .collect();
                Err(VmInfoError::config(format!("missing required environment variables: {}", missing.join(", "))))
            }
        }
    }

    /// `https://<host>`, as printed on the `url:` line.
    pub fn server_url(&self) -> String {
        format!("https://{}", self.authority())
    }

    /// SOAP endpoint of the management server.
    pub fn sdk_url(&self) -> Result<Url, VmInfoError> {
        Url::parse(&format!("{}/sdk", self.server_url()))
            .map_err(|e| VmInfoError::config(format!("invalid {} '{}': {}", HOST_VAR, self.host, e)))
    }

    fn authority(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vm_name", &self.vm_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_duration(v: &str) -> Option<Duration> {
    let v = v.trim();
    if let Some(s) = v.strip_suffix("ms") {
        s.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(s) = v.strip_suffix('s') {
        s.parse::<u64>().ok().map(Duration::from_secs)
    } else {
        v.parse::<u64>().ok().map(Duration::from_secs)
    }
}
