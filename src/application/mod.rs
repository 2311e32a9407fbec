mod config;
mod config_mapper;
mod fingerprint;
mod query_vm;

pub use config::{Config, DEFAULT_TIMEOUT, HOST_VAR, PASSWORD_VAR, TIMEOUT_VAR, USERNAME_VAR, VM_NAME_VAR};
pub use config_mapper::map_config;
pub use fingerprint::compute_sha1_fingerprint;
pub use query_vm::{QueryVmUseCase, HTTPS_PORT};
