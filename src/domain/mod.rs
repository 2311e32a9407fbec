mod config_bag;
mod error;
mod fingerprint;
mod report;
mod vm;

pub use config_bag::{ConfigBag, DiskBacking, VirtualDevice, VirtualDisk, FIRMWARE_EFI};
pub use error::{ErrorClass, VmInfoError};
pub use fingerprint::{Fingerprint, SHA1_LEN};
pub use report::Report;
pub use vm::{BootOption, DiskRecord, VmRecord};
