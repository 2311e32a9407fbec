//! Configuration property bag as returned by the management server.
//!
//! The server reports a polymorphic device list; each device and each disk
//! backing is decoded into a closed variant so the mapper can pattern-match
//! instead of inspecting type names.

/// Firmware value the platform uses for EFI boot.
pub const FIRMWARE_EFI: &str = "efi";

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBag {
    pub uuid: String,
    pub num_cpu: i32,
    pub memory_mb: i64,
    pub firmware: Option<String>,
    pub devices: Vec<VirtualDevice>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VirtualDevice {
    Disk(VirtualDisk),
    /// Any other device kind; `kind` is the server's type name.
    Other { kind: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDisk {
    /// `None` when the server reported no capacity for the disk.
    pub capacity_in_kb: Option<i64>,
    pub backing: DiskBacking,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiskBacking {
    FlatVer2 { file_name: String },
    Other { kind: String },
}

impl VirtualDevice {
    pub fn is_virtual_disk(&self) -> bool {
        matches!(self, VirtualDevice::Disk(_))
    }

    /// Backing file and capacity when this is a disk with a flat-v2 backing.
    pub fn flat_v2_disk(&self) -> Option<(&str, i64)> {
        match self {
            VirtualDevice::Disk(VirtualDisk { capacity_in_kb: Some(kb), backing: DiskBacking::FlatVer2 { file_name } }) => {
                Some((file_name.as_str(), *kb))
            }
            _ => None,
        }
    }
}

impl ConfigBag {
    pub fn is_efi(&self) -> bool {
        self.firmware.as_deref() == Some(FIRMWARE_EFI)
    }
}
