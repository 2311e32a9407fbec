use std::fmt;

const KB_PER_GB: f64 = 1024.0 * 1024.0;
const MB_PER_GB: f64 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOption {
    Bios,
    Uefi,
}

impl fmt::Display for BootOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootOption::Bios => write!(f, "BIOS"),
            BootOption::Uefi => write!(f, "UEFI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskRecord {
    pub backing_file: String,
    pub capacity_gb: f64,
}

impl DiskRecord {
    pub fn from_kb(backing_file: impl Into<String>, capacity_kb: i64) -> Self {
        Self { backing_file: backing_file.into(), capacity_gb: capacity_kb as f64 / KB_PER_GB }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VmRecord {
    pub uuid: String,
    pub cpu_count: i32,
    pub memory_gb: f64,
    pub boot_option: BootOption,
    pub disks: Vec<DiskRecord>,
}

impl VmRecord {
    pub fn memory_gb_from_mb(memory_mb: i64) -> f64 {
        memory_mb as f64 / MB_PER_GB
    }
}
