use crate::domain::{BootOption, ConfigBag, DiskRecord, VirtualDevice, VmRecord};

pub fn map_config(bag: &ConfigBag) -> VmRecord {
    let boot_option = if bag.is_efi() { BootOption::Uefi } else { BootOption::Bios };

    let disks = bag.devices.iter()
        .filter_map(VirtualDevice::flat_v2_disk)
        .map(|(file_name, capacity_kb)| DiskRecord::from_kb(file_name, capacity_kb))
        .collect();

    VmRecord {
        uuid: bag.uuid.clone(),
        cpu_count: bag.num_cpu,
        memory_gb: VmRecord::memory_gb_from_mb(bag.memory_mb),
        boot_option,
        disks,
    }
}
