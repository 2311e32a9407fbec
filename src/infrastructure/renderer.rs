use std::fmt::Write;
use crate::domain::Report;
use crate::ports::Renderer;

pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self { Self }
}

impl Default for TextRenderer {
    fn default() -> Self { Self::new() }
}

impl Renderer for TextRenderer {
    fn render(&self, report: &Report) -> String {
        let vm = &report.vm;
        let mut out = String::new();

        let _ = writeln!(out, "uuid: {:?}", vm.uuid);
        let _ = writeln!(out, "CPU count: {}", vm.cpu_count);
        let _ = writeln!(out, "Memory: {:.2} GB", vm.memory_gb);
        let _ = writeln!(out, "Boot Option: {}", vm.boot_option);

        for (i, disk) in vm.disks.iter().enumerate() {
            let _ = writeln!(out, "Disk {}:", i + 1);
            let _ = writeln!(out, "    Backing File: {:?}", disk.backing_file);
            let _ = writeln!(out, "    Capacity: {:.2} GB", disk.capacity_gb);
        }

        if let Some(ref fp) = report.thumbprint {
            let _ = writeln!(out, "thumbprint: {:?}", fp.as_str());
        }
        let _ = writeln!(out, "url: {:?}", report.url);

        out
    }
}
