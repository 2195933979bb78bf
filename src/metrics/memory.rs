use std::fs;
use std::path::PathBuf;

use lazy_static::lazy_static;
use log::warn;
use sysinfo::System;

use super::error::ProbeError;
use super::types::MemoryUsage;

pub trait MemoryProbe {
    /// Physical footprint of the current process in bytes.
    fn footprint(&self) -> Result<u64, ProbeError>;

    /// Installed physical memory in bytes.
    fn total_physical(&self) -> u64;
}

/// Used is the process footprint, total is installed RAM. A failed footprint
/// query reads as zero used; total is always the real system figure.
pub fn sample_memory<P: MemoryProbe + ?Sized>(probe: &P) -> MemoryUsage {
    let used = probe.footprint().unwrap_or_else(|err| {
        warn!("memory footprint query failed: {}", err);
        0
    });
    MemoryUsage {
        used,
        total: probe.total_physical(),
    }
}

fn read_total_physical_memory() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.total_memory()
}

lazy_static! {
    static ref TOTAL_PHYSICAL_MEMORY: u64 = read_total_physical_memory();
}

/// Installed RAM, read once per process.
pub fn total_physical_memory() -> u64 {
    *TOTAL_PHYSICAL_MEMORY
}

fn page_size() -> u64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions.
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if raw > 0 {
            return raw as u64;
        }
    }
    4096
}

/// Resident set size from `<root>/self/statm`.
#[derive(Clone, Debug)]
pub struct ProcfsMemoryProbe {
    proc_root: PathBuf,
    page_size: u64,
}

impl ProcfsMemoryProbe {
    pub fn new() -> Self {
        ProcfsMemoryProbe::with_root("/proc", page_size())
    }

    pub fn with_root(proc_root: impl Into<PathBuf>, page_size: u64) -> Self {
        ProcfsMemoryProbe {
            proc_root: proc_root.into(),
            page_size,
        }
    }
}

impl Default for ProcfsMemoryProbe {
    fn default() -> Self {
        ProcfsMemoryProbe::new()
    }
}

impl MemoryProbe for ProcfsMemoryProbe {
    fn footprint(&self) -> Result<u64, ProbeError> {
        let path = self.proc_root.join("self").join("statm");
        let content = fs::read_to_string(&path)
            .map_err(|err| ProbeError::Io(path.display().to_string(), err))?;
        let resident_pages: u64 = content
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ProbeError::Parse(format!("malformed {}", path.display())))?;
        Ok(resident_pages * self.page_size)
    }

    fn total_physical(&self) -> u64 {
        total_physical_memory()
    }
}

/// Stand-in for targets without a footprint query. Used reads as 0; total
/// still comes from sysinfo.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedMemoryProbe;

impl MemoryProbe for UnsupportedMemoryProbe {
    fn footprint(&self) -> Result<u64, ProbeError> {
        Err(ProbeError::Unsupported("task footprint"))
    }

    fn total_physical(&self) -> u64 {
        total_physical_memory()
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use self::mach::MachMemoryProbe;

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod mach {
    use std::mem::{self, MaybeUninit};

    use libc::{integer_t, mach_msg_type_number_t, natural_t, task_info_t, KERN_SUCCESS};

    use super::{total_physical_memory, MemoryProbe, ProbeError};

    const TASK_VM_INFO: natural_t = 22;

    // Prefix of task_vm_info_data_t up to and including phys_footprint (rev1).
    #[repr(C)]
    #[allow(dead_code)]
    struct TaskVmInfo {
        virtual_size: u64,
        region_count: integer_t,
        page_size: integer_t,
        resident_size: u64,
        resident_size_peak: u64,
        device: u64,
        device_peak: u64,
        internal: u64,
        internal_peak: u64,
        external: u64,
        external_peak: u64,
        reusable: u64,
        reusable_peak: u64,
        purgeable_volatile_pmap: u64,
        purgeable_volatile_resident: u64,
        purgeable_volatile_virtual: u64,
        compressed: u64,
        compressed_peak: u64,
        compressed_lifetime: u64,
        phys_footprint: u64,
    }

    /// `task_info(TASK_VM_INFO)` footprint, `hw.memsize` via sysinfo for total.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MachMemoryProbe;

    impl MemoryProbe for MachMemoryProbe {
        fn footprint(&self) -> Result<u64, ProbeError> {
            let mut info = MaybeUninit::<TaskVmInfo>::zeroed();
            let mut count = (mem::size_of::<TaskVmInfo>() / mem::size_of::<natural_t>())
                as mach_msg_type_number_t;
            // SAFETY: count describes the buffer in natural_t units, so the
            // kernel never writes past the struct.
            let result = unsafe {
                #[allow(deprecated)]
                let task = libc::mach_task_self();
                libc::task_info(
                    task,
                    TASK_VM_INFO,
                    info.as_mut_ptr() as task_info_t,
                    &mut count,
                )
            };
            if result != KERN_SUCCESS {
                return Err(ProbeError::MachCallFailed("task_info", result));
            }
            let info = unsafe { info.assume_init() };
            Ok(info.phys_footprint)
        }

        fn total_physical(&self) -> u64 {
            total_physical_memory()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        read_total_physical_memory, sample_memory, total_physical_memory, MemoryProbe,
        ProbeError, ProcfsMemoryProbe, UnsupportedMemoryProbe,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn statm_resident_pages_scale_by_page_size() {
        let root = TempDir::new().expect("temp proc root");
        fs::create_dir_all(root.path().join("self")).unwrap();
        fs::write(root.path().join("self/statm"), "9000 250 100 1 0 300 0\n").unwrap();

        let probe = ProcfsMemoryProbe::with_root(root.path(), 4096);
        assert_eq!(probe.footprint().unwrap(), 250 * 4096);
    }

    #[test]
    fn missing_statm_is_an_error() {
        let root = TempDir::new().expect("temp proc root");
        let probe = ProcfsMemoryProbe::with_root(root.path(), 4096);
        assert!(matches!(probe.footprint(), Err(ProbeError::Io(_, _))));

        let usage = sample_memory(&probe);
        assert_eq!(usage.used, 0);
        assert!(usage.total > 0);
    }

    #[test]
    fn unsupported_target_keeps_real_total() {
        let probe = UnsupportedMemoryProbe;
        assert!(matches!(
            probe.footprint(),
            Err(ProbeError::Unsupported("task footprint"))
        ));

        let usage = sample_memory(&probe);
        assert_eq!(usage.used, 0);
        assert!(usage.total > 0);
        assert_eq!(usage.total, read_total_physical_memory());
    }

    #[test]
    fn installed_memory_is_read_once() {
        let first = total_physical_memory();
        assert!(first > 0);
        assert_eq!(total_physical_memory(), first);
        assert_eq!(first, read_total_physical_memory());
    }
}
