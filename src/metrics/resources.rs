use std::time::Instant;

use log::trace;

use super::cpu::{sample_cpu, ThreadProbe};
use super::error::ProbeError;
use super::memory::{sample_memory, MemoryProbe};
use super::types::{MemoryUsage, ResourceSnapshot};

#[cfg(any(target_os = "macos", target_os = "ios"))]
type OsThreadProbe = super::cpu::MachThreadProbe;
#[cfg(any(target_os = "linux", target_os = "android"))]
type OsThreadProbe = super::cpu::ProcfsThreadProbe;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
type OsThreadProbe = super::cpu::UnsupportedThreadProbe;

#[cfg(any(target_os = "macos", target_os = "ios"))]
type OsMemoryProbe = super::memory::MachMemoryProbe;
#[cfg(any(target_os = "linux", target_os = "android"))]
type OsMemoryProbe = super::memory::ProcfsMemoryProbe;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
type OsMemoryProbe = super::memory::UnsupportedMemoryProbe;

/// Mach task introspection on Apple targets, procfs on Linux and Android.
/// Anywhere else the queries report `ProbeError::Unsupported` and the
/// readings degrade to zero (total memory still comes from sysinfo).
#[derive(Clone, Debug, Default)]
pub struct OsProbe {
    threads: OsThreadProbe,
    memory: OsMemoryProbe,
}

impl OsProbe {
    pub fn new() -> Self {
        OsProbe::default()
    }
}

impl ThreadProbe for OsProbe {
    type Threads = <OsThreadProbe as ThreadProbe>::Threads;

    fn task_threads(&self) -> Result<Self::Threads, ProbeError> {
        self.threads.task_threads()
    }
}

impl MemoryProbe for OsProbe {
    fn footprint(&self) -> Result<u64, ProbeError> {
        self.memory.footprint()
    }

    fn total_physical(&self) -> u64 {
        self.memory.total_physical()
    }
}

/// Best-effort process CPU and memory readings. Holds no state between
/// calls beyond the probe itself.
#[derive(Clone, Debug, Default)]
pub struct ResourceSampler<P = OsProbe> {
    probe: P,
}

impl ResourceSampler<OsProbe> {
    pub fn new() -> Self {
        ResourceSampler::with_probe(OsProbe::new())
    }
}

impl<P: ThreadProbe + MemoryProbe> ResourceSampler<P> {
    pub fn with_probe(probe: P) -> Self {
        ResourceSampler { probe }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn sample_cpu(&self) -> f32 {
        sample_cpu(&self.probe)
    }

    pub fn sample_memory(&self) -> MemoryUsage {
        sample_memory(&self.probe)
    }

    pub fn sample(&self) -> ResourceSnapshot {
        let started = Instant::now();
        let cpu_percent = self.sample_cpu();
        let memory = self.sample_memory();
        trace!("resource sample took {:?}", started.elapsed());

        ResourceSnapshot {
            cpu_percent,
            memory_used_bytes: memory.used,
            memory_total_bytes: memory.total,
        }
    }
}
