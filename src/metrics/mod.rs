mod clock;
mod cpu;
mod error;
mod memory;
mod resources;
mod sampler;
mod types;
mod window;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use cpu::{
    sample_cpu, NoThreads, ProcfsThreadList, ProcfsThreadProbe, ThreadList, ThreadProbe,
    ThreadUsage, UnsupportedThreadProbe,
};
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use cpu::{MachThreadList, MachThreadProbe};
pub use error::ProbeError;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use memory::MachMemoryProbe;
pub use memory::{
    sample_memory, total_physical_memory, MemoryProbe, ProcfsMemoryProbe, UnsupportedMemoryProbe,
};
pub use resources::{OsProbe, ResourceSampler};
pub use sampler::{LifecycleEvent, PerformanceSampler, ReportSink, SamplerState};
pub use types::{MemoryUsage, PerformanceReport, ResourceSnapshot};
pub use window::{FrameTimestampWindow, DEFAULT_WINDOW_SECS};
