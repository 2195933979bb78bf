use std::fmt;

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
}

impl MemoryUsage {
    pub fn used_percent(&self) -> f32 {
        if self.total > 0 {
            (self.used as f64 / self.total as f64 * 100.0) as f32
        } else {
            0.0
        }
    }
}

/// Point-in-time process resource reading. Fields degrade to zero when the
/// underlying query fails; there is no error variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub cpu_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
}

impl ResourceSnapshot {
    pub fn memory(&self) -> MemoryUsage {
        MemoryUsage {
            used: self.memory_used_bytes,
            total: self.memory_total_bytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub captured_at: DateTime<Utc>,
    pub cpu_percent: f32,
    pub fps: usize,
    pub memory: MemoryUsage,
}

impl PerformanceReport {
    pub fn new(fps: usize, resources: ResourceSnapshot) -> Self {
        PerformanceReport {
            captured_at: Utc::now(),
            cpu_percent: resources.cpu_percent,
            fps,
            memory: resources.memory(),
        }
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FPS {} | CPU {:.1}% | MEM {} / {}",
            self.fps,
            self.cpu_percent,
            ByteSize::b(self.memory.used),
            ByteSize::b(self.memory.total)
        )
    }
}
