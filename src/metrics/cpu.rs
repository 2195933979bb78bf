use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use lazy_static::lazy_static;
use log::{debug, trace, warn};

use super::error::ProbeError;

/// Accounting for one thread as reported by the OS.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreadUsage {
    pub usage_percent: f32,
    pub idle: bool,
}

/// Snapshot of the process's threads. Whatever the OS handed out for the
/// enumeration is released when the list is dropped.
pub trait ThreadList {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn usage(&self, index: usize) -> Result<ThreadUsage, ProbeError>;
}

pub trait ThreadProbe {
    type Threads: ThreadList;

    fn task_threads(&self) -> Result<Self::Threads, ProbeError>;
}

/// Sum of usage across every non-idle thread of the process.
///
/// Not capped at 100: several threads running concurrently on different
/// cores add up. A failed enumeration reads as 0.0; a failed per-thread query
/// ends the walk and returns what was accumulated so far.
pub fn sample_cpu<P: ThreadProbe + ?Sized>(probe: &P) -> f32 {
    let started = Instant::now();

    let threads = match probe.task_threads() {
        Ok(threads) => threads,
        Err(err) => {
            warn!("thread enumeration failed: {}", err);
            return 0.0;
        }
    };

    let mut total = 0.0f32;
    for index in 0..threads.len() {
        match threads.usage(index) {
            Ok(usage) if !usage.idle => total += usage.usage_percent,
            Ok(_) => {}
            Err(err) => {
                debug!("thread {} query failed, stopping early: {}", index, err);
                break;
            }
        }
    }

    trace!(
        "cpu sample over {} threads took {:?}",
        threads.len(),
        started.elapsed()
    );
    total
}

fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf has no preconditions; -1 and 0 fall through to the default.
        let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if tck > 0 {
            return tck as f64;
        }
    }
    100.0
}

lazy_static! {
    static ref CLK_TCK: f64 = get_clk_tck();
}

/// Per-thread accounting read from `<root>/self/task/<tid>/stat`.
///
/// procfs has no instantaneous usage figure, so each thread reports its
/// lifetime average: CPU time over wall time since the thread started.
/// That is not comparable to Mach's decayed `cpu_usage`: long-lived threads
/// lag behind their current load, and a thread only a few jiffies old can
/// read high from tick rounding.
#[derive(Clone, Debug)]
pub struct ProcfsThreadProbe {
    proc_root: PathBuf,
    clk_tck: f64,
}

impl ProcfsThreadProbe {
    pub fn new() -> Self {
        ProcfsThreadProbe::with_root("/proc", *CLK_TCK)
    }

    pub fn with_root(proc_root: impl Into<PathBuf>, clk_tck: f64) -> Self {
        ProcfsThreadProbe {
            proc_root: proc_root.into(),
            clk_tck,
        }
    }
}

impl Default for ProcfsThreadProbe {
    fn default() -> Self {
        ProcfsThreadProbe::new()
    }
}

impl ThreadProbe for ProcfsThreadProbe {
    type Threads = ProcfsThreadList;

    fn task_threads(&self) -> Result<ProcfsThreadList, ProbeError> {
        let task_dir = self.proc_root.join("self").join("task");
        let entries = fs::read_dir(&task_dir)
            .map_err(|err| ProbeError::Io(task_dir.display().to_string(), err))?;

        let mut tids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        tids.sort_unstable();

        let uptime = read_uptime(&self.proc_root)?;

        Ok(ProcfsThreadList {
            task_dir,
            tids,
            uptime,
            clk_tck: self.clk_tck,
        })
    }
}

pub struct ProcfsThreadList {
    task_dir: PathBuf,
    tids: Vec<u32>,
    uptime: f64,
    clk_tck: f64,
}

impl ThreadList for ProcfsThreadList {
    fn len(&self) -> usize {
        self.tids.len()
    }

    fn usage(&self, index: usize) -> Result<ThreadUsage, ProbeError> {
        let tid = self
            .tids
            .get(index)
            .ok_or_else(|| ProbeError::Parse(format!("thread index {} out of range", index)))?;
        let stat_path = self.task_dir.join(tid.to_string()).join("stat");
        let content = fs::read_to_string(&stat_path)
            .map_err(|err| ProbeError::Io(stat_path.display().to_string(), err))?;
        parse_thread_stat(&content, self.clk_tck, self.uptime)
    }
}

fn read_uptime(proc_root: &Path) -> Result<f64, ProbeError> {
    let path = proc_root.join("uptime");
    let content =
        fs::read_to_string(&path).map_err(|err| ProbeError::Io(path.display().to_string(), err))?;
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| ProbeError::Parse(format!("malformed {}", path.display())))
}

/// Parses one `stat` line. The command name may contain spaces and
/// parentheses, so fields are counted from the last `)`.
pub(crate) fn parse_thread_stat(
    content: &str,
    clk_tck: f64,
    uptime: f64,
) -> Result<ThreadUsage, ProbeError> {
    let rest = content
        .rfind(')')
        .map(|pos| &content[pos + 1..])
        .ok_or_else(|| ProbeError::Parse("stat line has no command field".to_string()))?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // fields[0] is field 3 (state); utime/stime/starttime are fields 14/15/22.
    if fields.len() <= 19 {
        return Err(ProbeError::Parse("stat line too short".to_string()));
    }

    let field = |idx: usize, name: &str| -> Result<f64, ProbeError> {
        fields[idx]
            .parse::<u64>()
            .map(|v| v as f64)
            .map_err(|_| ProbeError::Parse(format!("bad {} field '{}'", name, fields[idx])))
    };
    let utime = field(11, "utime")?;
    let stime = field(12, "stime")?;
    let starttime = field(19, "starttime")?;

    let cpu_seconds = (utime + stime) / clk_tck;
    let alive_seconds = uptime - starttime / clk_tck;
    let usage_percent = if alive_seconds > 0.0 {
        (cpu_seconds / alive_seconds * 100.0) as f32
    } else {
        0.0
    };

    Ok(ThreadUsage {
        usage_percent,
        idle: fields[0] == "I",
    })
}

/// Stand-in for targets without task introspection. Enumeration always
/// fails, so CPU reads as 0.0.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedThreadProbe;

/// Never constructed; `UnsupportedThreadProbe` has no threads to list.
pub struct NoThreads;

impl ThreadList for NoThreads {
    fn len(&self) -> usize {
        0
    }

    fn usage(&self, _index: usize) -> Result<ThreadUsage, ProbeError> {
        Err(ProbeError::Unsupported("thread_info"))
    }
}

impl ThreadProbe for UnsupportedThreadProbe {
    type Threads = NoThreads;

    fn task_threads(&self) -> Result<NoThreads, ProbeError> {
        Err(ProbeError::Unsupported("task_threads"))
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use self::mach::{MachThreadList, MachThreadProbe};

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod mach {
    use std::mem::{self, MaybeUninit};

    use libc::{
        mach_msg_type_number_t, thread_act_array_t, thread_act_t, thread_basic_info,
        thread_info_t, vm_address_t, vm_size_t, KERN_SUCCESS, THREAD_BASIC_INFO,
        THREAD_BASIC_INFO_COUNT, TH_FLAGS_IDLE, TH_USAGE_SCALE,
    };

    use super::{ProbeError, ThreadList, ThreadProbe, ThreadUsage};

    /// `task_threads` on the current task.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MachThreadProbe;

    impl ThreadProbe for MachThreadProbe {
        type Threads = MachThreadList;

        fn task_threads(&self) -> Result<MachThreadList, ProbeError> {
            let mut threads: thread_act_array_t = std::ptr::null_mut();
            let mut count: mach_msg_type_number_t = 0;
            // SAFETY: out-pointers are valid; on success the kernel hands us a
            // vm-allocated array of `count` send rights, owned by MachThreadList.
            let result = unsafe {
                #[allow(deprecated)]
                let task = libc::mach_task_self();
                libc::task_threads(task, &mut threads, &mut count)
            };
            if result != KERN_SUCCESS {
                return Err(ProbeError::MachCallFailed("task_threads", result));
            }
            Ok(MachThreadList { threads, count })
        }
    }

    pub struct MachThreadList {
        threads: thread_act_array_t,
        count: mach_msg_type_number_t,
    }

    impl ThreadList for MachThreadList {
        fn len(&self) -> usize {
            self.count as usize
        }

        fn usage(&self, index: usize) -> Result<ThreadUsage, ProbeError> {
            if index >= self.len() {
                return Err(ProbeError::Parse(format!(
                    "thread index {} out of range",
                    index
                )));
            }
            let mut info = MaybeUninit::<thread_basic_info>::uninit();
            let mut count: mach_msg_type_number_t = THREAD_BASIC_INFO_COUNT;
            // SAFETY: index is bounds-checked against the kernel-provided count.
            let result = unsafe {
                let thread = *self.threads.add(index);
                libc::thread_info(
                    thread,
                    THREAD_BASIC_INFO as _,
                    info.as_mut_ptr() as thread_info_t,
                    &mut count,
                )
            };
            if result != KERN_SUCCESS {
                return Err(ProbeError::MachCallFailed("thread_info", result));
            }
            let info = unsafe { info.assume_init() };

            Ok(ThreadUsage {
                usage_percent: info.cpu_usage as f32 / TH_USAGE_SCALE as f32 * 100.0,
                idle: info.flags & TH_FLAGS_IDLE != 0,
            })
        }
    }

    impl Drop for MachThreadList {
        fn drop(&mut self) {
            if self.threads.is_null() {
                return;
            }
            // SAFETY: releases exactly the rights and the array task_threads
            // allocated; nothing else holds the pointer.
            unsafe {
                #[allow(deprecated)]
                let task = libc::mach_task_self();
                for index in 0..self.count as usize {
                    libc::mach_port_deallocate(task, *self.threads.add(index));
                }
                libc::vm_deallocate(
                    task,
                    self.threads as vm_address_t,
                    (self.count as usize * mem::size_of::<thread_act_t>()) as vm_size_t,
                );
            }
        }
    }
}
