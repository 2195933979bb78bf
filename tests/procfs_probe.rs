use std::fs;
use std::path::Path;

use frame_telemetry::{
    sample_cpu, ProcfsMemoryProbe, ProcfsThreadProbe, ResourceSampler, ThreadList, ThreadProbe,
};
use tempfile::TempDir;

fn stat_line(tid: u32, state: &str, utime: u64, stime: u64, starttime: u64) -> String {
    format!(
        "{tid} (worker {tid}) {state} 1 1 1 0 -1 4194368 0 0 0 0 {utime} {stime} 0 0 20 0 4 0 {starttime} 0 0\n"
    )
}

fn fake_proc(threads: &[(u32, String)], uptime: &str) -> TempDir {
    let root = TempDir::new().expect("temp proc root");
    let task = root.path().join("self").join("task");
    for (tid, stat) in threads {
        let dir = task.join(tid.to_string());
        fs::create_dir_all(&dir).expect("create task dir");
        fs::write(dir.join("stat"), stat).expect("write stat");
    }
    fs::create_dir_all(&task).expect("create task root");
    fs::write(root.path().join("uptime"), uptime).expect("write uptime");
    root
}

fn probe(root: &Path) -> ProcfsThreadProbe {
    ProcfsThreadProbe::with_root(root, 100.0)
}

#[test]
fn busy_threads_are_summed_and_idle_ones_skipped() {
    // Both threads started at 10s and have been alive 10s at uptime 20s.
    let root = fake_proc(
        &[
            (101, stat_line(101, "R", 700, 100, 1_000)),
            (102, stat_line(102, "S", 300, 200, 1_000)),
            (103, stat_line(103, "I", 900, 0, 1_000)),
        ],
        "20.00 55.00\n",
    );

    let cpu = sample_cpu(&probe(root.path()));
    // 8s + 5s of CPU over 10s alive each
    assert!((cpu - 130.0).abs() < 1e-3, "cpu = {}", cpu);
}

#[test]
fn missing_task_directory_reads_zero() {
    let root = TempDir::new().expect("temp proc root");
    let probe = probe(root.path());
    assert!(probe.task_threads().is_err());
    assert_eq!(sample_cpu(&probe), 0.0);
}

#[test]
fn vanished_thread_stops_the_walk() {
    let root = fake_proc(
        &[
            (201, stat_line(201, "R", 100, 0, 0)),
            (202, stat_line(202, "R", 100, 0, 0)),
        ],
        "10.00 0.00\n",
    );
    let probe = probe(root.path());
    let threads = probe.task_threads().expect("enumerate");
    assert_eq!(threads.len(), 2);

    // thread exits between enumeration and query
    fs::remove_dir_all(root.path().join("self/task/202")).unwrap();
    assert!(threads.usage(0).is_ok());
    assert!(threads.usage(1).is_err());
    drop(threads);

    let cpu = sample_cpu(&probe);
    assert!((cpu - 10.0).abs() < 1e-3, "cpu = {}", cpu);
}

#[test]
fn non_numeric_task_entries_are_ignored() {
    let root = fake_proc(&[(301, stat_line(301, "R", 50, 50, 0))], "10.00 0.00\n");
    fs::create_dir_all(root.path().join("self/task/not-a-tid")).unwrap();

    let threads = probe(root.path()).task_threads().expect("enumerate");
    assert_eq!(threads.len(), 1);
}

#[test]
fn fake_proc_tree_feeds_a_full_snapshot() {
    let root = fake_proc(&[(401, stat_line(401, "R", 200, 0, 0))], "4.00 0.00\n");
    fs::write(root.path().join("self/statm"), "1000 10 5 1 0 8 0\n").unwrap();

    struct Both(ProcfsThreadProbe, ProcfsMemoryProbe);
    impl ThreadProbe for Both {
        type Threads = <ProcfsThreadProbe as ThreadProbe>::Threads;
        fn task_threads(&self) -> Result<Self::Threads, frame_telemetry::ProbeError> {
            self.0.task_threads()
        }
    }
    impl frame_telemetry::MemoryProbe for Both {
        fn footprint(&self) -> Result<u64, frame_telemetry::ProbeError> {
            self.1.footprint()
        }
        fn total_physical(&self) -> u64 {
            self.1.total_physical()
        }
    }

    let sampler = ResourceSampler::with_probe(Both(
        probe(root.path()),
        ProcfsMemoryProbe::with_root(root.path(), 4096),
    ));
    let snapshot = sampler.sample();
    assert!((snapshot.cpu_percent - 50.0).abs() < 1e-3);
    assert_eq!(snapshot.memory_used_bytes, 10 * 4096);
    assert!(snapshot.memory_total_bytes > 0);
}
