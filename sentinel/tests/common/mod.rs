//! Fake proc tree on a tempdir

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const PAGE_SIZE: u64 = 4096;

pub struct FakeProc {
    dir: TempDir,
}

impl FakeProc {
    /// Tree with the system files filled in and no processes
    pub fn new(system_busy: u64, mem_total_kb: u64) -> Self {
        let proc = Self { dir: TempDir::new().unwrap() };
        proc.set_system_busy(system_busy);
        proc.write("meminfo", &format!("MemTotal:       {mem_total_kb} kB\nMemFree:        1 kB\n"));
        proc.write("loadavg", "0.50 0.40 0.30 2/120 4242\n");
        proc.write("uptime", "3725.10 7000.00\n");
        proc
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// user + nice + system + idle summing to `busy`
    pub fn set_system_busy(&self, busy: u64) {
        self.write("stat", &format!("cpu  {} 0 {} 0 0 0 0 0 0 0\ncpu0 0 0 0 0\n", busy / 2, busy - busy / 2));
    }

    pub fn break_system_stat(&self) {
        self.write("stat", "intr 0\n");
    }

    /// Process with busy time split across utime and stime
    pub fn add_process(&self, pid: u32, name: &str, state: char, busy: u64, rss_pages: u64) {
        let utime = busy / 2;
        let stime = busy - utime;
        self.write(
            &format!("{pid}/stat"),
            &format!(
                "{pid} ({name}) {state} 1 {pid} {pid} 0 -1 4194304 0 0 0 0 {utime} {stime} 0 0 20 0 1 0 100 10240000 {rss_pages}\n"
            ),
        );
        self.write(&format!("{pid}/status"), &format!("Name:\t{name}\nUid:\t0\t0\t0\t0\n"));
        self.write(&format!("{pid}/cmdline"), &format!("/usr/bin/{name}\0--flag\0"));
    }

    /// Directory present but nothing readable inside, as when a process
    /// exits between listing and reading
    pub fn add_listed_only(&self, pid: u32) {
        fs::create_dir_all(self.dir.path().join(pid.to_string())).unwrap();
    }

    pub fn remove_process(&self, pid: u32) {
        fs::remove_dir_all(self.dir.path().join(pid.to_string())).unwrap();
    }
}
