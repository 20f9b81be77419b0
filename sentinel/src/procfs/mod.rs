//! Counter reader
//!
//! Reads per-process and system-wide counters from a `/proc`-layout
//! filesystem. `CounterSource` is the seam between the sampler and the
//! kernel. `ProcFs` is the real implementation, rooted at a configurable
//! directory so tests can point it at a fake tree.

#![allow(unsafe_code)]

pub mod parse;
pub mod users;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{LoadAverages, Pid, ReadError, RunState, Ticks};
use users::UserNames;

/// Per-process counters from one `stat` read
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessCounters {
    /// `utime + stime`
    pub busy_time: Ticks,
    pub run_state: RunState,
    pub priority: i64,
    pub niceness: i64,
    pub virtual_kb: u64,
    pub resident_kb: u64,
    pub display_name: String,
}

/// Source of process and system counters
pub trait CounterSource {
    /// Ids of every currently listed process, ascending.
    ///
    /// # Errors
    /// `ReadError::EnumerationUnavailable` when the listing cannot be read.
    fn enumerate_process_ids(&self) -> Result<BTreeSet<Pid>, ReadError>;

    /// # Errors
    /// `ReadError::ProcessGone` when the process vanished or its counters
    /// could not be parsed.
    fn read_process_counters(&self, pid: Pid) -> Result<ProcessCounters, ReadError>;

    /// Owning user name, if it can be determined
    fn read_process_owner(&self, pid: Pid) -> Option<String>;

    /// Full command line, `None` for kernel threads
    fn read_process_command(&self, pid: Pid) -> Option<String>;

    /// Cumulative system-wide busy time
    ///
    /// # Errors
    /// `ReadError::SystemCounterUnavailable` when unreadable.
    fn read_system_busy_time(&self) -> Result<Ticks, ReadError>;

    /// # Errors
    /// `ReadError::SystemCounterUnavailable` when unreadable.
    fn read_system_memory_total_kb(&self) -> Result<u64, ReadError>;

    /// # Errors
    /// `ReadError::SystemCounterUnavailable` when unreadable.
    fn read_load_averages(&self) -> Result<LoadAverages, ReadError>;

    /// # Errors
    /// `ReadError::SystemCounterUnavailable` when unreadable.
    fn read_uptime_seconds(&self) -> Result<f64, ReadError>;

    /// Scheduler clock ticks per second
    fn clock_ticks_per_second(&self) -> u64 {
        DEFAULT_CLOCK_TICKS
    }

    fn online_cpu_count(&self) -> usize {
        1
    }
}

const DEFAULT_CLOCK_TICKS: u64 = 100;
const DEFAULT_PAGE_SIZE: u64 = 4096;
const CPU_ONLINE_PATH: &str = "/sys/devices/system/cpu/online";

/// `/proc` reader
#[derive(Debug)]
pub struct ProcFs {
    root: PathBuf,
    page_size: u64,
    clock_ticks: u64,
    users: RefCell<UserNames>,
}

impl ProcFs {
    /// Reader over the live `/proc`
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Reader over a `/proc`-layout tree at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: sysconf(libc::_SC_PAGESIZE).unwrap_or(DEFAULT_PAGE_SIZE),
            clock_ticks: sysconf(libc::_SC_CLK_TCK).unwrap_or(DEFAULT_CLOCK_TICKS),
            users: RefCell::new(UserNames::new()),
        }
    }

    /// Override the page size used to convert resident pages to kB
    #[must_use]
    pub fn page_size(mut self, bytes: u64) -> Self {
        self.page_size = bytes.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pid_path(&self, pid: Pid, file: &str) -> PathBuf {
        self.root.join(pid.0.to_string()).join(file)
    }

    fn read_system_file(&self, file: &'static str) -> Result<String, ReadError> {
        fs::read_to_string(self.root.join(file))
            .map_err(|_| ReadError::SystemCounterUnavailable(file))
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for ProcFs {
    fn enumerate_process_ids(&self) -> Result<BTreeSet<Pid>, ReadError> {
        let entries = fs::read_dir(&self.root).map_err(|source| {
            ReadError::EnumerationUnavailable { root: self.root.clone(), source }
        })?;

        let mut pids = BTreeSet::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let Ok(pid) = name.parse::<u32>() else {
                continue;
            };
            pids.insert(Pid(pid));
        }
        Ok(pids)
    }

    fn read_process_counters(&self, pid: Pid) -> Result<ProcessCounters, ReadError> {
        let Ok(content) = fs::read_to_string(self.pid_path(pid, "stat")) else {
            return Err(ReadError::ProcessGone(pid));
        };
        let Some(stat) = parse::parse_stat(&content) else {
            return Err(ReadError::ProcessGone(pid));
        };

        let resident_pages = u64::try_from(stat.rss_pages).unwrap_or(0);
        Ok(ProcessCounters {
            busy_time: Ticks(stat.utime.saturating_add(stat.stime)),
            run_state: RunState(stat.state),
            priority: stat.priority,
            niceness: stat.nice,
            virtual_kb: stat.vsize_bytes / 1024,
            resident_kb: resident_pages.saturating_mul(self.page_size) / 1024,
            display_name: stat.comm,
        })
    }

    fn read_process_owner(&self, pid: Pid) -> Option<String> {
        let status = fs::read_to_string(self.pid_path(pid, "status")).ok()?;
        let uid = parse::parse_status_uid(&status)?;
        Some(self.users.borrow_mut().name_for(uid))
    }

    fn read_process_command(&self, pid: Pid) -> Option<String> {
        let raw = fs::read(self.pid_path(pid, "cmdline")).ok()?;
        parse::join_cmdline(&raw)
    }

    fn read_system_busy_time(&self) -> Result<Ticks, ReadError> {
        let content = self.read_system_file("stat")?;
        parse::sum_cpu_line(&content).map(Ticks).ok_or(ReadError::SystemCounterUnavailable("stat"))
    }

    fn read_system_memory_total_kb(&self) -> Result<u64, ReadError> {
        let content = self.read_system_file("meminfo")?;
        parse::parse_meminfo_total(&content).ok_or(ReadError::SystemCounterUnavailable("meminfo"))
    }

    fn read_load_averages(&self) -> Result<LoadAverages, ReadError> {
        let content = self.read_system_file("loadavg")?;
        let (one, five, fifteen) =
            parse::parse_loadavg(&content).ok_or(ReadError::SystemCounterUnavailable("loadavg"))?;
        Ok(LoadAverages { one, five, fifteen })
    }

    fn read_uptime_seconds(&self) -> Result<f64, ReadError> {
        let content = self.read_system_file("uptime")?;
        parse::parse_uptime(&content).ok_or(ReadError::SystemCounterUnavailable("uptime"))
    }

    fn clock_ticks_per_second(&self) -> u64 {
        self.clock_ticks
    }

    fn online_cpu_count(&self) -> usize {
        fs::read_to_string(CPU_ONLINE_PATH)
            .ok()
            .and_then(|content| parse::count_cpu_list(&content))
            .or_else(|| std::thread::available_parallelism().ok().map(std::num::NonZeroUsize::get))
            .unwrap_or(1)
    }
}

fn sysconf(name: libc::c_int) -> Option<u64> {
    // SAFETY: sysconf only reads a configuration value
    let value = unsafe { libc::sysconf(name) };
    u64::try_from(value).ok().filter(|v| *v > 0)
}
