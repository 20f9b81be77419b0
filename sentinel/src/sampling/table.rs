//! Process table: one entry per tracked pid, reconciled every tick.
//!
//! Lifecycle of an entry within a tick:
//!
//! ```text
//! reconcile ──► alive ──ingest_sample──► alive (counters updated)
//!                 │
//!                 └──mark_gone──► not alive ──finalize_tick──► removed
//! ```
//!
//! `finalize_tick` removes every entry not alive, then derives CPU and
//! memory shares for the survivors and rotates their busy-time counters.

use std::collections::HashMap;

use serde::Serialize;

use super::metrics::{cpu_percent, memory_percent, process_delta, system_delta};
use crate::domain::{CommandLine, DisplayName, NotAlive, Pid, RunState, Ticks, UserName};

/// Descriptive attributes of a process, replaced wholesale on each sample
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessIdentity {
    pub display_name: DisplayName,
    pub user: UserName,
    pub priority: i64,
    pub niceness: i64,
    pub run_state: RunState,
    pub command: CommandLine,
}

/// One successful read of a process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSample {
    pub busy_time: Ticks,
    pub resident_kb: u64,
    pub virtual_kb: u64,
    pub identity: ProcessIdentity,
}

/// System-wide counters handed to `finalize_tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemCounters {
    /// Busy time as of the previous tick's finalize
    pub previous_busy_time: Option<Ticks>,
    /// Busy time read after this tick's scan, `None` if unreadable
    pub current_busy_time: Option<Ticks>,
    pub memory_total_kb: u64,
}

impl SystemCounters {
    /// Busy-time delta, or `None` when either read is missing
    pub fn busy_delta(&self) -> Option<u64> {
        match (self.previous_busy_time, self.current_busy_time) {
            (Some(previous), Some(current)) => Some(system_delta(previous, current)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntry {
    pid: Pid,
    previous_busy_time: Ticks,
    current_busy_time: Ticks,
    cpu_percent: f64,
    resident_kb: u64,
    virtual_kb: u64,
    memory_percent: f64,
    identity: ProcessIdentity,
    alive: bool,
}

impl ProcessEntry {
    fn new(pid: Pid) -> Self {
        Self {
            pid,
            previous_busy_time: Ticks(0),
            current_busy_time: Ticks(0),
            cpu_percent: 0.0,
            resident_kb: 0,
            virtual_kb: 0,
            memory_percent: 0.0,
            identity: ProcessIdentity::default(),
            alive: true,
        }
    }

    fn apply(&mut self, sample: ProcessSample) {
        self.current_busy_time = sample.busy_time;
        self.resident_kb = sample.resident_kb;
        self.virtual_kb = sample.virtual_kb;
        self.identity = sample.identity;
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Busy time as of the last finalize; 0 until the first one
    pub fn previous_busy_time(&self) -> Ticks {
        self.previous_busy_time
    }

    pub fn current_busy_time(&self) -> Ticks {
        self.current_busy_time
    }

    pub fn cpu_percent(&self) -> f64 {
        self.cpu_percent
    }

    pub fn memory_percent(&self) -> f64 {
        self.memory_percent
    }

    pub fn resident_kb(&self) -> u64 {
        self.resident_kb
    }

    pub fn virtual_kb(&self) -> u64 {
        self.virtual_kb
    }

    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Every tracked process keyed by pid
#[derive(Debug, Default)]
pub struct ProcessTable {
    entries: HashMap<Pid, ProcessEntry>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every entry not alive, then mark the observed pids alive,
    /// creating zeroed entries for pids seen for the first time.
    ///
    /// Returns the number of entries created.
    pub fn reconcile(&mut self, observed: impl IntoIterator<Item = Pid>) -> usize {
        for entry in self.entries.values_mut() {
            entry.alive = false;
        }

        let mut created = 0;
        for pid in observed {
            self.entries
                .entry(pid)
                .and_modify(|entry| entry.alive = true)
                .or_insert_with(|| {
                    created += 1;
                    ProcessEntry::new(pid)
                });
        }
        created
    }

    /// Store a fresh sample for `pid`.
    ///
    /// # Errors
    /// `NotAlive` if `pid` is absent or was not marked alive by this tick's
    /// reconcile. The table is left unchanged.
    pub fn ingest_sample(&mut self, pid: Pid, sample: ProcessSample) -> Result<(), NotAlive> {
        match self.entries.get_mut(&pid) {
            Some(entry) if entry.alive => {
                entry.apply(sample);
                Ok(())
            }
            _ => Err(NotAlive(pid)),
        }
    }

    /// Mark `pid` not alive after a failed read. No-op for unknown pids.
    pub fn mark_gone(&mut self, pid: Pid) {
        if let Some(entry) = self.entries.get_mut(&pid) {
            entry.alive = false;
        }
    }

    /// Remove dead entries, derive CPU and memory shares, rotate counters.
    ///
    /// An entry whose previous busy time is 0 (first observation) gets 0%
    /// CPU. Without a system busy delta, CPU shares keep their previous value.
    ///
    /// Returns the number of entries removed.
    pub fn finalize_tick(&mut self, system: &SystemCounters) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.alive);
        let removed = before - self.entries.len();

        let busy_delta = system.busy_delta();
        for entry in self.entries.values_mut() {
            if entry.previous_busy_time.is_zero() {
                entry.cpu_percent = 0.0;
            } else if let Some(system_delta) = busy_delta {
                let delta = process_delta(entry.previous_busy_time, entry.current_busy_time);
                entry.cpu_percent = cpu_percent(delta, system_delta);
            }
            entry.memory_percent = memory_percent(entry.resident_kb, system.memory_total_kb);
            entry.previous_busy_time = entry.current_busy_time;
        }
        removed
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains_key(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessEntry> {
        self.entries.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in unspecified order
    pub fn entries(&self) -> impl Iterator<Item = &ProcessEntry> {
        self.entries.values()
    }
}
