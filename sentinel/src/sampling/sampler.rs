//! Sampler: drives one tick of enumerate, ingest and finalize.
//!
//! ```text
//! Idle ──► Enumerating ──► Ingesting ──► Finalizing ──► Rendered ──► Idle
//!               │
//!               └── enumeration unavailable ──► Idle (tick fails)
//! ```
//!
//! Per-process read failures never fail a tick: the pid is marked gone and
//! dropped at finalize. An unreadable system busy-time counter keeps the
//! previous CPU shares. Only a failed enumeration is fatal.

use log::{debug, trace, warn};
use serde::Serialize;

use super::table::{ProcessIdentity, ProcessSample, ProcessTable, SystemCounters};
use crate::domain::{LoadAverages, Pid, ReadError, SampleError, Ticks};
use crate::procfs::CounterSource;

/// Phase of the sampler within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Enumerating,
    Ingesting,
    Finalizing,
    Rendered,
}

/// Aggregates for one completed tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickSummary {
    /// Processes successfully sampled this tick
    pub total_task_count: usize,
    /// Sampled processes in run state `R`
    pub running_task_count: usize,
    /// Listed processes that could not be read
    pub vanished_count: usize,
    pub load_averages: LoadAverages,
    pub uptime_seconds: f64,
}

pub struct Sampler<S> {
    source: S,
    table: ProcessTable,
    phase: Phase,
    previous_system_busy: Option<Ticks>,
    system_counter_missing: bool,
}

impl<S: CounterSource> Sampler<S> {
    /// Create a sampler with an empty table.
    ///
    /// Reads the system busy time once so the first tick has a baseline.
    pub fn new(source: S) -> Self {
        let previous_system_busy = source.read_system_busy_time().ok();
        Self {
            source,
            table: ProcessTable::new(),
            phase: Phase::Idle,
            previous_system_busy,
            system_counter_missing: previous_system_busy.is_none(),
        }
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run one full sampling tick.
    ///
    /// # Errors
    /// `SampleError::EnumerationUnavailable` when the process listing cannot
    /// be read. The table is left as it was.
    pub fn tick(&mut self) -> Result<TickSummary, SampleError> {
        self.enter(Phase::Idle);
        self.enter(Phase::Enumerating);
        let pids = match self.source.enumerate_process_ids() {
            Ok(pids) => pids,
            Err(err) => {
                self.enter(Phase::Idle);
                return Err(SampleError::EnumerationUnavailable(err));
            }
        };
        let created = self.table.reconcile(pids.iter().copied());

        self.enter(Phase::Ingesting);
        let mut summary = TickSummary::default();
        for &pid in &pids {
            match self.read_sample(pid) {
                Ok(sample) => {
                    let running = sample.identity.run_state.is_running();
                    if let Err(err) = self.table.ingest_sample(pid, sample) {
                        warn!("Dropping sample: {err}");
                        continue;
                    }
                    summary.total_task_count += 1;
                    if running {
                        summary.running_task_count += 1;
                    }
                }
                Err(err) => {
                    trace!("{pid} not sampled: {err}");
                    self.table.mark_gone(pid);
                    summary.vanished_count += 1;
                }
            }
        }

        self.enter(Phase::Finalizing);
        let current_busy = self.read_system_busy_time();
        let memory_total_kb = self.source.read_system_memory_total_kb().unwrap_or_else(|err| {
            debug!("{err}");
            1
        });
        let removed = self.table.finalize_tick(&SystemCounters {
            previous_busy_time: self.previous_system_busy,
            current_busy_time: current_busy,
            memory_total_kb,
        });
        if current_busy.is_some() {
            self.previous_system_busy = current_busy;
        }

        summary.load_averages = self.source.read_load_averages().unwrap_or_default();
        summary.uptime_seconds = self.source.read_uptime_seconds().unwrap_or_default();

        debug!(
            "tick: {} listed, {} sampled, {} new, {} removed, {} tracked",
            pids.len(),
            summary.total_task_count,
            created,
            removed,
            self.table.len()
        );
        Ok(summary)
    }

    /// Record that the last tick's results were handed to a renderer
    pub fn mark_rendered(&mut self) {
        self.enter(Phase::Rendered);
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            trace!("sampler: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn read_system_busy_time(&mut self) -> Option<Ticks> {
        match self.source.read_system_busy_time() {
            Ok(ticks) => {
                if self.system_counter_missing {
                    debug!("System busy time readable again");
                    self.system_counter_missing = false;
                }
                Some(ticks)
            }
            Err(err) => {
                if !self.system_counter_missing {
                    warn!("{err}; CPU shares frozen until it recovers");
                    self.system_counter_missing = true;
                }
                None
            }
        }
    }

    fn read_sample(&self, pid: Pid) -> Result<ProcessSample, ReadError> {
        let counters = self.source.read_process_counters(pid)?;
        let user = self.source.read_process_owner(pid).unwrap_or_else(|| "?".to_string());
        let command = self
            .source
            .read_process_command(pid)
            .unwrap_or_else(|| counters.display_name.clone());

        Ok(ProcessSample {
            busy_time: counters.busy_time,
            resident_kb: counters.resident_kb,
            virtual_kb: counters.virtual_kb,
            identity: ProcessIdentity {
                display_name: counters.display_name.into(),
                user: user.into(),
                priority: counters.priority,
                niceness: counters.niceness,
                run_state: counters.run_state,
                command: command.into(),
            },
        })
    }
}
