//! Threshold alerts over the process table with per-pid cooldown.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use log::warn;
use serde::Serialize;

use crate::domain::{CommandLine, Pid};
use crate::sampling::{ProcessEntry, ProcessTable};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighCpu,
    HighMemory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub pid: Pid,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub command: CommandLine,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            AlertKind::HighCpu => "High CPU",
            AlertKind::HighMemory => "High memory",
        };
        write!(
            f,
            "{what}: pid {} ({}) at {:.1}% (threshold {:.0}%)",
            self.pid.0, self.command, self.value, self.threshold
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub cooldown: Duration,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self { cpu_percent: 80.0, memory_percent: 80.0, cooldown: DEFAULT_COOLDOWN }
    }
}

#[derive(Debug)]
pub struct AlertWatcher {
    thresholds: AlertThresholds,
    last_fired: HashMap<Pid, Instant>,
}

impl AlertWatcher {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds, last_fired: HashMap::new() }
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    /// Swap thresholds in place; pids already cooling down stay so
    pub fn set_thresholds(&mut self, thresholds: AlertThresholds) {
        self.thresholds = thresholds;
    }

    /// Alerts for alive entries over a threshold, sorted by pid.
    ///
    /// A pid that fired less than `cooldown` before `now` is skipped.
    pub fn check(&mut self, table: &ProcessTable, now: Instant) -> Vec<Alert> {
        self.last_fired.retain(|pid, _| table.contains(*pid));

        let mut fired = Vec::new();
        for entry in table.entries().filter(|e| e.is_alive()) {
            let pid = entry.pid();
            if let Some(last) = self.last_fired.get(&pid) {
                if now.saturating_duration_since(*last) < self.thresholds.cooldown {
                    continue;
                }
            }

            let before = fired.len();
            if entry.cpu_percent() >= self.thresholds.cpu_percent {
                fired.push(alert(entry, AlertKind::HighCpu, entry.cpu_percent(), self.thresholds.cpu_percent));
            }
            if entry.memory_percent() >= self.thresholds.memory_percent {
                fired.push(alert(
                    entry,
                    AlertKind::HighMemory,
                    entry.memory_percent(),
                    self.thresholds.memory_percent,
                ));
            }
            if fired.len() > before {
                self.last_fired.insert(pid, now);
            }
        }

        fired.sort_by_key(|a| a.pid);
        for alert in &fired {
            warn!("{alert}");
        }
        fired
    }

    /// Pids currently in cooldown
    pub fn cooling_down(&self) -> usize {
        self.last_fired.len()
    }
}

fn alert(entry: &ProcessEntry, kind: AlertKind, value: f64, threshold: f64) -> Alert {
    Alert { pid: entry.pid(), kind, value, threshold, command: entry.identity().command.clone() }
}
