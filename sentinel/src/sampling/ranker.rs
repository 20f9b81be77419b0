//! Ranker: turns the process table into the ordered, bounded rows a
//! renderer draws.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::table::{ProcessEntry, ProcessTable};
use crate::domain::{CommandLine, DisplayName, Pid, RunState, Ticks, UserName};

/// Column a ranking is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    #[default]
    Cpu,
    Mem,
    Pid,
    User,
    Vsize,
    Rss,
    Time,
}

impl SortColumn {
    pub const ALL: [SortColumn; 7] = [
        SortColumn::Cpu,
        SortColumn::Mem,
        SortColumn::Pid,
        SortColumn::User,
        SortColumn::Vsize,
        SortColumn::Rss,
        SortColumn::Time,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Cpu => "%CPU",
            SortColumn::Mem => "%MEM",
            SortColumn::Pid => "PID",
            SortColumn::User => "USER",
            SortColumn::Vsize => "VIRT",
            SortColumn::Rss => "RES",
            SortColumn::Time => "TIME+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    pub column: SortColumn,
    pub descending: bool,
}

impl SortOrder {
    pub fn descending(column: SortColumn) -> Self {
        Self { column, descending: true }
    }

    /// Flip direction on the current column, or switch to `column` descending
    pub fn toggle(&mut self, column: SortColumn) {
        if self.column == column {
            self.descending = !self.descending;
        } else {
            *self = Self::descending(column);
        }
    }

    /// Ascending comparison by the selected column, then flipped if descending
    pub fn compare(&self, a: &ProcessRow, b: &ProcessRow) -> Ordering {
        let ordering = match self.column {
            SortColumn::Cpu => a
                .cpu_percent
                .total_cmp(&b.cpu_percent)
                .then_with(|| a.resident_kb.cmp(&b.resident_kb)),
            SortColumn::Mem => a.memory_percent.total_cmp(&b.memory_percent),
            SortColumn::Pid => a.pid.cmp(&b.pid),
            SortColumn::User => {
                let lower = |row: &ProcessRow| {
                    row.user.as_str().chars().flat_map(char::to_lowercase).collect::<Vec<_>>()
                };
                lower(a).cmp(&lower(b))
            }
            SortColumn::Vsize => a.virtual_kb.cmp(&b.virtual_kb),
            SortColumn::Rss => a.resident_kb.cmp(&b.resident_kb),
            SortColumn::Time => a.cumulative_time.cmp(&b.cumulative_time),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::descending(SortColumn::Cpu)
    }
}

/// Ordering and filter chosen interactively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSettings {
    pub order: SortOrder,
    pub filter: Option<String>,
}

/// One display row, copied out of a table entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRow {
    pub pid: Pid,
    pub user: UserName,
    pub priority: i64,
    pub niceness: i64,
    pub run_state: RunState,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub virtual_kb: u64,
    pub resident_kb: u64,
    /// Busy time in clock ticks
    pub cumulative_time: Ticks,
    pub display_name: DisplayName,
    pub command: CommandLine,
}

impl From<&ProcessEntry> for ProcessRow {
    fn from(entry: &ProcessEntry) -> Self {
        let identity = entry.identity();
        Self {
            pid: entry.pid(),
            user: identity.user.clone(),
            priority: identity.priority,
            niceness: identity.niceness,
            run_state: identity.run_state,
            cpu_percent: entry.cpu_percent(),
            memory_percent: entry.memory_percent(),
            virtual_kb: entry.virtual_kb(),
            resident_kb: entry.resident_kb(),
            cumulative_time: entry.current_busy_time(),
            display_name: identity.display_name.clone(),
            command: identity.command.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ranker {
    display_budget: usize,
    order: SortOrder,
    /// Lowercased query
    filter: Option<String>,
}

impl Ranker {
    pub fn new(display_budget: usize) -> Self {
        Self { display_budget, order: SortOrder::default(), filter: None }
    }

    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn display_budget(&self) -> usize {
        self.display_budget
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Set the filter query. Empty or blank clears it.
    pub fn set_filter(&mut self, query: Option<&str>) {
        self.filter = query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase);
    }

    pub fn apply(&mut self, settings: RankSettings) {
        self.order = settings.order;
        self.set_filter(settings.filter.as_deref());
    }

    pub fn settings(&self) -> RankSettings {
        RankSettings { order: self.order, filter: self.filter.clone() }
    }

    /// Alive entries matching the filter, sorted, at most `display_budget`
    pub fn rank(&self, table: &ProcessTable) -> Vec<ProcessRow> {
        let mut rows: Vec<ProcessRow> = table
            .entries()
            .filter(|entry| entry.is_alive() && self.matches(entry))
            .map(ProcessRow::from)
            .collect();
        rows.sort_by(|a, b| self.order.compare(a, b));
        rows.truncate(self.display_budget);
        rows
    }

    fn matches(&self, entry: &ProcessEntry) -> bool {
        let Some(query) = &self.filter else {
            return true;
        };
        let identity = entry.identity();
        [identity.command.as_str(), identity.user.as_str(), identity.display_name.as_str()]
            .iter()
            .any(|field| field.to_lowercase().contains(query.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::table::{ProcessIdentity, ProcessSample, SystemCounters};

    /// Build a table where each (pid, busy delta, rss, user, command) has
    /// been through two ticks, so cpu% = delta / 10.
    fn table_with(procs: &[(u32, u64, u64, &str, &str)]) -> ProcessTable {
        let mut table = ProcessTable::new();
        let pids: Vec<Pid> = procs.iter().map(|p| Pid(p.0)).collect();
        let sample = |busy: u64, rss: u64, user: &str, command: &str| ProcessSample {
            busy_time: Ticks(busy),
            resident_kb: rss,
            virtual_kb: rss * 2,
            identity: ProcessIdentity {
                display_name: command.split('/').next_back().unwrap_or(command).into(),
                user: user.into(),
                command: command.into(),
                ..ProcessIdentity::default()
            },
        };

        table.reconcile(pids.clone());
        for &(pid, _, rss, user, command) in procs {
            table.ingest_sample(Pid(pid), sample(1, rss, user, command)).unwrap();
        }
        table.finalize_tick(&SystemCounters {
            previous_busy_time: Some(Ticks(0)),
            current_busy_time: Some(Ticks(1000)),
            memory_total_kb: 10_000,
        });

        table.reconcile(pids);
        for &(pid, delta, rss, user, command) in procs {
            table.ingest_sample(Pid(pid), sample(1 + delta, rss, user, command)).unwrap();
        }
        table.finalize_tick(&SystemCounters {
            previous_busy_time: Some(Ticks(1000)),
            current_busy_time: Some(Ticks(2000)),
            memory_total_kb: 10_000,
        });
        table
    }

    fn pids(rows: &[ProcessRow]) -> Vec<u32> {
        rows.iter().map(|r| r.pid.0).collect()
    }

    #[test]
    fn test_default_order_cpu_then_rss() {
        let table = table_with(&[
            (1, 100, 10, "root", "/sbin/init"),
            (2, 300, 10, "alice", "/usr/bin/cargo"),
            (3, 100, 50, "alice", "/usr/bin/rustc"),
            (4, 0, 90, "bob", "/usr/bin/vim"),
        ]);
        let rows = Ranker::new(10).rank(&table);
        assert_eq!(pids(&rows), vec![2, 3, 1, 4]);
        assert!((rows[0].cpu_percent - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_budget_truncates() {
        let table = table_with(&[
            (1, 10, 1, "a", "a"),
            (2, 20, 1, "a", "b"),
            (3, 30, 1, "a", "c"),
            (4, 40, 1, "a", "d"),
            (5, 50, 1, "a", "e"),
        ]);
        let rows = Ranker::new(3).rank(&table);
        assert_eq!(pids(&rows), vec![5, 4, 3]);
        assert_eq!(table.len(), 5);
        assert!(Ranker::new(0).rank(&table).is_empty());
    }

    #[test]
    fn test_toggle_sort_order() {
        let mut order = SortOrder::default();
        order.toggle(SortColumn::Cpu);
        assert_eq!(order, SortOrder { column: SortColumn::Cpu, descending: false });

        order.toggle(SortColumn::Pid);
        assert_eq!(order, SortOrder::descending(SortColumn::Pid));
    }

    #[test]
    fn test_sort_by_pid_ascending() {
        let table = table_with(&[(9, 1, 1, "a", "x"), (3, 5, 1, "a", "y"), (5, 3, 1, "a", "z")]);
        let ranker = Ranker::new(10)
            .with_order(SortOrder { column: SortColumn::Pid, descending: false });
        assert_eq!(pids(&ranker.rank(&table)), vec![3, 5, 9]);
    }

    #[test]
    fn test_sort_by_user_ignores_case() {
        let table = table_with(&[(1, 1, 1, "bob", "x"), (2, 1, 1, "Alice", "y"), (3, 1, 1, "carol", "z")]);
        let ranker = Ranker::new(10)
            .with_order(SortOrder { column: SortColumn::User, descending: false });
        assert_eq!(pids(&ranker.rank(&table)), vec![2, 1, 3]);
    }

    #[test]
    fn test_filter_matches_command_user_and_name() {
        let table = table_with(&[
            (1, 1, 1, "root", "/usr/sbin/sshd -D"),
            (2, 1, 1, "postgres", "postgres: writer"),
            (3, 1, 1, "alice", "/usr/bin/SSH-agent"),
        ]);
        let mut ranker = Ranker::new(10)
            .with_order(SortOrder { column: SortColumn::Pid, descending: false });

        ranker.set_filter(Some("SSH"));
        assert_eq!(pids(&ranker.rank(&table)), vec![1, 3]);

        ranker.set_filter(Some("postgres"));
        assert_eq!(pids(&ranker.rank(&table)), vec![2]);

        ranker.set_filter(Some("   "));
        assert_eq!(ranker.filter(), None);
        assert_eq!(ranker.rank(&table).len(), 3);
    }

    #[test]
    fn test_apply_settings() {
        let mut ranker = Ranker::new(10);
        ranker.apply(RankSettings {
            order: SortOrder::descending(SortColumn::Rss),
            filter: Some("Foo".to_string()),
        });
        assert_eq!(ranker.order().column, SortColumn::Rss);
        assert_eq!(ranker.filter(), Some("foo"));
        assert_eq!(ranker.settings().filter.as_deref(), Some("foo"));
    }
}
