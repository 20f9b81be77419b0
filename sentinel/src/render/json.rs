//! JSON-lines renderer: one object per tick.

use std::io::{self, Stdout, Write};

use anyhow::{Context, Result};

use super::{Renderer, Snapshot};

pub struct JsonRenderer<W: Write> {
    out: W,
}

impl JsonRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, snapshot).context("Failed to serialize snapshot")?;
        writeln!(self.out).context("Failed to write snapshot")?;
        self.out.flush().context("Failed to flush snapshot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{Alert, AlertKind};
    use crate::domain::{Pid, RunState, Ticks};
    use crate::sampling::{ProcessRow, SortColumn, SortOrder, TickSummary};
    use serde_json::Value;

    #[test]
    fn test_one_object_per_line() {
        let summary = TickSummary { total_task_count: 2, running_task_count: 1, ..TickSummary::default() };
        let rows = vec![ProcessRow {
            pid: Pid(31),
            user: "root".into(),
            priority: 20,
            niceness: -5,
            run_state: RunState('S'),
            cpu_percent: 1.5,
            memory_percent: 0.5,
            virtual_kb: 100,
            resident_kb: 50,
            cumulative_time: Ticks(900),
            display_name: "sshd".into(),
            command: "/usr/sbin/sshd -D".into(),
        }];
        let alerts = vec![Alert {
            pid: Pid(31),
            kind: AlertKind::HighCpu,
            value: 91.0,
            threshold: 80.0,
            command: "/usr/sbin/sshd -D".into(),
        }];
        let snapshot = Snapshot {
            summary: &summary,
            rows: &rows,
            order: SortOrder::descending(SortColumn::Mem),
            filter: Some("ssh"),
            tracked: 2,
            display_budget: 10,
            clock_ticks: 100,
            cpu_count: 2,
            alerts: &alerts,
        };

        let mut renderer = JsonRenderer::new(Vec::new());
        renderer.render(&snapshot).unwrap();
        renderer.render(&snapshot).unwrap();

        let output = String::from_utf8(renderer.get_ref().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["summary"]["total_task_count"], 2);
        assert_eq!(value["rows"][0]["pid"], 31);
        assert_eq!(value["rows"][0]["run_state"], "S");
        assert_eq!(value["rows"][0]["command"], "/usr/sbin/sshd -D");
        assert_eq!(value["order"]["column"], "mem");
        assert_eq!(value["filter"], "ssh");
        assert_eq!(value["alerts"][0]["kind"], "high_cpu");
    }
}
