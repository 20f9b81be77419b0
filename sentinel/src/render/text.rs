//! Plain-text renderer: header plus fixed-width columns.

use std::io::{self, Stdout, Write};

use anyhow::{Context, Result};

use super::format::{format_cpu_time, format_uptime, truncate_chars};
use super::{Renderer, Snapshot};
use crate::sampling::ProcessRow;

/// Characters of the command shown per row
pub const COMMAND_WIDTH: usize = 30;

const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

pub struct TextRenderer<W: Write> {
    out: W,
    clear_screen: bool,
}

impl TextRenderer<Stdout> {
    /// Renderer on stdout that clears the screen before each tick
    pub fn stdout() -> Self {
        Self { out: io::stdout(), clear_screen: true }
    }
}

impl<W: Write> TextRenderer<W> {
    /// Renderer on any writer, without screen clearing
    pub fn new(out: W) -> Self {
        Self { out, clear_screen: false }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> io::Result<()> {
        let summary = snapshot.summary;
        if self.clear_screen {
            write!(self.out, "{CLEAR_SCREEN}")?;
        }
        writeln!(
            self.out,
            "Tasks: {} total, {} running | CPUs: {}",
            summary.total_task_count, summary.running_task_count, snapshot.cpu_count
        )?;
        writeln!(
            self.out,
            "Load average: {:.2} {:.2} {:.2} | Uptime: {}",
            summary.load_averages.one,
            summary.load_averages.five,
            summary.load_averages.fifteen,
            format_uptime(summary.uptime_seconds)
        )?;
        if let Some(filter) = snapshot.filter {
            writeln!(self.out, "Filter: {filter}")?;
        }
        for alert in snapshot.alerts {
            writeln!(self.out, "! {alert}")?;
        }
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{:>7} {:<12} {:>3} {:>3} {:1} {:>6} {:>6} {:>10} {:>9} {:>9} COMMAND",
            "PID", "USER", "PR", "NI", "S", "%CPU", "%MEM", "VIRT(KB)", "RES(KB)", "TIME+"
        )?;
        for row in snapshot.rows {
            self.write_row(row, snapshot.clock_ticks)?;
        }
        self.out.flush()
    }

    fn write_row(&mut self, row: &ProcessRow, clock_ticks: u64) -> io::Result<()> {
        writeln!(
            self.out,
            "{:>7} {:<12} {:>3} {:>3} {:1} {:>6.1} {:>6.1} {:>10} {:>9} {:>9} {}",
            row.pid.0,
            truncate_chars(row.user.as_str(), 12),
            row.priority,
            row.niceness,
            row.run_state,
            row.cpu_percent,
            row.memory_percent,
            row.virtual_kb,
            row.resident_kb,
            format_cpu_time(row.cumulative_time.0, clock_ticks),
            truncate_chars(row.command.as_str(), COMMAND_WIDTH)
        )
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        self.write_snapshot(snapshot).context("Failed to write process table")
    }
}
