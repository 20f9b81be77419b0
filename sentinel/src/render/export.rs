//! CSV export: one row per alive process per tick.
//!
//! Runs beside whichever renderer is active. The header goes in only when
//! the file starts out empty, so successive runs append to one file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;

use super::format::format_cpu_time;
use crate::sampling::{ProcessRow, ProcessTable};

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    timestamp_ms: u128,
    pid: u32,
    user: &'a str,
    comm: &'a str,
    cpu_pct: String,
    mem_pct: String,
    vsize_kb: u64,
    rss_kb: u64,
    state: char,
    time_plus: String,
    cmdline: String,
}

pub struct CsvExporter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvExporter<File> {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    /// If the file cannot be opened or inspected.
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open CSV export {}", path.display()))?;
        let empty = file.metadata().context("Failed to inspect CSV export")?.len() == 0;
        log::info!("Exporting ticks to {}", path.display());
        Ok(Self::new(file, empty))
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn new(out: W, write_header: bool) -> Self {
        let writer = csv::WriterBuilder::new().has_headers(write_header).from_writer(out);
        Self { writer }
    }

    /// Append every alive process in `table`, ordered by pid.
    ///
    /// # Errors
    /// Write or flush failures.
    pub fn write_tick(&mut self, at: SystemTime, table: &ProcessTable, clock_ticks: u64) -> Result<()> {
        let timestamp_ms = at.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let mut rows: Vec<ProcessRow> =
            table.entries().filter(|e| e.is_alive()).map(ProcessRow::from).collect();
        rows.sort_by_key(|row| row.pid);

        for row in &rows {
            self.writer
                .serialize(CsvRecord {
                    timestamp_ms,
                    pid: row.pid.0,
                    user: row.user.as_str(),
                    comm: row.display_name.as_str(),
                    cpu_pct: format!("{:.1}", row.cpu_percent),
                    mem_pct: format!("{:.1}", row.memory_percent),
                    vsize_kb: row.virtual_kb,
                    rss_kb: row.resident_kb,
                    state: row.run_state.0,
                    time_plus: format_cpu_time(row.cumulative_time.0, clock_ticks),
                    cmdline: row.command.as_str().replace(',', " "),
                })
                .context("Failed to write CSV row")?;
        }
        self.writer.flush().context("Failed to flush CSV export")
    }

    /// # Errors
    /// If buffered rows cannot be flushed.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| anyhow::anyhow!("Failed to flush CSV export: {}", e.error()))
    }
}
