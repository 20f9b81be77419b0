//! Renderers
//!
//! A renderer receives one `Snapshot` per tick and then owns the wait until
//! the next tick, so interactive renderers can react to input in between.
//!
//! - `text`: plain columns with an ANSI clear per tick
//! - `json`: one JSON object per line
//! - `SilentRenderer`: draws nothing, for alert-only runs
//! - `export`: CSV rows per tick, written next to any renderer
//! - the full-screen TUI lives in `crate::tui`

pub mod export;
pub mod format;
pub mod json;
pub mod text;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use crate::alert::Alert;
use crate::sampling::{ProcessRow, RankSettings, SortOrder, TickSummary};
use crate::shutdown::CancellationToken;

pub use export::CsvExporter;
pub use json::JsonRenderer;
pub use text::TextRenderer;

/// Longest uninterrupted sleep while waiting for the next tick
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Everything a renderer draws for one tick
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub summary: &'a TickSummary,
    pub rows: &'a [ProcessRow],
    pub order: SortOrder,
    pub filter: Option<&'a str>,
    /// Entries in the process table, before filtering and truncation
    pub tracked: usize,
    pub display_budget: usize,
    pub clock_ticks: u64,
    pub cpu_count: usize,
    /// Alerts fired this tick
    pub alerts: &'a [Alert],
}

/// What the run loop should do when a wait returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Deadline reached or cancelled; run the next tick
    Tick,
    /// Re-rank the current table with new settings and render again
    Rerank(RankSettings),
}

pub trait Renderer {
    /// # Errors
    /// Output failures.
    fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()>;

    /// Block until `timeout` elapses, `token` is cancelled, or the renderer
    /// wants a re-rank.
    ///
    /// # Errors
    /// Input failures.
    fn wait(&mut self, timeout: Duration, token: &CancellationToken) -> Result<Control> {
        sleep_unless_cancelled(timeout, token);
        Ok(Control::Tick)
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        (**self).render(snapshot)
    }

    fn wait(&mut self, timeout: Duration, token: &CancellationToken) -> Result<Control> {
        (**self).wait(timeout, token)
    }
}

/// Sleep for `timeout` in short slices, returning early once cancelled
pub fn sleep_unless_cancelled(timeout: Duration, token: &CancellationToken) {
    let deadline = Instant::now() + timeout;
    while !token.is_cancelled() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(WAIT_SLICE));
    }
}

/// Draws nothing. Alerts still reach the log.
#[derive(Debug, Default)]
pub struct SilentRenderer {
    frames: u64,
}

impl SilentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots received so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for SilentRenderer {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        self.frames += 1;
        log::debug!(
            "tick {}: {} rows, {} alerts",
            self.frames,
            snapshot.rows.len(),
            snapshot.alerts.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_returns_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let started = Instant::now();
        sleep_unless_cancelled(Duration::from_secs(10), &token);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_waits_for_timeout() {
        let token = CancellationToken::new();
        let started = Instant::now();
        sleep_unless_cancelled(Duration::from_millis(60), &token);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
