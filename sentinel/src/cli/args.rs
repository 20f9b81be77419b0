//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Config;

/// How ticks are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Full-screen interactive table
    #[default]
    Tui,
    /// Plain columns, screen cleared each tick
    Text,
    /// One JSON object per tick
    Json,
    /// No table; log alerts only
    Watch,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run watch mode in the background
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum DaemonAction {
    /// Launch a detached background monitor
    Start,
    /// Run the background monitor in the foreground
    Run,
    /// Stop the background monitor
    Stop,
    /// Report whether the background monitor is running
    Status,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Live process monitor with CPU and memory alerts",
    after_help = "\
EXAMPLES:
    sentinel                                 Interactive table
    sentinel --mode text -n 20               Top 20 rows, plain text
    sentinel --mode json --iterations 5      Five JSON lines, then exit
    sentinel --mode watch --cpu-threshold 90 Log processes above 90% CPU
    sentinel daemon start --mem-threshold 70 Alert in the background
    sentinel daemon stop                     Stop the background monitor"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output mode
    #[arg(short, long, value_enum, default_value_t = Mode::Tui)]
    pub mode: Mode,

    /// Milliseconds between ticks (minimum 100)
    #[arg(short, long, value_name = "MS", global = true)]
    pub interval_ms: Option<u64>,

    /// Maximum rows shown per tick
    #[arg(short = 'n', long, value_name = "N")]
    pub rows: Option<usize>,

    /// Stop after N ticks (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub iterations: u64,

    /// Root of the proc filesystem
    #[arg(long, value_name = "DIR", global = true)]
    pub proc_root: Option<PathBuf>,

    /// Config file (default: ~/.sentinel/config.json)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable CPU and memory alerts
    #[arg(long)]
    pub alerts: bool,

    /// CPU alert threshold in percent
    #[arg(long, value_name = "PERCENT", global = true)]
    pub cpu_threshold: Option<f64>,

    /// Memory alert threshold in percent
    #[arg(long, value_name = "PERCENT", global = true)]
    pub mem_threshold: Option<f64>,

    /// Append one CSV row per process per tick to FILE
    #[arg(long, value_name = "FILE", env = "SENTINEL_EXPORT_CSV", global = true)]
    pub export_csv: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Args {
    /// Override config file values with the flags that were given.
    ///
    /// Watch mode and either threshold flag turn alerts on.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ms) = self.interval_ms {
            config.interval_ms = ms;
        }
        if let Some(rows) = self.rows {
            config.display_budget = rows;
        }
        if let Some(ref root) = self.proc_root {
            config.proc_root.clone_from(root);
        }
        if let Some(cpu) = self.cpu_threshold {
            config.alerts.cpu_threshold = cpu;
            config.alerts.enabled = true;
        }
        if let Some(mem) = self.mem_threshold {
            config.alerts.mem_threshold = mem;
            config.alerts.enabled = true;
        }
        if self.alerts || self.effective_mode() == Mode::Watch {
            config.alerts.enabled = true;
        }
    }

    /// `daemon run` always watches; other commands take `--mode`
    pub fn effective_mode(&self) -> Mode {
        match self.command {
            Some(Command::Daemon { action: DaemonAction::Run }) => Mode::Watch,
            _ => self.mode,
        }
    }

    /// Arguments for the detached `daemon run` child: the monitor flags
    /// that were given, with paths made absolute.
    pub fn daemon_run_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["daemon".into(), "run".into()];
        let mut push = |flag: &str, value: OsString| {
            args.push(flag.into());
            args.push(value);
        };
        if let Some(ms) = self.interval_ms {
            push("--interval-ms", ms.to_string().into());
        }
        if let Some(ref root) = self.proc_root {
            push("--proc-root", absolute(root));
        }
        if let Some(ref config) = self.config {
            push("--config", absolute(config));
        }
        if let Some(cpu) = self.cpu_threshold {
            push("--cpu-threshold", cpu.to_string().into());
        }
        if let Some(mem) = self.mem_threshold {
            push("--mem-threshold", mem.to_string().into());
        }
        if let Some(ref csv) = self.export_csv {
            push("--export-csv", absolute(csv));
        }
        args
    }

    /// `None` when `--iterations 0`
    pub fn iteration_limit(&self) -> Option<u64> {
        (self.iterations > 0).then_some(self.iterations)
    }
}

fn absolute(path: &std::path::Path) -> OsString {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()).into_os_string()
}
