//! # sentinel - Main Entry Point
//!
//! Supports four output modes:
//! - **TUI** (default): full-screen interactive process table
//! - **Text** (`--mode text`): plain columns redrawn every tick
//! - **JSON** (`--mode json`): one object per tick on stdout
//! - **Watch** (`--mode watch`): no table, alerts go to the log
//!
//! and a background monitor: `sentinel daemon start|run|stop|status`.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use std::path::PathBuf;

use sentinel::alert::AlertWatcher;
use sentinel::cli::{Args, Command, DaemonAction, Mode};
use sentinel::config::{Config, ConfigWatch};
use sentinel::daemon::{self, PidFile, StartOutcome, Status, StopOutcome};
use sentinel::domain::{Pid, SampleError};
use sentinel::monitor::{Monitor, MonitorSettings};
use sentinel::notify::WebhookNotifier;
use sentinel::procfs::ProcFs;
use sentinel::render::{CsvExporter, JsonRenderer, Renderer, SilentRenderer, TextRenderer};
use sentinel::sampling::{Ranker, Sampler, SortOrder};
use sentinel::shutdown::{cancel_on_signals, CancellationToken};
use sentinel::tui::TuiRenderer;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPROC: i32 = 74;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_logging(&args);

    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

/// The TUI owns the terminal, so logging stays off there unless `RUST_LOG`
/// asks for it. The background monitor logs to a file and keeps more.
fn init_logging(args: &Args) {
    let default_filter = match (&args.command, args.mode) {
        (Some(Command::Daemon { action: DaemonAction::Run }), _) => "info",
        (Some(Command::Daemon { .. }), _) => "warn",
        (None, Mode::Tui) => "off",
        (None, Mode::Text | Mode::Json | Mode::Watch) => "warn",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.chain().any(|cause| cause.downcast_ref::<SampleError>().is_some()) {
        EXIT_NOPROC
    } else {
        EXIT_ERROR
    }
}

fn config_path(args: &Args) -> PathBuf {
    args.config.clone().unwrap_or_else(Config::default_path)
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        // An explicit path must exist
        Some(ref path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    args.apply_to(&mut config);
    debug!("Effective config: {config:?}");
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    match args.command {
        Some(Command::Daemon { action }) => run_daemon(args, action),
        None => run_monitor(args),
    }
}

fn run_daemon(args: &Args, action: DaemonAction) -> Result<()> {
    let pid_file = PidFile::new(PidFile::default_path());
    match action {
        DaemonAction::Start => {
            let exe = std::env::current_exe().context("Failed to locate sentinel executable")?;
            let log_path = Config::state_dir().join("daemon.log");
            match daemon::start(&pid_file, &exe, &args.daemon_run_args(), &log_path)? {
                StartOutcome::Started(pid) => println!("daemon started (pid: {})", pid.0),
                StartOutcome::AlreadyRunning(pid) => println!("daemon already running (pid: {})", pid.0),
            }
        }
        DaemonAction::Stop => match daemon::stop(&pid_file)? {
            StopOutcome::Stopped(_) => println!("daemon stopped"),
            StopOutcome::NotRunning => println!("daemon not running"),
        },
        DaemonAction::Status => match daemon::status(&pid_file)? {
            Status::Running(pid) => println!("daemon: running (pid: {})", pid.0),
            Status::Stopped => println!("daemon: stopped"),
        },
        DaemonAction::Run => {
            let own = Pid(std::process::id());
            pid_file.claim(own)?;
            log::info!("Background monitor running as {own}");
            let result = run_monitor(args);
            if let Err(e) = pid_file.release(own) {
                log::warn!("{e}");
            }
            result?;
        }
    }
    Ok(())
}

fn run_monitor(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let mode = args.effective_mode();

    let token = CancellationToken::new();
    cancel_on_signals(&token).context("Failed to install signal handlers")?;

    let source = ProcFs::with_root(&config.proc_root);
    let sampler = Sampler::new(source);
    let ranker = Ranker::new(config.display_budget).with_order(SortOrder::descending(config.sort));
    let settings = MonitorSettings { interval: config.interval(), iterations: args.iteration_limit() };

    if !args.quiet && args.command.is_none() && matches!(mode, Mode::Text | Mode::Watch) {
        eprintln!("sentinel v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("proc: {}", config.proc_root.display());
        eprintln!("interval: {}ms", config.interval().as_millis());
        if config.alerts.enabled {
            eprintln!(
                "alerts: cpu >= {}%, mem >= {}%",
                config.alerts.cpu_threshold, config.alerts.mem_threshold
            );
        }
    }

    let renderer: Box<dyn Renderer> = match mode {
        Mode::Tui => Box::new(TuiRenderer::new(config_path(args))?),
        Mode::Text => Box::new(TextRenderer::stdout()),
        Mode::Json => Box::new(JsonRenderer::stdout()),
        Mode::Watch => Box::new(SilentRenderer::new()),
    };

    // Alerts forced on from the command line survive a config edit
    let force_alerts =
        args.alerts || args.cpu_threshold.is_some() || args.mem_threshold.is_some() || mode == Mode::Watch;
    let mut monitor = Monitor::new(sampler, ranker, renderer, settings)
        .with_config_watch(ConfigWatch::new(config_path(args)), force_alerts);
    if config.alerts.enabled {
        monitor = monitor.with_alerts(AlertWatcher::new(config.alerts.thresholds()));
    }
    if let Some(notifier) = WebhookNotifier::from_config(&config.alerts) {
        monitor = monitor.with_notifier(notifier);
    }
    if let Some(ref path) = args.export_csv {
        monitor = monitor.with_export(CsvExporter::append_to(path)?);
    }

    let ticks = monitor.run(&token)?;
    // Drop the renderer first so the TUI leaves the alternate screen
    drop(monitor);
    info!("Stopped after {ticks} ticks");
    Ok(())
}
