//! # Sentinel - Live Process Monitor
//!
//! Sentinel samples the kernel's per-process counters on a fixed interval,
//! derives CPU and memory shares for every live process, and presents the
//! busiest ones in a terminal table, plain text, or JSON. It can also watch
//! for processes that cross CPU or memory thresholds, log them, post them to
//! a webhook, and keep running in the background as a daemon.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     /proc (Kernel Counters)                     │
//! │  • <pid>/stat, status, cmdline                                  │
//! │  • stat (cpu line), meminfo, loadavg, uptime                    │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ CounterSource
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Sentinel (This Crate)                       │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Sampler    │──▶│ ProcessTable │──▶│    Ranker    │         │
//! │  │  (one tick)  │   │ (CPU%, MEM%) │   │ (sort, top N)│         │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘         │
//! │                            │                  │                 │
//! │                            ▼                  ▼                 │
//! │                    ┌──────────────┐   ┌──────────────┐          │
//! │                    │ AlertWatcher │──▶│  Renderers   │          │
//! │                    │ (thresholds) │   │ tui/text/json│          │
//! │                    └──────────────┘   └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Sampling Pipeline
//!
//! - [`procfs`]: `CounterSource` trait and the `/proc` reader behind it
//! - [`sampling`]: process table, CPU/memory derivation, the per-tick
//!   `Sampler` and the `Ranker`
//! - [`monitor`]: the run loop tying sampler, alerts and renderer together
//!
//! ### Output and Control
//!
//! - [`render`]: `Renderer` trait plus the text, JSON and silent renderers,
//!   and the CSV exporter
//! - [`tui`]: full-screen ratatui renderer with sorting, filtering and
//!   process control keys
//! - [`alert`]: threshold alerts with a per-process cooldown
//! - [`notify`]: webhook delivery of alerts
//! - [`control`]: signals and niceness changes
//!
//! ### Support
//!
//! - [`domain`]: core types (`Pid`, `Ticks`, bounded text) and error enums
//! - [`config`]: JSON config file, saved by the TUI and watched for edits
//! - [`daemon`]: pid file and background start/stop
//! - [`cli`]: command-line arguments
//! - [`shutdown`]: cancellation on SIGINT/SIGTERM
//!
//! ## Key Concepts
//!
//! - **Tick**: one full sample of every process, finished before any render
//! - **Busy time**: user plus system clock ticks, per process or system-wide
//! - **CPU%**: a process's busy-time delta over the system busy-time delta
//!   between two ticks, so all processes together sum to about 100%

pub mod alert;
pub mod cli;
pub mod config;
pub mod control;
pub mod daemon;
pub mod domain;
pub mod monitor;
pub mod notify;
pub mod procfs;
pub mod render;
pub mod sampling;
pub mod shutdown;
pub mod tui;
