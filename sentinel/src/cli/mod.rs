//! Command-line interface for sentinel
//!
//! Argument parsing and how flags override the config file

pub mod args;

pub use args::{Args, Command, DaemonAction, Mode};
