//! Domain model for sentinel
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Length-limited text instead of fixed-size buffers
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{
    BoundedText, CommandLine, DisplayName, LoadAverages, Pid, RunState, Ticks, UserName,
};

pub use errors::{
    ConfigError, ControlError, DaemonError, NotAlive, NotifyError, ReadError, SampleError,
};
