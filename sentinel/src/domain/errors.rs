//! Structured error types for sentinel
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Pid;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the counter reader
#[derive(Error, Debug)]
pub enum ReadError {
    /// The process exited between enumeration and the read. Expected, never
    /// shown to the user.
    #[error("Process {0} is gone")]
    ProcessGone(Pid),

    /// A system-wide counter file could not be read or parsed
    #[error("System counter unavailable: {0}")]
    SystemCounterUnavailable(&'static str),

    /// The process listing itself cannot be read
    #[error("Cannot list processes under {}: {source}", root.display())]
    EnumerationUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Returned by `ProcessTable::ingest_sample` for a pid that was not marked
/// alive by this tick's reconciliation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Process {0} was not marked alive this tick")]
pub struct NotAlive(pub Pid);

/// The only way a sampling tick can fail
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Process enumeration unavailable: {0}")]
    EnumerationUnavailable(#[source] ReadError),
}

/// Failures sending signals or changing priorities
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Invalid process ID: {0}")]
    InvalidPid(Pid),

    #[error("Nice value must be between -20 and 19, got {0}")]
    NiceOutOfRange(i32),

    #[error("Failed to send {signal} to {pid}: {source}")]
    SignalFailed {
        signal: &'static str,
        pid: Pid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set priority for {pid}: {source}")]
    PriorityFailed {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Webhook delivery failures. Logged, never fatal.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook answered {0}")]
    Status(reqwest::StatusCode),
}

/// Background monitor lifecycle failures
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Pid file {}: {source}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch background monitor: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to stop background monitor: {0}")]
    Stop(#[source] ControlError),

    #[error("Background monitor already running as {0}")]
    AlreadyRunning(Pid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_display() {
        let err = ReadError::ProcessGone(Pid(1234));
        assert_eq!(err.to_string(), "Process PID:1234 is gone");
    }

    #[test]
    fn test_enumeration_error_names_root() {
        let err = SampleError::EnumerationUnavailable(ReadError::EnumerationUnavailable {
            root: PathBuf::from("/nonexistent/proc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert!(err.to_string().contains("/nonexistent/proc"));
        assert!(err.to_string().starts_with("Process enumeration unavailable"));
    }

    #[test]
    fn test_pid_file_error_names_path() {
        let err = DaemonError::PidFile {
            path: PathBuf::from("/root/.sentinel/daemon.pid"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("Pid file /root/.sentinel/daemon.pid"));
    }

    #[test]
    fn test_signal_error_names_signal_and_pid() {
        let err = ControlError::SignalFailed {
            signal: "SIGTERM",
            pid: Pid(42),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("SIGTERM"));
        assert!(err.to_string().contains("PID:42"));
    }
}
