//! Background monitor lifecycle: `daemon start|run|stop|status`.
//!
//! `start` re-launches this executable as `daemon run` in its own session
//! and records the child's pid in `~/.sentinel/daemon.pid`. `run` is watch
//! mode in the foreground; it claims the pid file and releases it on exit.

#![allow(unsafe_code)]

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::config::Config;
use crate::control::{self, Signal};
use crate::domain::{ControlError, DaemonError, Pid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running(Pid),
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Pid),
    AlreadyRunning(Pid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(Pid),
    NotRunning,
}

#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.sentinel/daemon.pid`
    pub fn default_path() -> PathBuf {
        Config::state_dir().join("daemon.pid")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, source: std::io::Error) -> DaemonError {
        DaemonError::PidFile { path: self.path.clone(), source }
    }

    /// Recorded pid; `None` when the file is absent or holds garbage.
    ///
    /// # Errors
    /// The file exists but cannot be read.
    pub fn read(&self) -> Result<Option<Pid>, DaemonError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };
        match content.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Ok(Some(Pid(pid))),
            _ => {
                warn!("Ignoring malformed pid file {}", self.path.display());
                Ok(None)
            }
        }
    }

    /// # Errors
    /// The directory or file cannot be written.
    pub fn write(&self, pid: Pid) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        fs::write(&self.path, format!("{}\n", pid.0)).map_err(|e| self.error(e))
    }

    /// Missing file is fine.
    ///
    /// # Errors
    /// Any other removal failure.
    pub fn remove(&self) -> Result<(), DaemonError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(self.error(e)),
            _ => Ok(()),
        }
    }

    /// Recorded pid if that process still exists
    ///
    /// # Errors
    /// See `read`.
    pub fn running(&self) -> Result<Option<Pid>, DaemonError> {
        Ok(self.read()?.filter(|pid| control::process_exists(*pid)))
    }

    /// Record `own` as the running monitor.
    ///
    /// # Errors
    /// `AlreadyRunning` when a different live process holds the file.
    pub fn claim(&self, own: Pid) -> Result<(), DaemonError> {
        match self.running()? {
            Some(pid) if pid != own => Err(DaemonError::AlreadyRunning(pid)),
            _ => self.write(own),
        }
    }

    /// Remove the file if it still names `own`.
    ///
    /// # Errors
    /// See `remove`.
    pub fn release(&self, own: Pid) -> Result<(), DaemonError> {
        if self.read()? == Some(own) {
            self.remove()?;
        }
        Ok(())
    }
}

/// # Errors
/// The pid file cannot be read.
pub fn status(pid_file: &PidFile) -> Result<Status, DaemonError> {
    Ok(pid_file.running()?.map_or(Status::Stopped, Status::Running))
}

/// Launch `exe` with `args` detached in a new session, stdout discarded and
/// stderr appended to `log_path`.
///
/// # Errors
/// Pid file access, the log file, or the spawn itself failing.
pub fn start(
    pid_file: &PidFile,
    exe: &Path,
    args: &[OsString],
    log_path: &Path,
) -> Result<StartOutcome, DaemonError> {
    if let Some(pid) = pid_file.running()? {
        return Ok(StartOutcome::AlreadyRunning(pid));
    }

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(DaemonError::Spawn)?;
    }
    let log = OpenOptions::new().create(true).append(true).open(log_path).map_err(DaemonError::Spawn)?;

    let mut command = Command::new(exe);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(log);
    // SAFETY: setsid is async-signal-safe and touches no parent state
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    let child = command.spawn().map_err(DaemonError::Spawn)?;

    let pid = Pid(child.id());
    pid_file.write(pid)?;
    info!("Background monitor started as {pid}, logging to {}", log_path.display());
    Ok(StartOutcome::Started(pid))
}

/// Send SIGTERM to the recorded process and forget it. A process that is
/// already gone counts as stopped.
///
/// # Errors
/// Pid file access, or a signal failure other than the process being gone.
pub fn stop(pid_file: &PidFile) -> Result<StopOutcome, DaemonError> {
    let Some(pid) = pid_file.read()? else {
        return Ok(StopOutcome::NotRunning);
    };
    match control::send_signal(pid, Signal::Term) {
        Ok(()) => {}
        Err(ControlError::SignalFailed { ref source, .. }) if source.raw_os_error() == Some(libc::ESRCH) => {
            debug!("{pid} was already gone");
        }
        Err(e) => return Err(DaemonError::Stop(e)),
    }
    pid_file.remove()?;
    Ok(StopOutcome::Stopped(pid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use tempfile::TempDir;

    fn pid_file(dir: &TempDir) -> PidFile {
        PidFile::new(dir.path().join("state").join("daemon.pid"))
    }

    fn own_pid() -> Pid {
        Pid(std::process::id())
    }

    #[test]
    fn test_missing_or_garbage_pid_file() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        assert_eq!(file.read().unwrap(), None);

        fs::create_dir_all(file.path().parent().unwrap()).unwrap();
        fs::write(file.path(), "not a pid\n").unwrap();
        assert_eq!(file.read().unwrap(), None);
        assert_eq!(status(&file).unwrap(), Status::Stopped);
    }

    #[test]
    fn test_status_follows_process() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        file.write(own_pid()).unwrap();
        assert_eq!(status(&file).unwrap(), Status::Running(own_pid()));

        // pid_max never reaches this
        file.write(Pid(i32::MAX as u32)).unwrap();
        assert_eq!(status(&file).unwrap(), Status::Stopped);
    }

    #[test]
    fn test_claim_refuses_other_live_owner() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        file.write(own_pid()).unwrap();
        assert!(matches!(file.claim(Pid(i32::MAX as u32)), Err(DaemonError::AlreadyRunning(_))));

        // Stale owner is replaced
        file.write(Pid(i32::MAX as u32)).unwrap();
        file.claim(own_pid()).unwrap();
        assert_eq!(file.read().unwrap(), Some(own_pid()));
    }

    #[test]
    fn test_release_only_own_pid() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        file.write(Pid(12345)).unwrap();
        file.release(own_pid()).unwrap();
        assert!(file.path().exists());

        file.write(own_pid()).unwrap();
        file.release(own_pid()).unwrap();
        assert!(!file.path().exists());
        file.release(own_pid()).unwrap();
    }

    #[test]
    fn test_stop_without_pid_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(stop(&pid_file(&dir)).unwrap(), StopOutcome::NotRunning);
    }

    #[test]
    fn test_stop_gone_process_clears_file() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        file.write(Pid(i32::MAX as u32)).unwrap();
        assert_eq!(stop(&file).unwrap(), StopOutcome::Stopped(Pid(i32::MAX as u32)));
        assert!(!file.path().exists());
    }

    #[test]
    fn test_stop_terminates_recorded_process() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = Pid(child.id());
        file.write(pid).unwrap();

        assert_eq!(stop(&file).unwrap(), StopOutcome::Stopped(pid));
        assert_eq!(child.wait().unwrap().signal(), Some(libc::SIGTERM));
        assert!(!file.path().exists());
    }

    #[test]
    fn test_start_refuses_when_running() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        file.write(own_pid()).unwrap();

        let outcome = start(&file, Path::new("/nonexistent/sentinel"), &[], &dir.path().join("log")).unwrap();
        assert_eq!(outcome, StartOutcome::AlreadyRunning(own_pid()));
        assert!(!dir.path().join("log").exists());
    }

    #[test]
    fn test_start_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let file = pid_file(&dir);
        let err = start(&file, Path::new("/nonexistent/sentinel"), &[], &dir.path().join("log")).unwrap_err();
        assert!(matches!(err, DaemonError::Spawn(_)));
        assert_eq!(file.read().unwrap(), None);
    }
}
