//! Process control: signals and scheduling priority.

#![allow(unsafe_code)]

use crate::domain::{ControlError, Pid};

pub const NICE_MIN: i32 = -20;
pub const NICE_MAX: i32 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Term => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }

    fn raw(self) -> libc::c_int {
        match self {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

fn raw_pid(pid: Pid) -> Result<libc::pid_t, ControlError> {
    // 0 and negative values address process groups
    match libc::pid_t::try_from(pid.0) {
        Ok(raw) if raw > 0 => Ok(raw),
        _ => Err(ControlError::InvalidPid(pid)),
    }
}

/// # Errors
/// `InvalidPid` for pid 0 or out of range, `SignalFailed` when `kill` fails.
pub fn send_signal(pid: Pid, signal: Signal) -> Result<(), ControlError> {
    let raw = raw_pid(pid)?;
    // SAFETY: kill has no memory-safety preconditions
    let rc = unsafe { libc::kill(raw, signal.raw()) };
    if rc != 0 {
        return Err(ControlError::SignalFailed {
            signal: signal.name(),
            pid,
            source: std::io::Error::last_os_error(),
        });
    }
    log::info!("Sent {} to {pid}", signal.name());
    Ok(())
}

/// Whether `pid` names a live process (or zombie). A process owned by
/// another user still counts.
pub fn process_exists(pid: Pid) -> bool {
    let Ok(raw) = raw_pid(pid) else {
        return false;
    };
    // SAFETY: signal 0 only checks permissions and existence
    let rc = unsafe { libc::kill(raw, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// # Errors
/// `NiceOutOfRange` outside -20..=19, `PriorityFailed` when `setpriority` fails.
pub fn set_niceness(pid: Pid, nice: i32) -> Result<(), ControlError> {
    if !(NICE_MIN..=NICE_MAX).contains(&nice) {
        return Err(ControlError::NiceOutOfRange(nice));
    }
    raw_pid(pid)?;
    // SAFETY: setpriority has no memory-safety preconditions
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid.0, nice) };
    if rc != 0 {
        return Err(ControlError::PriorityFailed { pid, source: std::io::Error::last_os_error() });
    }
    log::info!("Set nice {nice} for {pid}");
    Ok(())
}

/// # Errors
/// `PriorityFailed` when `getpriority` fails.
pub fn current_niceness(pid: Pid) -> Result<i32, ControlError> {
    raw_pid(pid)?;
    // -1 is a valid priority, so errno must be cleared to tell it from failure
    // SAFETY: __errno_location returns this thread's errno slot; getpriority
    // has no memory-safety preconditions
    let (nice, errno) = unsafe {
        *libc::__errno_location() = 0;
        let nice = libc::getpriority(libc::PRIO_PROCESS, pid.0);
        (nice, *libc::__errno_location())
    };
    if nice == -1 && errno != 0 {
        return Err(ControlError::PriorityFailed { pid, source: std::io::Error::from_raw_os_error(errno) });
    }
    Ok(nice)
}

/// `current + delta` clamped to the valid nice range
pub fn adjusted_niceness(current: i64, delta: i32) -> i32 {
    let target = current.saturating_add(i64::from(delta));
    let clamped = target.clamp(i64::from(NICE_MIN), i64::from(NICE_MAX));
    i32::try_from(clamped).unwrap_or(NICE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_zero_rejected() {
        assert!(matches!(send_signal(Pid(0), Signal::Term), Err(ControlError::InvalidPid(Pid(0)))));
        assert!(matches!(send_signal(Pid(u32::MAX), Signal::Kill), Err(ControlError::InvalidPid(_))));
    }

    #[test]
    fn test_signal_to_missing_process_fails() {
        let missing = Pid(i32::MAX as u32);
        let err = send_signal(missing, Signal::Term).unwrap_err();
        assert!(matches!(err, ControlError::SignalFailed { signal: "SIGTERM", .. }));
    }

    #[test]
    fn test_nice_range_validated() {
        let me = Pid(std::process::id());
        assert!(matches!(set_niceness(me, 20), Err(ControlError::NiceOutOfRange(20))));
        assert!(matches!(set_niceness(me, -21), Err(ControlError::NiceOutOfRange(-21))));
    }

    #[test]
    fn test_current_niceness_of_self() {
        let nice = current_niceness(Pid(std::process::id())).unwrap();
        assert!((NICE_MIN..=NICE_MAX).contains(&nice));
    }

    #[test]
    fn test_process_exists() {
        assert!(process_exists(Pid(std::process::id())));
        assert!(!process_exists(Pid(i32::MAX as u32)));
        assert!(!process_exists(Pid(0)));
    }

    #[test]
    fn test_adjusted_niceness_clamps() {
        assert_eq!(adjusted_niceness(0, -5), -5);
        assert_eq!(adjusted_niceness(-18, -5), -20);
        assert_eq!(adjusted_niceness(17, 5), 19);
    }
}
