//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep pids, scheduler ticks and display strings from
//! being mixed up with plain integers and unbounded `String`s.

use serde::{Serialize, Serializer};
use std::fmt;

/// Process ID
///
/// Assigned by the kernel and immutable for the lifetime of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// Cumulative scheduler time in clock ticks (`utime + stime`)
///
/// Monotonic non-decreasing while the process lives. A decrease means the pid
/// was reused and the counter restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Ticks(pub u64);

impl Ticks {
    /// Ticks elapsed since `earlier`, or 0 if the counter went backwards
    #[must_use]
    pub fn saturating_since(self, earlier: Ticks) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Scheduler run state symbol (`R`, `S`, `D`, `Z`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunState(pub char);

impl RunState {
    #[must_use]
    pub fn is_running(self) -> bool {
        self.0 == 'R'
    }
}

impl Default for RunState {
    fn default() -> Self {
        RunState('?')
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RunState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.0)
    }
}

/// Text holding at most `N` characters
///
/// Longer input is cut at a character boundary on construction, so a value
/// can never outgrow its limit no matter where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BoundedText<const N: usize>(String);

impl<const N: usize> BoundedText<N> {
    /// Maximum number of characters this type keeps
    pub const MAX_CHARS: usize = N;

    pub fn new(text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        match text.char_indices().nth(N) {
            Some((cut, _)) => Self(text[..cut].to_string()),
            None => Self(text.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> fmt::Display for BoundedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<const N: usize> From<&str> for BoundedText<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> From<String> for BoundedText<N> {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> Serialize for BoundedText<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Short program name (`comm` from `/proc/<pid>/stat`)
pub type DisplayName = BoundedText<64>;

/// Owning user name, or the numeric uid when it has no name
pub type UserName = BoundedText<32>;

/// Full command line with arguments joined by spaces
pub type CommandLine = BoundedText<4096>;

/// System load averages over 1, 5 and 15 minutes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LoadAverages {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}
