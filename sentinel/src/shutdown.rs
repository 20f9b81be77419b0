//! Cooperative cancellation for the run loop.
//!
//! `CancellationToken` is checked at tick boundaries and inside renderer
//! waits. `cancel_on_signals` wires SIGINT and SIGTERM to a token.

#![allow(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

static SIGNAL_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

extern "C" fn on_signal(_signal: libc::c_int) {
    // Only an atomic store: async-signal-safe
    if let Some(token) = SIGNAL_TOKEN.get() {
        token.cancel();
    }
}

/// Cancel `token` on SIGINT or SIGTERM.
///
/// Only the first token registered per process is wired up.
///
/// # Errors
/// Returns the OS error if a handler cannot be installed.
pub fn cancel_on_signals(token: &CancellationToken) -> std::io::Result<()> {
    if SIGNAL_TOKEN.set(token.clone()).is_err() {
        log::debug!("Signal handlers already installed");
        return Ok(());
    }

    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: sigaction is a plain C struct; all-zero is a valid value
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;

        // SAFETY: `action` is fully initialised and the handler only performs
        // an atomic store
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}
