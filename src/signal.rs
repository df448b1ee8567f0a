//! Minimal signal plumbing: raise a signal at ourselves, send one to a
//! tracee, and turn signal numbers into names for error reports.

use crate::error::{Error, Result};
use nix::unistd::Pid;
use std::convert::TryFrom;

pub use nix::sys::signal::Signal;

/// Raise `signal` to the calling process.
pub fn raise(signal: Signal) -> Result<()> {
    nix::sys::signal::raise(signal).map_err(|errno| Error::Trace { pid: Pid::this(), errno })
}

/// Send `signal` to `pid`.
pub fn kill(pid: Pid, signal: Signal) -> Result<()> {
    nix::sys::signal::kill(pid, signal).map_err(|errno| Error::Trace { pid, errno })
}

/// The conventional name of a signal number, or `"unknown signal"` for
/// numbers outside the Linux set.
pub fn signal_name(signal: i32) -> &'static str {
    match Signal::try_from(signal) {
        Ok(signal) => signal.as_str(),
        Err(_) => "unknown signal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_signals_render_by_name() {
        assert_eq!(signal_name(libc::SIGTRAP), "SIGTRAP");
        assert_eq!(signal_name(libc::SIGSTOP), "SIGSTOP");
        assert_eq!(signal_name(libc::SIGKILL), "SIGKILL");
    }

    #[test]
    fn unknown_numbers_do_not_panic() {
        assert_eq!(signal_name(0), "unknown signal");
        assert_eq!(signal_name(4096), "unknown signal");
    }

    #[test]
    fn raise_delivers_to_ourselves() {
        // SIGWINCH is ignored by default, so raising it is harmless.
        raise(Signal::SIGWINCH).unwrap();
    }
}
