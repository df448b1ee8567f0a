use crate::signal::signal_name;
use nix::errno::Errno;
use nix::unistd::Pid;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while driving a tracee.
///
/// Every variant carries the pid of the process the operation targeted, so a
/// caller juggling several tracees can tell the reports apart.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// A ptrace or waitid request failed outright.
    Trace { pid: Pid, errno: Errno },
    /// The tracee terminated while we were waiting for it to stop.
    ///
    /// `clean` is true for a plain exit, false when a signal killed it.
    /// `status` is the exit status or the killing signal accordingly.
    Terminated { pid: Pid, clean: bool, status: i32 },
    /// The tracee stopped on a signal we were not expecting at this point.
    UnexpectedSignal { pid: Pid, signal: i32 },
    /// A system call injected into the tracee returned a negative value.
    RemoteSyscall { pid: Pid, errno: Errno },
}

impl Error {
    /// The pid of the process the failed operation targeted.
    pub fn pid(&self) -> Pid {
        match *self {
            Error::Trace { pid, .. }
            | Error::Terminated { pid, .. }
            | Error::UnexpectedSignal { pid, .. }
            | Error::RemoteSyscall { pid, .. } => pid,
        }
    }

    /// A process exit code for command-line tools reporting this error.
    pub fn exit_code(&self) -> i32 {
        match *self {
            Error::Trace { errno, .. } | Error::RemoteSyscall { errno, .. } => errno as i32,
            Error::Terminated { .. } | Error::UnexpectedSignal { .. } => Errno::ESRCH as i32,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Trace { pid, errno } => {
                write!(f, "tracing request for process {} failed: {}", pid, errno.desc())
            }
            Error::Terminated { pid, clean: true, status } => {
                write!(f, "process {} exited with status {} while we were waiting for it", pid, status)
            }
            Error::Terminated { pid, clean: false, status } => {
                write!(f, "process {} was killed by {} while we were waiting for it", pid, signal_name(status))
            }
            Error::UnexpectedSignal { pid, signal } => {
                write!(f, "process {} received unexpected signal {} ({})", pid, signal, signal_name(signal))
            }
            Error::RemoteSyscall { pid, errno } => {
                write!(f, "system call injected into process {} failed: {}", pid, errno.desc())
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_pid_and_cause() {
        let err = Error::Terminated { pid: Pid::from_raw(42), clean: false, status: 9 };
        assert_eq!(
            err.to_string(),
            "process 42 was killed by SIGKILL while we were waiting for it"
        );

        let err = Error::UnexpectedSignal { pid: Pid::from_raw(7), signal: 28 };
        assert_eq!(err.to_string(), "process 7 received unexpected signal 28 (SIGWINCH)");
    }

    #[test]
    fn exit_code_prefers_the_os_error() {
        let err = Error::Trace { pid: Pid::from_raw(1), errno: Errno::EPERM };
        assert_eq!(err.exit_code(), Errno::EPERM as i32);
    }
}
