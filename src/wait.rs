//! Blocking waits that classify a tracee's next ptrace-stop.
//!
//! All three entry points block in `waitid` for a state change of one
//! specific pid and sort the reported [`WaitStatus`]:
//!
//! - terminations (exit, kill, core dump) become [`Error::Terminated`],
//! - stops on SIGTRAP or SIGSTOP are the stops the engine works with,
//! - stops on anything else become [`Error::UnexpectedSignal`],
//! - spurious continue notifications are consumed and the wait repeats.

use crate::error::{Error, Result};
use crate::registers::Word;
use crate::signal::Signal;
use crate::tracer;
use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// The next consumed state-change notification for `pid`.
fn next_status(pid: Pid) -> Result<WaitStatus> {
    waitid(Id::Pid(pid), WaitPidFlag::WSTOPPED | WaitPidFlag::WEXITED)
        .map_err(|errno| Error::Trace { pid, errno })
}

/// Wait until the tracee enters a ptrace-stop.
///
/// Returns normally for a stop on SIGTRAP or SIGSTOP, including the
/// SIGTRAP-flavoured event stop an [`interrupt`](crate::tracer::interrupt)
/// produces; fails with [`Error::Terminated`] if the process died first and
/// with [`Error::UnexpectedSignal`] for a stop on any other signal.
pub fn wait_for_trap(pid: Pid) -> Result<()> {
    loop {
        match next_status(pid)? {
            WaitStatus::Exited(_, status) => {
                return Err(Error::Terminated { pid, clean: true, status });
            }
            WaitStatus::Signaled(_, signal, _) => {
                return Err(Error::Terminated { pid, clean: false, status: signal as i32 });
            }
            WaitStatus::Stopped(_, signal) | WaitStatus::PtraceEvent(_, signal, _) => {
                if signal != Signal::SIGTRAP && signal != Signal::SIGSTOP {
                    return Err(Error::UnexpectedSignal { pid, signal: signal as i32 });
                }
                return Ok(());
            }
            // A syscall stop is not a trap the engine ever waits for here.
            WaitStatus::PtraceSyscall(_) => {
                return Err(Error::UnexpectedSignal { pid, signal: libc::SIGTRAP | 0x80 });
            }
            // Continued (and StillAlive, which needs WNOHANG): not stops.
            _ => continue,
        }
    }
}

/// Wait until the tracee traps at `address` specifically.
///
/// A breakpoint trap leaves the instruction pointer one past the `int3`, so
/// the check is against `ip - 1`. Traps at other addresses are ridden past by
/// resuming the tracee and waiting again.
pub fn wait_for_trap_at(pid: Pid, address: Word) -> Result<()> {
    loop {
        wait_for_trap(pid)?;
        let regs = tracer::get_registers(pid)?;
        if regs.ip.wrapping_sub(1) == address {
            return Ok(());
        }
        tracer::resume(pid)?;
    }
}

/// Wait for the next stop and report whether it was a syscall stop.
///
/// True exactly when the stop was delivered as SIGTRAP with the
/// syscall-good bit set, i.e. a real syscall-entry or syscall-exit stop.
/// Any other benign stop returns false so the caller can decide to re-step;
/// terminations still fail.
pub fn wait_for_syscall(pid: Pid) -> Result<bool> {
    loop {
        match next_status(pid)? {
            WaitStatus::Exited(_, status) => {
                return Err(Error::Terminated { pid, clean: true, status });
            }
            WaitStatus::Signaled(_, signal, _) => {
                return Err(Error::Terminated { pid, clean: false, status: signal as i32 });
            }
            WaitStatus::PtraceSyscall(_) => return Ok(true),
            WaitStatus::Stopped(_, signal) | WaitStatus::PtraceEvent(_, signal, _) => {
                log::debug!(
                    "process {} stopped on {} while waiting for a syscall stop",
                    pid,
                    signal.as_str()
                );
                return Ok(false);
            }
            _ => continue,
        }
    }
}
