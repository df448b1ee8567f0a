//! Thin wrappers around the ptrace requests the engine needs.
//!
//! Every operation targets one tracee by pid and either leaves it in a
//! well-defined stopped state or fails with [`Error::Trace`]. The memory
//! copies assume the tracee is stopped: the read-modify-write handling of a
//! trailing partial word is only sound while nothing else runs in the target.

use crate::error::{Error, Result};
use crate::registers::{Registers, Word};
use libc::user_regs_struct;
use nix::sys::ptrace;
use nix::sys::ptrace::{AddressType, Options};
use nix::unistd::{ForkResult, Pid};
use std::mem;

const WORD_SIZE: usize = mem::size_of::<Word>();

/// Fork a child process.
///
/// # Safety
///
/// Inherits the hazards of `fork(2)` in a multi-threaded process: the child
/// must restrict itself to async-signal-safe work until it execs or exits.
pub unsafe fn fork() -> Result<ForkResult> {
    nix::unistd::fork().map_err(|errno| Error::Trace { pid: Pid::this(), errno })
}

/// Ask our parent to trace us. Called from a forked child.
pub fn trace_me() -> Result<()> {
    ptrace::traceme().map_err(|errno| Error::Trace { pid: Pid::this(), errno })
}

/// Attach to a running process.
///
/// Seizes rather than attaches so the tracee is not stopped as a side effect,
/// and sets the option that marks syscall stops with the high bit so
/// [`crate::wait::wait_for_syscall`] can tell them from other traps.
pub fn attach(pid: Pid) -> Result<()> {
    ptrace::seize(pid, Options::PTRACE_O_TRACESYSGOOD)
        .map_err(|errno| Error::Trace { pid, errno })
}

/// Release the tracee and let it run unsupervised again.
pub fn detach(pid: Pid) -> Result<()> {
    ptrace::detach(pid, None).map_err(|errno| Error::Trace { pid, errno })
}

/// Force a seized tracee into a ptrace-stop.
pub fn interrupt(pid: Pid) -> Result<()> {
    ptrace::interrupt(pid).map_err(|errno| Error::Trace { pid, errno })
}

/// Resume a stopped tracee until its next stop.
pub fn resume(pid: Pid) -> Result<()> {
    ptrace::cont(pid, None).map_err(|errno| Error::Trace { pid, errno })
}

/// Have a stopped tracee execute exactly one instruction.
pub fn step(pid: Pid) -> Result<()> {
    ptrace::step(pid, None).map_err(|errno| Error::Trace { pid, errno })
}

/// Run a stopped tracee until it enters or leaves a system call.
pub fn step_syscall(pid: Pid) -> Result<()> {
    ptrace::syscall(pid, None).map_err(|errno| Error::Trace { pid, errno })
}

/// Read the full general-purpose register file of a stopped tracee.
pub fn get_registers(pid: Pid) -> Result<Registers> {
    let regs = ptrace::getregs(pid).map_err(|errno| Error::Trace { pid, errno })?;
    Ok(Registers::from(regs))
}

/// Overwrite the full general-purpose register file of a stopped tracee.
pub fn set_registers(pid: Pid, regs: &Registers) -> Result<()> {
    ptrace::setregs(pid, user_regs_struct::from(*regs))
        .map_err(|errno| Error::Trace { pid, errno })
}

/// Read the machine word at `address` in the tracee.
pub fn read_memory(pid: Pid, address: Word) -> Result<Word> {
    // nix clears errno around the peek, so a word that happens to look like
    // -1 is not mistaken for a failure.
    let word = ptrace::read(pid, address as AddressType)
        .map_err(|errno| Error::Trace { pid, errno })?;
    Ok(word as Word)
}

/// Write a full machine word at `address` in the tracee.
pub fn write_memory(pid: Pid, address: Word, value: Word) -> Result<()> {
    unsafe { ptrace::write(pid, address as AddressType, value as *mut libc::c_void) }
        .map_err(|errno| Error::Trace { pid, errno })
}

/// Copy `source` into the tracee at `destination`.
///
/// Whole words are poked directly; a trailing partial word is merged into the
/// existing word there so the bytes past the end of `source` are untouched.
pub fn memcpy_to(pid: Pid, destination: Word, source: &[u8]) -> Result<()> {
    let mut chunks = source.chunks_exact(WORD_SIZE);
    let mut offset = 0;
    for chunk in &mut chunks {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(chunk);
        write_memory(pid, destination + offset, Word::from_ne_bytes(word))?;
        offset += WORD_SIZE;
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut word = read_memory(pid, destination + offset)?.to_ne_bytes();
        word[..tail.len()].copy_from_slice(tail);
        write_memory(pid, destination + offset, Word::from_ne_bytes(word))?;
    }
    Ok(())
}

/// Copy `destination.len()` bytes out of the tracee starting at `source`.
pub fn memcpy_from(pid: Pid, destination: &mut [u8], source: Word) -> Result<()> {
    let mut chunks = destination.chunks_exact_mut(WORD_SIZE);
    let mut offset = 0;
    for chunk in &mut chunks {
        chunk.copy_from_slice(&read_memory(pid, source + offset)?.to_ne_bytes());
        offset += WORD_SIZE;
    }

    let tail = chunks.into_remainder();
    if !tail.is_empty() {
        let word = read_memory(pid, source + offset)?.to_ne_bytes();
        tail.copy_from_slice(&word[..tail.len()]);
    }
    Ok(())
}

/// Replace the return address of the function the tracee is stopped in, and
/// return the old one.
///
/// Only valid before the function has touched its stack: the word at the
/// stack pointer must still be the address `call` pushed.
pub fn swap_return_address(pid: Pid, address: Word) -> Result<Word> {
    let regs = get_registers(pid)?;
    let old = read_memory(pid, regs.sp)?;
    write_memory(pid, regs.sp, address)?;
    Ok(old)
}
