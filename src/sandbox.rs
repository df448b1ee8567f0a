//! Run a local function inside a forked child, under our control.
//!
//! The child volunteers for tracing, stops itself, and then calls the
//! function like any other code would. The parent plants a breakpoint on the
//! function's first byte, so it regains control exactly at entry; before
//! letting the function body run it swaps the return address on the child's
//! stack with the address of our embedded trap instruction, so it regains
//! control again exactly at return. The register file is snapshotted at both
//! points.

use crate::breakpoint::Breakpoint;
use crate::error::Result;
use crate::registers::{Registers, Word};
use crate::signal;
use crate::signal::Signal;
use crate::tracer;
use crate::trap;
use crate::wait;
use nix::unistd::{ForkResult, Pid};

/// What [`call_sandboxed`] observed: the child's pid and its register file at
/// function entry and at function return.
#[derive(Copy, Clone, Debug)]
pub struct CallOutcome {
    pub pid: Pid,
    pub entry_registers: Registers,
    pub return_registers: Registers,
}

impl CallOutcome {
    /// The called function's return value: the accumulator at the moment the
    /// child bounced off the return trap, which is where the ABI puts a
    /// word-sized result.
    pub fn result(&self) -> Word {
        self.return_registers.ax
    }
}

/// Call `f(argument)` in a forked child and observe its entry and return.
///
/// Returns once the child has re-entered a ptrace-stop on the return trap.
/// The child is left alive and stopped there; the caller decides whether to
/// detach from it or kill it. The function's argument travels the normal ABI
/// path because the child calls `f` itself.
pub fn call_sandboxed(f: extern "C" fn(Word) -> Word, argument: Word) -> Result<CallOutcome> {
    match unsafe { tracer::fork() }? {
        ForkResult::Child => {
            // No channel to report failures on this side; just don't run f
            // outside of the parent's control.
            if tracer::trace_me().is_err() || signal::raise(Signal::SIGTRAP).is_err() {
                unsafe { libc::_exit(libc::EXIT_FAILURE) };
            }

            // The parent has planted its breakpoint by the time we run again.
            f(argument);

            // Normally the parent hijacks the return path before we get here.
            unsafe { libc::_exit(libc::EXIT_SUCCESS) }
        }
        ForkResult::Parent { child } => {
            run_traced_call(child, f as Word).map(|(entry_registers, return_registers)| {
                CallOutcome { pid: child, entry_registers, return_registers }
            })
        }
    }
}

fn run_traced_call(child: Pid, entry: Word) -> Result<(Registers, Registers)> {
    // The child announces readiness with its own SIGTRAP.
    wait::wait_for_trap(child)?;

    let breakpoint = Breakpoint::set(child, entry)?;
    tracer::resume(child)?;

    // Function entry: restore the patched instruction (rewinding the ip onto
    // it) and record the registers before a single instruction of the
    // function has run.
    wait::wait_for_trap_at(child, entry)?;
    breakpoint.restore()?;
    let entry_registers = tracer::get_registers(child)?;

    // The prologue has not run yet, so the word at the stack pointer is still
    // the return address. Point it at our trap.
    tracer::swap_return_address(child, trap::trap_address())?;
    tracer::resume(child)?;

    // Function return, via the trap.
    wait::wait_for_trap_at(child, trap::trap_address())?;
    let return_registers = tracer::get_registers(child)?;

    Ok((entry_registers, return_registers))
}
