//! Make a stopped tracee execute an arbitrary system call.
//!
//! The tracee keeps no evidence of the detour: its registers and the code at
//! its instruction pointer are snapshotted first and restored afterwards, so
//! the only lasting effect is whatever the kernel did for the call itself.

use crate::error::Result;
use crate::registers::{Registers, Word};
use crate::tracer;
use crate::wait;
use nix::unistd::Pid;

/// The `syscall` instruction, `0f 05`, as a little-endian code patch.
#[cfg(target_arch = "x86_64")]
const SYSCALL_INSN: Word = 0x050f;
/// The `int $0x80` instruction, `cd 80`, as a little-endian code patch.
#[cfg(target_arch = "x86")]
const SYSCALL_INSN: Word = 0x80cd;

/// Load six syscall arguments into the registers the kernel ABI reads them
/// from.
#[cfg(target_arch = "x86_64")]
fn load_arguments(regs: &mut Registers, arguments: [Word; 6]) {
    regs.di = arguments[0];
    regs.si = arguments[1];
    regs.dx = arguments[2];
    regs.r10 = arguments[3];
    regs.r8 = arguments[4];
    regs.r9 = arguments[5];
}

#[cfg(target_arch = "x86")]
fn load_arguments(regs: &mut Registers, arguments: [Word; 6]) {
    regs.bx = arguments[0];
    regs.cx = arguments[1];
    regs.dx = arguments[2];
    regs.si = arguments[3];
    regs.di = arguments[4];
    regs.bp = arguments[5];
}

/// Have the stopped tracee `pid` perform system call `number` with the six
/// given argument words.
///
/// Returns the raw kernel return value: non-negative on success, `-errno` on
/// failure. The tracee must be in a ptrace-stop; it is left stopped at the
/// exact register state it had before the call, with its code intact.
pub fn inject_syscall(pid: Pid, number: Word, arguments: [Word; 6]) -> Result<isize> {
    let old_registers = tracer::get_registers(pid)?;
    let old_code = tracer::read_memory(pid, old_registers.ip)?;

    let mut new_registers = old_registers;
    new_registers.ax = number;
    load_arguments(&mut new_registers, arguments);
    tracer::set_registers(pid, &new_registers)?;

    // Replace the two code bytes at the instruction pointer with the syscall
    // instruction, then drive the tracee through the entry and exit stops.
    tracer::write_memory(pid, old_registers.ip, (old_code & !0xffff) | SYSCALL_INSN)?;

    tracer::step_syscall(pid)?;
    while !wait::wait_for_syscall(pid)? {
        tracer::step_syscall(pid)?;
    }
    tracer::step_syscall(pid)?;
    while !wait::wait_for_syscall(pid)? {
        tracer::step_syscall(pid)?;
    }

    let result = tracer::get_registers(pid)?.ax as isize;

    tracer::write_memory(pid, old_registers.ip, old_code)?;
    tracer::set_registers(pid, &old_registers)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn arguments_land_in_the_abi_registers() {
        let mut regs = Registers::default();
        load_arguments(&mut regs, [1, 2, 3, 4, 5, 6]);
        assert_eq!(
            (regs.di, regs.si, regs.dx, regs.r10, regs.r8, regs.r9),
            (1, 2, 3, 4, 5, 6)
        );
    }

    #[cfg(target_arch = "x86")]
    #[test]
    fn arguments_land_in_the_abi_registers() {
        let mut regs = Registers::default();
        load_arguments(&mut regs, [1, 2, 3, 4, 5, 6]);
        assert_eq!(
            (regs.bx, regs.cx, regs.dx, regs.si, regs.di, regs.bp),
            (1, 2, 3, 4, 5, 6)
        );
    }

    #[test]
    fn code_patch_only_touches_the_low_two_bytes() {
        let old_code: Word = !0;
        let patched = (old_code & !0xffff) | SYSCALL_INSN;
        assert_eq!(patched & 0xffff, SYSCALL_INSN);
        assert_eq!(patched | 0xffff, old_code);
    }
}
