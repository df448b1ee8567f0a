//! One-byte software breakpoints.

use crate::error::Result;
use crate::registers::Word;
use crate::tracer;
use nix::unistd::Pid;

/// The x86 breakpoint instruction, `int3`.
const BREAKPOINT_OPCODE: Word = 0xcc;

/// An armed breakpoint in a tracee.
///
/// Between [`Breakpoint::set`] and [`Breakpoint::restore`] the byte at
/// `address` in the tracee is `0xCC` and `original_code` holds the word that
/// was there before. Dropping an armed breakpoint without restoring it leaves
/// the patch in place.
#[derive(Copy, Clone, Debug)]
pub struct Breakpoint {
    /// The process the breakpoint is set in.
    pub pid: Pid,
    /// The address of the breakpoint.
    pub address: Word,
    /// The code word that was at `address` before the patch.
    pub original_code: Word,
}

impl Breakpoint {
    /// Arm a breakpoint at `address`: replace the low byte of the word there
    /// with `int3`, remembering the original word.
    pub fn set(pid: Pid, address: Word) -> Result<Breakpoint> {
        let original_code = tracer::read_memory(pid, address)?;
        let patched = (original_code & !0xff) | BREAKPOINT_OPCODE;
        tracer::write_memory(pid, address, patched)?;
        Ok(Breakpoint { pid, address, original_code })
    }

    /// Put the original code back and rewind the instruction pointer by one,
    /// so the tracee re-executes the restored instruction on its next resume.
    pub fn restore(self) -> Result<()> {
        tracer::write_memory(self.pid, self.address, self.original_code)?;
        let mut regs = tracer::get_registers(self.pid)?;
        regs.ip = regs.ip.wrapping_sub(1);
        tracer::set_registers(self.pid, &regs)
    }
}
