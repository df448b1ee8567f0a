//! A process-global `int3` to bounce remote returns off.
//!
//! [`crate::sandbox::call_sandboxed`] rewrites a forked child's return
//! address so the child, on returning from the called function, executes a
//! breakpoint the parent knows the address of. That breakpoint has to live at
//! a fixed spot in our own text segment, shared with the child by fork.
//!
//! The address is harvested once, lazily, by running `call 2f; int3; 2: pop`:
//! the `call` pushes the address of the `int3` as its return address and the
//! `pop` retrieves it, while execution skips over the `int3` itself. The
//! `int3` byte stays embedded in our mapping for the life of the process.

use crate::registers::Word;
use core::arch::asm;

lazy_static! {
    static ref TRAP_ADDRESS: Word = unsafe { capture_trap_address() };
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
unsafe fn capture_trap_address() -> Word {
    let trap: Word;
    asm!(
        "call 2f",
        "int3",
        "2:",
        "pop {trap}",
        trap = out(reg) trap,
    );
    trap
}

/// The address of a trap instruction in this process's own memory.
///
/// Initialized on first use and stable from then on.
pub fn trap_address() -> Word {
    *TRAP_ADDRESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_nonzero_and_stable() {
        let first = trap_address();
        assert_ne!(first, 0);
        assert_eq!(trap_address(), first);
    }

    #[test]
    fn address_points_at_a_breakpoint_instruction() {
        let byte = unsafe { *(trap_address() as *const u8) };
        assert_eq!(byte, 0xcc);
    }
}
