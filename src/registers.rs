//! An architecture-neutral view of a tracee's general-purpose registers.
//!
//! The kernel hands us registers in the per-architecture layout of
//! `libc::user_regs_struct`; the rest of the engine wants one record with one
//! set of names. The conversion in each direction is a plain field-by-field
//! copy selected at build time.

use libc::user_regs_struct;

/// A machine word of the target architecture.
pub type Word = usize;

/// The general-purpose register file of a stopped tracee.
///
/// A plain value: copy it, compare it field by field, poke at the fields
/// directly. The names follow the architecture-neutral convention of the x86
/// family (`ax` is `rax` on x86-64 and `eax` on x86).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Registers {
    pub ax: Word,
    pub bx: Word,
    pub cx: Word,
    pub dx: Word,
    pub si: Word,
    pub di: Word,

    pub sp: Word,
    pub bp: Word,
    pub ip: Word,

    /// The syscall number on entry to a system call, preserved by the kernel
    /// while `ax` is overwritten with the return value.
    pub orig_ax: Word,
    pub eflags: Word,

    pub ds: Word,
    pub es: Word,
    pub fs: Word,
    pub gs: Word,
    pub cs: Word,
    pub ss: Word,

    #[cfg(target_arch = "x86_64")]
    pub r8: Word,
    #[cfg(target_arch = "x86_64")]
    pub r9: Word,
    #[cfg(target_arch = "x86_64")]
    pub r10: Word,
    #[cfg(target_arch = "x86_64")]
    pub r11: Word,
    #[cfg(target_arch = "x86_64")]
    pub r12: Word,
    #[cfg(target_arch = "x86_64")]
    pub r13: Word,
    #[cfg(target_arch = "x86_64")]
    pub r14: Word,
    #[cfg(target_arch = "x86_64")]
    pub r15: Word,

    #[cfg(target_arch = "x86_64")]
    pub fs_base: Word,
    #[cfg(target_arch = "x86_64")]
    pub gs_base: Word,
}

#[cfg(target_arch = "x86_64")]
impl From<user_regs_struct> for Registers {
    fn from(regs: user_regs_struct) -> Registers {
        Registers {
            ax: regs.rax as Word,
            bx: regs.rbx as Word,
            cx: regs.rcx as Word,
            dx: regs.rdx as Word,
            si: regs.rsi as Word,
            di: regs.rdi as Word,

            sp: regs.rsp as Word,
            bp: regs.rbp as Word,
            ip: regs.rip as Word,

            orig_ax: regs.orig_rax as Word,
            eflags: regs.eflags as Word,

            ds: regs.ds as Word,
            es: regs.es as Word,
            fs: regs.fs as Word,
            gs: regs.gs as Word,
            cs: regs.cs as Word,
            ss: regs.ss as Word,

            r8: regs.r8 as Word,
            r9: regs.r9 as Word,
            r10: regs.r10 as Word,
            r11: regs.r11 as Word,
            r12: regs.r12 as Word,
            r13: regs.r13 as Word,
            r14: regs.r14 as Word,
            r15: regs.r15 as Word,

            fs_base: regs.fs_base as Word,
            gs_base: regs.gs_base as Word,
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl From<Registers> for user_regs_struct {
    fn from(regs: Registers) -> user_regs_struct {
        user_regs_struct {
            rax: regs.ax as u64,
            rbx: regs.bx as u64,
            rcx: regs.cx as u64,
            rdx: regs.dx as u64,
            rsi: regs.si as u64,
            rdi: regs.di as u64,

            rsp: regs.sp as u64,
            rbp: regs.bp as u64,
            rip: regs.ip as u64,

            orig_rax: regs.orig_ax as u64,
            eflags: regs.eflags as u64,

            ds: regs.ds as u64,
            es: regs.es as u64,
            fs: regs.fs as u64,
            gs: regs.gs as u64,
            cs: regs.cs as u64,
            ss: regs.ss as u64,

            r8: regs.r8 as u64,
            r9: regs.r9 as u64,
            r10: regs.r10 as u64,
            r11: regs.r11 as u64,
            r12: regs.r12 as u64,
            r13: regs.r13 as u64,
            r14: regs.r14 as u64,
            r15: regs.r15 as u64,

            fs_base: regs.fs_base as u64,
            gs_base: regs.gs_base as u64,
        }
    }
}

#[cfg(target_arch = "x86")]
impl From<user_regs_struct> for Registers {
    fn from(regs: user_regs_struct) -> Registers {
        Registers {
            ax: regs.eax as Word,
            bx: regs.ebx as Word,
            cx: regs.ecx as Word,
            dx: regs.edx as Word,
            si: regs.esi as Word,
            di: regs.edi as Word,

            sp: regs.esp as Word,
            bp: regs.ebp as Word,
            ip: regs.eip as Word,

            orig_ax: regs.orig_eax as Word,
            eflags: regs.eflags as Word,

            ds: regs.xds as Word,
            es: regs.xes as Word,
            fs: regs.xfs as Word,
            gs: regs.xgs as Word,
            cs: regs.xcs as Word,
            ss: regs.xss as Word,
        }
    }
}

#[cfg(target_arch = "x86")]
impl From<Registers> for user_regs_struct {
    fn from(regs: Registers) -> user_regs_struct {
        user_regs_struct {
            eax: regs.ax as i32,
            ebx: regs.bx as i32,
            ecx: regs.cx as i32,
            edx: regs.dx as i32,
            esi: regs.si as i32,
            edi: regs.di as i32,

            esp: regs.sp as i32,
            ebp: regs.bp as i32,
            eip: regs.ip as i32,

            orig_eax: regs.orig_ax as i32,
            eflags: regs.eflags as i32,

            xds: regs.ds as i32,
            xes: regs.es as i32,
            xfs: regs.fs as i32,
            xgs: regs.gs as i32,
            xcs: regs.cs as i32,
            xss: regs.ss as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registers {
        let mut regs = Registers::default();
        regs.ax = 0x1111;
        regs.bx = 0x2222;
        regs.cx = 0x3333;
        regs.dx = 0x4444;
        regs.si = 0x5555;
        regs.di = 0x6666;
        regs.sp = 0x7fff_0000;
        regs.bp = 0x7fff_0100;
        regs.ip = 0x40_0000;
        regs.orig_ax = 39;
        regs.eflags = 0x246;
        regs.cs = 0x33;
        regs.ss = 0x2b;
        #[cfg(target_arch = "x86_64")]
        {
            regs.r8 = 8;
            regs.r9 = 9;
            regs.r10 = 10;
            regs.r15 = 15;
            regs.fs_base = 0x7f00_0000_0000;
        }
        regs
    }

    #[test]
    fn kernel_layout_round_trip_preserves_every_field() {
        let regs = sample();
        let converted = Registers::from(user_regs_struct::from(regs));
        assert_eq!(converted, regs);
    }

    #[test]
    fn instruction_pointer_lands_in_the_kernel_slot() {
        let kernel = user_regs_struct::from(sample());
        #[cfg(target_arch = "x86_64")]
        assert_eq!(kernel.rip, 0x40_0000);
        #[cfg(target_arch = "x86")]
        assert_eq!(kernel.eip, 0x40_0000);
    }

    #[test]
    fn copies_compare_by_field() {
        let regs = sample();
        let mut other = regs;
        assert_eq!(regs, other);
        other.ip += 1;
        assert_ne!(regs, other);
    }
}
