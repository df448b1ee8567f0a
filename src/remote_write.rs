//! Push a byte buffer into an open file descriptor of a running process.
//!
//! The shipped client of the injection engine: allocate a scratch page in the
//! tracee with a remote `mmap`, copy the buffer over, drain it through remote
//! `write` calls on the target descriptor, and remote `munmap` the page
//! again. The tracee must already be attached and stopped.

use crate::error::{Error, Result};
use crate::registers::Word;
use crate::syscall::inject_syscall;
use crate::tracer;
use nix::errno::Errno;
use nix::sys::mman::{MapFlags, ProtFlags};
use nix::unistd::Pid;
use std::os::unix::io::RawFd;

#[cfg(target_arch = "x86_64")]
const SYS_MMAP: Word = libc::SYS_mmap as Word;
// On x86 only mmap2 passes its arguments in registers; with a zero offset it
// behaves identically.
#[cfg(target_arch = "x86")]
const SYS_MMAP: Word = libc::SYS_mmap2 as Word;

/// Map `length` bytes of memory in the tracee, as `mmap(2)` would.
pub fn mmap(
    pid: Pid,
    address: Word,
    length: usize,
    protection: ProtFlags,
    flags: MapFlags,
    fd: RawFd,
    offset: usize,
) -> Result<Word> {
    let result = inject_syscall(
        pid,
        SYS_MMAP,
        [
            address,
            length,
            protection.bits() as Word,
            flags.bits() as Word,
            fd as Word,
            offset,
        ],
    )?;
    check_remote(pid, result)
}

/// Unmap a mapping previously created in the tracee.
pub fn munmap(pid: Pid, address: Word, length: usize) -> Result<()> {
    let result = inject_syscall(pid, libc::SYS_munmap as Word, [address, length, 0, 0, 0, 0])?;
    check_remote(pid, result).map(drop)
}

/// One remote `write(2)`. Returns the raw kernel result so the caller can
/// implement its own retry policy.
pub fn write(pid: Pid, fd: RawFd, address: Word, length: usize) -> Result<isize> {
    inject_syscall(pid, libc::SYS_write as Word, [fd as Word, address, length, 0, 0, 0])
}

/// Map a negative remote return to [`Error::RemoteSyscall`].
fn check_remote(pid: Pid, result: isize) -> Result<Word> {
    if result < 0 {
        Err(Error::RemoteSyscall { pid, errno: Errno::from_i32(-result as i32) })
    } else {
        Ok(result as Word)
    }
}

/// Write all of `data` to descriptor `fd` of the stopped tracee `pid`.
///
/// Short writes advance and continue; `EAGAIN`/`EWOULDBLOCK` retries; any
/// other remote failure is surfaced. The scratch mapping is released before
/// returning successfully.
pub fn write_to_fd(pid: Pid, fd: RawFd, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    log::info!("allocating {} bytes in process {}", data.len(), pid);
    let address = mmap(
        pid,
        0,
        data.len(),
        ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
        MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
        0,
        0,
    )?;

    log::info!("copying buffer into process {}", pid);
    tracer::memcpy_to(pid, address, data)?;

    let mut written = 0;
    while written < data.len() {
        let result = write(pid, fd, address + written, data.len() - written)?;
        if result >= 0 {
            log::info!("wrote {} bytes", result);
            written += result as usize;
        } else {
            let errno = Errno::from_i32(-result as i32);
            // EWOULDBLOCK aliases EAGAIN on Linux.
            if errno != Errno::EAGAIN {
                return Err(Error::RemoteSyscall { pid, errno });
            }
            log::debug!("remote write would block, retrying");
        }
    }

    log::info!("releasing the scratch mapping in process {}", pid);
    munmap(pid, address, data.len())
}
