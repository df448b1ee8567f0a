//! Remote control of running Linux processes on x86 and x86-64.
//!
//! The building blocks, bottom up:
//!
//! - [`tracer`]: thin wrappers around the ptrace requests the engine needs,
//!   plus bulk memory copies in and out of a stopped tracee.
//! - [`wait`]: blocking waits that classify a tracee's next ptrace-stop.
//! - [`breakpoint`]: plant and restore a one-byte software breakpoint.
//! - [`trap`]: the address of an `int3` embedded in our own text segment,
//!   used as a return target for [`sandbox::call_sandboxed`].
//! - [`syscall`]: make a stopped tracee execute an arbitrary system call and
//!   put everything back the way it was.
//! - [`sandbox`]: run a local function inside a forked child under ptrace,
//!   observing its entry and return register state.
//! - [`remote_write`]: the shipped client; pushes a byte buffer into one of a
//!   tracee's open file descriptors via remote `mmap`/`write`/`munmap`.
//!
//! All operations assume the caller holds exclusive tracing rights on the
//! target and, unless documented otherwise, that the target is stopped.

#[macro_use]
extern crate lazy_static;

#[cfg(not(target_os = "linux"))]
compile_error!("this crate drives the Linux ptrace interface and only builds for Linux");

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
compile_error!("unknown or unsupported architecture; only x86 and x86_64 are supported");

pub mod breakpoint;
pub mod error;
pub mod registers;
pub mod remote_write;
pub mod sandbox;
pub mod signal;
pub mod syscall;
pub mod tracer;
pub mod trap;
pub mod wait;

pub use breakpoint::Breakpoint;
pub use error::{Error, Result};
pub use registers::{Registers, Word};
pub use sandbox::{call_sandboxed, CallOutcome};
pub use syscall::inject_syscall;
