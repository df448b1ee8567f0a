//! Process-level tests: every test forks a real tracee and drives it through
//! the ptrace engine.

use marionette::error::Error;
use marionette::registers::Word;
use marionette::signal::{self, Signal};
use marionette::{call_sandboxed, inject_syscall, remote_write, tracer, wait};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid};
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::process::{Command, Stdio};

/// Fork a child that parks itself in `pause()` forever.
///
/// The child invites tracing from anyone so the demo binary, a separate
/// process, can attach to it even under a restrictive Yama policy, and
/// reports over a pipe that it is set up before the parent proceeds.
fn spawn_paused_tracee() -> Pid {
    let (ready_read, ready_write) = nix::unistd::pipe().expect("failed to create pipe");
    match unsafe { tracer::fork() }.expect("failed to fork tracee") {
        ForkResult::Child => unsafe {
            libc::prctl(libc::PR_SET_PTRACER, libc::PR_SET_PTRACER_ANY, 0, 0, 0);
            libc::write(ready_write, b"x".as_ptr() as *const libc::c_void, 1);
            libc::close(ready_write);
            libc::close(ready_read);
            loop {
                libc::pause();
            }
        },
        ForkResult::Parent { child } => {
            let mut byte = [0u8; 1];
            nix::unistd::read(ready_read, &mut byte).expect("tracee did not report readiness");
            let _ = nix::unistd::close(ready_read);
            let _ = nix::unistd::close(ready_write);
            child
        }
    }
}

/// Fork a child that spins in user space without entering the kernel, so a
/// single step cannot disappear into a blocking system call.
fn spawn_spinning_tracee() -> Pid {
    match unsafe { tracer::fork() }.expect("failed to fork tracee") {
        ForkResult::Child => loop {
            std::hint::spin_loop();
        },
        ForkResult::Parent { child } => child,
    }
}

fn attach_and_stop(pid: Pid) {
    tracer::attach(pid).expect("failed to attach");
    signal::kill(pid, Signal::SIGSTOP).expect("failed to stop tracee");
    wait::wait_for_trap(pid).expect("tracee did not stop");
}

fn kill_and_reap(pid: Pid) {
    let _ = signal::kill(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}

#[test]
fn injected_getpid_returns_the_tracee_pid_and_leaves_no_trace() {
    let pid = spawn_paused_tracee();
    attach_and_stop(pid);

    let regs_before = tracer::get_registers(pid).unwrap();
    let code_before = tracer::read_memory(pid, regs_before.ip).unwrap();

    let result = inject_syscall(pid, libc::SYS_getpid as Word, [0; 6]).unwrap();
    assert_eq!(result, pid.as_raw() as isize);

    // The tracee must not be able to tell anything happened: registers and
    // the code at the old instruction pointer are bit-identical.
    assert_eq!(tracer::get_registers(pid).unwrap(), regs_before);
    assert_eq!(tracer::read_memory(pid, regs_before.ip).unwrap(), code_before);

    kill_and_reap(pid);
}

static mut SCRATCH: [u8; 32] = [0xaa; 32];

#[test]
fn memcpy_round_trips_partial_words_and_preserves_neighbours() {
    let pid = spawn_paused_tracee();
    attach_and_stop(pid);

    // The child shares our image, so our static's address is valid there.
    let address = unsafe { std::ptr::addr_of!(SCRATCH) } as Word;

    let mut before = [0u8; 16];
    tracer::memcpy_from(pid, &mut before, address).unwrap();

    let buffer: Vec<u8> = (0u8..13).collect();
    tracer::memcpy_to(pid, address, &buffer).unwrap();

    let mut after = [0u8; 16];
    tracer::memcpy_from(pid, &mut after, address).unwrap();
    assert_eq!(&after[..13], &buffer[..]);
    assert_eq!(&after[13..], &before[13..]);

    // Zero-length copies never touch the tracee at all.
    tracer::memcpy_to(pid, 0, &[]).unwrap();
    tracer::memcpy_from(pid, &mut [], 0).unwrap();

    kill_and_reap(pid);
}

extern "C" fn square(x: Word) -> Word {
    x.wrapping_mul(x)
}

#[test]
fn sandboxed_call_observes_entry_and_return() {
    let outcome = call_sandboxed(square, 7).expect("sandboxed call failed");

    // Entry was observed on the first byte of the function, with the
    // breakpoint already gone.
    assert_eq!(outcome.entry_registers.ip, square as Word);
    let entry_code = tracer::read_memory(outcome.pid, square as Word).unwrap();
    assert_ne!(entry_code & 0xff, 0xcc);

    #[cfg(target_arch = "x86_64")]
    assert_eq!(outcome.entry_registers.di, 7);

    // The return value rides back in the accumulator.
    assert_eq!(outcome.result(), 49);

    kill_and_reap(outcome.pid);
}

#[test]
fn interrupt_stops_a_running_tracee_and_step_advances_it() {
    let pid = spawn_spinning_tracee();
    tracer::attach(pid).unwrap();

    // Seizing leaves the tracee running; interrupt forces the stop.
    tracer::interrupt(pid).unwrap();
    wait::wait_for_trap(pid).unwrap();

    let before = tracer::get_registers(pid).unwrap();
    tracer::step(pid).unwrap();
    wait::wait_for_trap(pid).unwrap();
    let after = tracer::get_registers(pid).unwrap();

    // The spin loop is several instructions long, so one step always moves
    // the instruction pointer somewhere else inside it.
    assert_ne!(after.ip, before.ip);

    kill_and_reap(pid);
}

#[test]
fn remote_write_reaches_the_other_end_of_a_pipe() {
    let (read_end, write_end) = nix::unistd::pipe().unwrap();
    let pid = spawn_paused_tracee();
    attach_and_stop(pid);

    remote_write::write_to_fd(pid, write_end, b"hello").unwrap();

    let mut buffer = [0u8; 5];
    let mut total = 0;
    while total < buffer.len() {
        total += nix::unistd::read(read_end, &mut buffer[total..]).unwrap();
    }
    assert_eq!(&buffer, b"hello");

    tracer::detach(pid).unwrap();
    kill_and_reap(pid);
    let _ = nix::unistd::close(read_end);
    let _ = nix::unistd::close(write_end);
}

#[test]
fn wait_reports_a_clean_exit() {
    match unsafe { tracer::fork() }.unwrap() {
        ForkResult::Child => unsafe { libc::_exit(7) },
        ForkResult::Parent { child } => match wait::wait_for_trap(child) {
            Err(Error::Terminated { pid, clean, status }) => {
                assert_eq!(pid, child);
                assert!(clean);
                assert_eq!(status, 7);
            }
            other => panic!("expected a termination error, got {:?}", other),
        },
    }
}

#[test]
fn wait_reports_a_kill_during_the_wait() {
    let pid = spawn_paused_tracee();
    tracer::attach(pid).unwrap();

    signal::kill(pid, Signal::SIGKILL).unwrap();
    match wait::wait_for_trap(pid) {
        Err(Error::Terminated { clean, status, .. }) => {
            assert!(!clean);
            assert_eq!(status, libc::SIGKILL);
        }
        other => panic!("expected a termination error, got {:?}", other),
    }
}

#[test]
fn wait_rejects_a_signal_it_did_not_expect() {
    let pid = spawn_paused_tracee();
    tracer::attach(pid).unwrap();

    signal::kill(pid, Signal::SIGWINCH).unwrap();
    match wait::wait_for_trap(pid) {
        Err(Error::UnexpectedSignal { signal, .. }) => assert_eq!(signal, libc::SIGWINCH),
        other => panic!("expected an unexpected-signal error, got {:?}", other),
    }

    kill_and_reap(pid);
}

#[test]
fn inject_binary_writes_stdin_to_the_target_descriptor() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let out = std::fs::OpenOptions::new().write(true).open(file.path()).unwrap();
    let fd = out.as_raw_fd();

    // The tracee inherits `out` at the same descriptor number.
    let pid = spawn_paused_tracee();

    let mut demo = Command::new(env!("CARGO_BIN_EXE_inject"))
        .arg(pid.to_string())
        .arg(fd.to_string())
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();
    demo.stdin.take().unwrap().write_all(b"ABC\n").unwrap();
    let status = demo.wait().unwrap();
    assert!(status.success(), "inject exited with {:?}", status);

    assert_eq!(std::fs::read(file.path()).unwrap(), b"ABC\n");

    kill_and_reap(pid);
}
