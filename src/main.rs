//! `inject <pid> <fd>`: write everything on standard input to an open file
//! descriptor of a running process, by executing `mmap`, `write` and
//! `munmap` inside that process.

use log::info;
use marionette::error::Result;
use marionette::signal::{self, Signal};
use marionette::{remote_write, tracer, wait};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::io::RawFd;
use std::process;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "inject",
    about = "Write data from stdin to an open file descriptor of a running process."
)]
struct Options {
    /// Pid of the target process.
    pid: libc::pid_t,

    /// File descriptor in the target process to write to.
    fd: RawFd,
}

fn run(pid: Pid, fd: RawFd, data: &[u8]) -> Result<()> {
    info!("attaching to process {}", pid);
    tracer::attach(pid)?;

    info!("stopping process {}", pid);
    signal::kill(pid, Signal::SIGSTOP)?;
    wait::wait_for_trap(pid)?;

    remote_write::write_to_fd(pid, fd, data)?;

    info!("detaching from process {}", pid);
    tracer::detach(pid)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = Options::from_args();

    let mut data = Vec::new();
    if let Err(error) = std::io::stdin().read_to_end(&mut data) {
        eprintln!("Error: failed to read standard input: {}", error);
        process::exit(1);
    }

    info!("writing {} bytes to descriptor {} of process {}", data.len(), options.fd, options.pid);
    if let Err(error) = run(Pid::from_raw(options.pid), options.fd, &data) {
        eprintln!("Error: {}", error);
        process::exit(error.exit_code());
    }
}
