use std::{
    io,
    os::fd::{AsRawFd, RawFd},
};

use crate::cutils::cerr;
use interface::ProcessId;

use self::signal::SignalNumber;

// generalized traits for when we want to hide implementations
pub mod interface;

pub mod poll;

pub mod signal;

pub mod wait;

pub(crate) fn _exit(status: libc::c_int) -> ! {
    unsafe { libc::_exit(status) }
}

pub(crate) enum ForkResult {
    // Parent process branch with the child process' PID.
    Parent(ProcessId),
    // Child process branch.
    Child,
}

/// Create a new process.
///
/// The shell is single threaded, so the child may run any code until it calls `execve` or exits.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: `fork` has no preconditions; the returned pid tells us which side we are on.
    let pid = cerr(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(ProcessId::new(pid)))
    }
}

/// Send a signal to a process with the specified ID.
pub fn kill(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::kill(pid.get(), signal) }).map(|_| ())
}

/// Send a signal to a process group with the specified ID.
pub fn killpg(pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pgid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::killpg(pgid.get(), signal) }).map(|_| ())
}

/// Send a signal to the process group led by `pid`, falling back to the process itself when the
/// group does not exist (yet). Children of the shell lead their own group, so this reaches every
/// process the command started.
pub fn signal_job(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    killpg(pid, signal).or_else(|err| match err.raw_os_error() {
        Some(libc::ESRCH) => kill(pid, signal),
        _ => Err(err),
    })
}

/// Get the process group ID of the current process.
#[cfg(test)]
pub fn getpgrp() -> ProcessId {
    ProcessId::new(unsafe { libc::getpgrp() })
}

/// Get a process group ID.
#[cfg(test)]
pub fn getpgid(pid: ProcessId) -> io::Result<ProcessId> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID
    cerr(unsafe { libc::getpgid(pid.get()) }).map(ProcessId::new)
}

/// Set a process group ID. Passing `0` for either argument means the calling process.
pub fn setpgid(pid: ProcessId, pgid: ProcessId) -> io::Result<()> {
    cerr(unsafe { libc::setpgid(pid.get(), pgid.get()) }).map(|_| ())
}

/// Make `dst` refer to the same open file as `src`.
pub fn dup2<F: AsRawFd>(src: &F, dst: RawFd) -> io::Result<()> {
    cerr(unsafe { libc::dup2(src.as_raw_fd(), dst) }).map(|_| ())
}

/// An empty `sigaction`; its layout differs between platforms, so it cannot be built as a literal.
pub fn make_zeroed_sigaction() -> libc::sigaction {
    // SAFETY: sigaction is a plain C struct, all-zeroes is a valid representation.
    unsafe { std::mem::zeroed() }
}


#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        os::unix::net::UnixStream,
        process::exit,
    };

    use libc::{SIGKILL, SIGTERM};

    use super::{
        fork, getpgrp, interface::ProcessId, setpgid, signal_job, testing::in_child_process,
        wait::Wait, wait::WaitOptions, ForkResult,
    };

    #[test]
    fn pgid_test() {
        use super::getpgid;

        let pgrp = getpgrp();
        assert_eq!(getpgid(ProcessId::new(0)).unwrap(), pgrp);
        assert_eq!(
            getpgid(ProcessId::new(std::process::id() as i32)).unwrap(),
            pgrp
        );

        match super::fork().unwrap() {
            ForkResult::Child => {
                // wait for the parent.
                std::thread::sleep(std::time::Duration::from_secs(1));
                super::_exit(0);
            }
            ForkResult::Parent(child_pid) => {
                // The child should be in our process group.
                assert_eq!(
                    getpgid(child_pid).unwrap(),
                    getpgid(ProcessId::new(0)).unwrap()
                );
                // Move the child to its own process group
                setpgid(child_pid, child_pid).unwrap();
                // The process group of the child should have changed.
                assert_eq!(getpgid(child_pid).unwrap(), child_pid);
                child_pid.wait(WaitOptions::new()).unwrap();
            }
        }
    }

    #[test]
    fn kill_test() {
        let mut child = std::process::Command::new("/bin/sleep")
            .arg("1")
            .spawn()
            .unwrap();
        super::kill(ProcessId::new(child.id() as i32), SIGKILL).unwrap();
        assert!(!child.wait().unwrap().success());
    }

    #[test]
    fn killpg_test() {
        // Create a socket so the children write to it if they aren't terminated by `killpg`.
        let (mut rx, mut tx) = UnixStream::pair().unwrap();

        let ForkResult::Parent(pid1) = fork().unwrap() else {
            std::thread::sleep(std::time::Duration::from_secs(1));
            tx.write_all(&[42]).unwrap();
            exit(0);
        };

        let ForkResult::Parent(pid2) = fork().unwrap() else {
            std::thread::sleep(std::time::Duration::from_secs(1));
            tx.write_all(&[42]).unwrap();
            exit(0);
        };

        drop(tx);

        let pgid = pid1;
        // Move the children to their own process group.
        setpgid(pid1, pgid).unwrap();
        setpgid(pid2, pgid).unwrap();
        // Send `SIGKILL` to the children process group.
        super::killpg(pgid, SIGKILL).unwrap();
        // Ensure that the child were terminated before writing.
        assert_eq!(
            rx.read_exact(&mut [0; 2]).unwrap_err().kind(),
            std::io::ErrorKind::UnexpectedEof
        );
        pid1.wait(WaitOptions::new()).unwrap();
        pid2.wait(WaitOptions::new()).unwrap();
    }

    #[test]
    fn signal_job_falls_back_to_the_process() {
        // `sleep` stays in our process group, so there is no group led by its pid.
        let child = std::process::Command::new("/bin/sleep")
            .arg("5")
            .spawn()
            .unwrap();
        let pid = ProcessId::new(child.id() as i32);

        signal_job(pid, SIGTERM).unwrap();

        let (_, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.term_signal(), Some(SIGTERM));
    }

    #[test]
    fn child_process_helper_reports_panics() {
        in_child_process(|| assert_eq!(1 + 1, 2));

        let outcome = std::panic::catch_unwind(|| in_child_process(|| panic!("boom")));
        assert!(outcome.is_err());
    }
}
