use std::{fmt, io};

use libc::{
    c_int, WEXITSTATUS, WIFCONTINUED, WIFEXITED, WIFSIGNALED, WIFSTOPPED, WNOHANG, WSTOPSIG,
    WTERMSIG, WUNTRACED,
};

use crate::cutils::cerr;
use crate::system::{
    interface::ProcessId,
    signal::{signal_name, SignalNumber},
};

mod sealed {
    pub(crate) trait Sealed {}

    impl Sealed for crate::system::interface::ProcessId {}
}

pub(crate) trait Wait: sealed::Sealed {
    /// Wait for a child to change state, see `waitpid(2)`.
    ///
    /// Blocks unless [`WaitOptions::no_hang`] is set. [`ProcessId::ANY_CHILD`] waits for any
    /// child of the calling process.
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError>;
}

impl Wait for ProcessId {
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
        let mut status: c_int = 0;

        let pid = cerr(unsafe { libc::waitpid(self.get(), &mut status, options.flags) })
            .map_err(WaitError::Io)?;

        if pid == 0 && options.flags & WNOHANG != 0 {
            return Err(WaitError::NotReady);
        }

        Ok((ProcessId::new(pid), WaitStatus { status }))
    }
}

#[derive(Debug)]
pub enum WaitError {
    /// Children exist but none of them changed state. Only with [`WaitOptions::no_hang`].
    NotReady,
    Io(io::Error),
}

impl WaitError {
    /// `ECHILD`: there is no child left to wait for.
    pub fn is_no_child(&self) -> bool {
        matches!(self, Self::Io(err) if err.raw_os_error() == Some(libc::ECHILD))
    }
}

#[derive(Clone, Copy)]
pub struct WaitOptions {
    flags: c_int,
}

impl WaitOptions {
    /// Block until a child terminates.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Do not block when no child changed state (`WNOHANG`).
    pub const fn no_hang(mut self) -> Self {
        self.flags |= WNOHANG;
        self
    }

    /// Also report children that were stopped (`WUNTRACED`).
    pub const fn untraced(mut self) -> Self {
        self.flags |= WUNTRACED;
        self
    }
}

/// What happened to a waited-for child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildChange {
    Exited(c_int),
    Killed(SignalNumber),
    Stopped(SignalNumber),
    Continued,
    Unknown,
}

/// A raw status as filled in by `waitpid`.
pub struct WaitStatus {
    status: c_int,
}

impl WaitStatus {
    pub fn change(&self) -> ChildChange {
        let status = self.status;
        if WIFEXITED(status) {
            ChildChange::Exited(WEXITSTATUS(status))
        } else if WIFSIGNALED(status) {
            ChildChange::Killed(WTERMSIG(status))
        } else if WIFSTOPPED(status) {
            ChildChange::Stopped(WSTOPSIG(status))
        } else if WIFCONTINUED(status) {
            ChildChange::Continued
        } else {
            ChildChange::Unknown
        }
    }

    #[cfg(test)]
    pub fn exit_status(&self) -> Option<c_int> {
        match self.change() {
            ChildChange::Exited(code) => Some(code),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn term_signal(&self) -> Option<SignalNumber> {
        match self.change() {
            ChildChange::Killed(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn stop_signal(&self) -> Option<SignalNumber> {
        match self.change() {
            ChildChange::Stopped(signal) => Some(signal),
            _ => None,
        }
    }

    /// The child is gone, either by exiting or by being killed.
    pub fn is_terminated(&self) -> bool {
        matches!(self.change(), ChildChange::Exited(_) | ChildChange::Killed(_))
    }

    #[cfg(test)]
    pub fn was_stopped(&self) -> bool {
        self.stop_signal().is_some()
    }
}

impl fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.change() {
            ChildChange::Exited(code) => write!(f, "exited with status {code}"),
            ChildChange::Killed(signal) => write!(f, "killed by {}", signal_name(signal)),
            ChildChange::Stopped(signal) => write!(f, "stopped by {}", signal_name(signal)),
            ChildChange::Continued => f.write_str("continued"),
            ChildChange::Unknown => write!(f, "unknown status {:#x}", self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::process::Command;

    use crate::system::{
        interface::ProcessId,
        kill,
        signal::consts::{SIGCONT, SIGKILL, SIGSTOP},
        testing::in_child_process,
    };

    use super::{ChildChange, Wait, WaitError, WaitOptions};

    fn spawn(script: &str) -> ProcessId {
        let child = Command::new("sh").args(["-c", script]).spawn().unwrap();
        ProcessId::new(child.id() as i32)
    }

    #[test]
    fn exit_code_is_decoded() {
        let pid = spawn("exit 3");

        let (reaped, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(reaped, pid);
        assert_eq!(status.change(), ChildChange::Exited(3));
        assert_eq!(status.exit_status(), Some(3));
        assert!(status.is_terminated());
        assert!(!status.was_stopped());
        assert_eq!(format!("{status:?}"), "exited with status 3");

        // Already reaped.
        assert!(pid.wait(WaitOptions::new()).unwrap_err().is_no_child());
    }

    #[test]
    fn stop_and_kill() {
        let pid = spawn("sleep 5");

        kill(pid, SIGSTOP).unwrap();
        let (_, status) = pid.wait(WaitOptions::new().untraced()).unwrap();
        assert_eq!(status.change(), ChildChange::Stopped(SIGSTOP));
        assert!(status.was_stopped());
        assert!(!status.is_terminated());
        assert_eq!(format!("{status:?}"), "stopped by SIGSTOP");

        kill(pid, SIGCONT).unwrap();
        kill(pid, SIGKILL).unwrap();
        let (_, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.term_signal(), Some(SIGKILL));
        assert_eq!(status.exit_status(), None);
        assert!(status.is_terminated());
    }

    #[test]
    fn no_hang_reports_not_ready() {
        let pid = spawn("sleep 0.2");

        let mut polls = 0;
        let status = loop {
            match pid.wait(WaitOptions::new().no_hang()) {
                Ok((_, status)) => break status,
                Err(WaitError::NotReady) => polls += 1,
                Err(WaitError::Io(err)) => panic!("{err}"),
            }
        };

        assert_eq!(status.exit_status(), Some(0));
        assert!(polls > 0);
    }

    #[test]
    fn any_child_without_children() {
        in_child_process(|| {
            let err = ProcessId::ANY_CHILD
                .wait(WaitOptions::new().no_hang().untraced())
                .unwrap_err();
            assert!(err.is_no_child());
        });
    }
}
