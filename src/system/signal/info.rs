use std::fmt;

use crate::system::interface::ProcessId;

use super::{signal_name, SignalNumber};

/// A `siginfo_t` as copied out of the raw handler.
#[repr(transparent)]
pub(crate) struct SignalInfo {
    info: libc::siginfo_t,
}

impl SignalInfo {
    pub(super) const SIZE: usize = std::mem::size_of::<Self>();

    pub(crate) fn signal(&self) -> SignalNumber {
        self.info.si_signo
    }

    /// Sent with `kill(2)` and friends rather than raised by the kernel or the terminal driver.
    pub(crate) fn is_user_signaled(&self) -> bool {
        // SI_USER and SI_QUEUE, among others, are not positive.
        self.info.si_code <= 0
    }

    /// The sender, when the kernel recorded one.
    pub(crate) fn pid(&self) -> ProcessId {
        // SAFETY: `si_pid` is set for every signal the shell streams: user signals and SIGCHLD.
        ProcessId::new(unsafe { self.info.si_pid() })
    }
}

impl fmt::Debug for SignalInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", signal_name(self.signal()), self.pid())?;
        if self.is_user_signaled() {
            f.write_str(" (user)")?;
        }
        Ok(())
    }
}
