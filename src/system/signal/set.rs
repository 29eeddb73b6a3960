use crate::{cutils::cerr, system::make_zeroed_sigaction};

use super::{handler::SignalHandlerBehavior, SignalNumber};

use std::{io, mem::MaybeUninit};

#[repr(transparent)]
pub(super) struct SignalAction {
    raw: libc::sigaction,
}

impl SignalAction {
    pub(super) fn new(behavior: SignalHandlerBehavior) -> io::Result<Self> {
        // Restart interrupted system calls where the kernel allows it. `poll` is never restarted,
        // which is what wakes up the event loops when a signal arrives.
        let mut sa_flags = libc::SA_RESTART;

        // Nothing may interrupt `send_siginfo`.
        let (sa_sigaction, sa_mask) = match behavior {
            SignalHandlerBehavior::Default => (libc::SIG_DFL, SignalSet::empty()?),
            SignalHandlerBehavior::Ignore => (libc::SIG_IGN, SignalSet::empty()?),
            SignalHandlerBehavior::Stream => {
                sa_flags |= libc::SA_SIGINFO;
                (
                    super::stream::send_siginfo as *const () as libc::sighandler_t,
                    SignalSet::full()?,
                )
            }
        };

        let mut raw: libc::sigaction = make_zeroed_sigaction();
        raw.sa_sigaction = sa_sigaction;
        raw.sa_mask = sa_mask.raw;
        raw.sa_flags = sa_flags;

        Ok(Self { raw })
    }

    pub(super) fn register(&self, signal: SignalNumber) -> io::Result<Self> {
        let mut original_action = MaybeUninit::<Self>::zeroed();

        cerr(unsafe { libc::sigaction(signal, &self.raw, original_action.as_mut_ptr().cast()) })?;

        Ok(unsafe { original_action.assume_init() })
    }
}

/// A set of signals, mostly used to change the signal mask of the calling thread.
#[repr(transparent)]
pub(crate) struct SignalSet {
    raw: libc::sigset_t,
}

impl SignalSet {
    fn init_with(init: unsafe extern "C" fn(*mut libc::sigset_t) -> libc::c_int) -> io::Result<Self> {
        let mut raw = MaybeUninit::<libc::sigset_t>::zeroed();
        cerr(unsafe { init(raw.as_mut_ptr()) })?;
        // SAFETY: zeroed and then initialized by `sigemptyset`/`sigfillset`.
        Ok(Self {
            raw: unsafe { raw.assume_init() },
        })
    }

    pub(crate) fn empty() -> io::Result<Self> {
        Self::init_with(libc::sigemptyset)
    }

    /// Every signal there is.
    pub(crate) fn full() -> io::Result<Self> {
        Self::init_with(libc::sigfillset)
    }

    fn change_mask(&self, how: libc::c_int) -> io::Result<Self> {
        let mut previous = MaybeUninit::<libc::sigset_t>::zeroed();
        cerr(unsafe { libc::sigprocmask(how, &self.raw, previous.as_mut_ptr()) })?;
        Ok(Self {
            raw: unsafe { previous.assume_init() },
        })
    }

    /// Add this set to the blocked signals. Returns the mask as it was before.
    pub(crate) fn block(&self) -> io::Result<Self> {
        self.change_mask(libc::SIG_BLOCK)
    }

    /// Make this set the signal mask. Returns the mask as it was before.
    pub(crate) fn set_mask(&self) -> io::Result<Self> {
        self.change_mask(libc::SIG_SETMASK)
    }
}
