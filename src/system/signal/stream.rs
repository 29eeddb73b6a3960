use std::{
    io,
    mem::MaybeUninit,
    os::{
        fd::{AsRawFd, RawFd},
        unix::net::UnixStream,
    },
    sync::OnceLock,
};

use crate::{cutils::cerr, log::dev_error};

use super::{
    handler::{SignalHandler, SignalHandlerBehavior},
    info::SignalInfo,
    signal_name, SignalNumber,
};

static STREAM: OnceLock<SignalStream> = OnceLock::new();

/// Signal context: copy the `siginfo_t` into the socket without blocking. A notification that
/// does not fit in the socket buffer is lost.
pub(super) unsafe extern "C" fn send_siginfo(
    _signal: SignalNumber,
    info: *const SignalInfo,
    _context: *const libc::c_void,
) {
    let Some(stream) = STREAM.get() else {
        return;
    };
    // SAFETY: `send` is async-signal-safe and `info` points to a full `siginfo_t`.
    unsafe {
        libc::send(
            stream.sender.as_raw_fd(),
            info.cast(),
            SignalInfo::SIZE,
            libc::MSG_DONTWAIT,
        )
    };
}

/// The receiving end of every handler installed with [`SignalHandlerBehavior::Stream`].
///
/// There is one per process, shared by every caller of [`SignalStream::init`].
pub(crate) struct SignalStream {
    receiver: UnixStream,
    sender: UnixStream,
}

impl SignalStream {
    /// Get the process wide stream, creating it on the first call.
    pub(crate) fn init() -> io::Result<&'static Self> {
        if let Some(stream) = STREAM.get() {
            return Ok(stream);
        }

        let (receiver, sender) = UnixStream::pair().map_err(|err| {
            dev_error!("cannot create the signal socket pair: {err}");
            err
        })?;
        // Whoever set it first wins, the loser's pair is closed on drop.
        let _ = STREAM.set(Self { receiver, sender });

        STREAM
            .get()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "signal stream is unavailable"))
    }

    /// Take the oldest pending notification.
    ///
    /// Returns [`io::ErrorKind::WouldBlock`] when nothing is pending, which happens when another
    /// loop consumed the notification between a poll and this call.
    pub(crate) fn recv(&self) -> io::Result<SignalInfo> {
        let mut info = MaybeUninit::<SignalInfo>::uninit();
        let received = cerr(unsafe {
            libc::recv(
                self.receiver.as_raw_fd(),
                info.as_mut_ptr().cast(),
                SignalInfo::SIZE,
                libc::MSG_DONTWAIT,
            )
        })?;

        if received as usize != SignalInfo::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read of {received} bytes from the signal stream"),
            ));
        }

        // SAFETY: `recv` filled the whole value and `siginfo_t` is plain data.
        Ok(unsafe { info.assume_init() })
    }
}

impl AsRawFd for SignalStream {
    fn as_raw_fd(&self) -> RawFd {
        self.receiver.as_raw_fd()
    }
}

/// Route every signal in `signals` into the [`SignalStream`].
///
/// Handlers installed before a failure are dropped again, restoring their previous actions.
pub(crate) fn register_handlers<const N: usize>(
    signals: [SignalNumber; N],
) -> io::Result<[SignalHandler; N]> {
    let mut handlers = Vec::with_capacity(N);
    for signal in signals {
        let handler = SignalHandler::register(signal, SignalHandlerBehavior::Stream)
            .map_err(|err| {
                dev_error!("cannot route {} into the stream: {err}", signal_name(signal));
                err
            })?;
        handlers.push(handler);
    }

    match handlers.try_into() {
        Ok(handlers) => Ok(handlers),
        Err(_) => Err(io::Error::new(
            io::ErrorKind::Other,
            "signal handler count mismatch",
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::system::{
        interface::ProcessId,
        kill,
        signal::consts::{SIGUSR1, SIGUSR2},
        testing::in_child_process,
    };

    use super::{register_handlers, SignalStream};

    #[test]
    fn signals_arrive_in_order() {
        in_child_process(|| {
            let stream = SignalStream::init().unwrap();
            let _handlers = register_handlers([SIGUSR1, SIGUSR2]).unwrap();
            let me = ProcessId::new(std::process::id() as i32);

            kill(me, SIGUSR1).unwrap();
            kill(me, SIGUSR2).unwrap();

            let first = stream.recv().unwrap();
            assert_eq!(first.signal(), SIGUSR1);
            assert!(first.is_user_signaled());
            assert_eq!(first.pid(), me);
            assert_eq!(stream.recv().unwrap().signal(), SIGUSR2);

            let err = stream.recv().err().unwrap();
            assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
        });
    }

    #[test]
    fn init_is_idempotent() {
        in_child_process(|| {
            let first = SignalStream::init().unwrap();
            let second = SignalStream::init().unwrap();
            assert!(std::ptr::eq(first, second));
        });
    }
}
