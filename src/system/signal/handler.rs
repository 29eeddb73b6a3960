use std::io;

use crate::log::dev_warn;

use super::{consts::*, set::SignalAction, signal_name, SignalNumber};

/// A changed signal disposition. Dropping it puts back whatever was installed before.
pub(crate) struct SignalHandler {
    signal: SignalNumber,
    original_action: SignalAction,
}

impl SignalHandler {
    /// Install `behavior` for `signal`. `SIGKILL` and `SIGSTOP` cannot be caught nor ignored and
    /// are refused.
    pub(crate) fn register(
        signal: SignalNumber,
        behavior: SignalHandlerBehavior,
    ) -> io::Result<Self> {
        if matches!(signal, SIGKILL | SIGSTOP) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("the action for {} cannot be changed", signal_name(signal)),
            ));
        }

        let original_action = SignalAction::new(behavior)?.register(signal)?;

        Ok(Self {
            signal,
            original_action,
        })
    }

    /// Keep the new disposition for good.
    pub(crate) fn forget(self) {
        std::mem::forget(self)
    }
}

impl Drop for SignalHandler {
    fn drop(&mut self) {
        if let Err(err) = self.original_action.register(self.signal) {
            dev_warn!(
                "cannot restore the action for {}: {err}",
                signal_name(self.signal)
            );
        }
    }
}

pub(crate) enum SignalHandlerBehavior {
    /// The default action of the signal.
    Default,
    Ignore,
    /// Write the signal information into the [`super::SignalStream`].
    Stream,
}
