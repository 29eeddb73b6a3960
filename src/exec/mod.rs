//! Starting commands and keeping the job table in sync with what the kernel reports about them.
#![deny(unsafe_code)]

mod event;
mod foreground;
mod io_util;
mod launch;
mod relay;

pub(crate) use event::{EventRegistry, Process, StopReason};
pub(crate) use foreground::wait_foreground;
pub(crate) use io_util::retry_while_interrupted;
pub(crate) use launch::launch;
pub(crate) use relay::SignalRelay;

use crate::system::signal::{consts::*, SignalNumber};

/// Signals routed into the signal stream while the shell runs.
const RELAYED_SIGNALS: [SignalNumber; 3] = [SIGINT, SIGTSTP, SIGCHLD];

/// Every signal whose disposition the shell changes. Children get the default action back.
const SHELL_SIGNALS: [SignalNumber; 4] = [SIGINT, SIGTSTP, SIGCHLD, SIGQUIT];

/// What became of the foreground process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ForegroundOutcome {
    /// It is gone: exited, killed or already reaped.
    Exited,
    /// It was stopped and stays in the table.
    Stopped,
}
