use std::io;

use crate::{
    common::Error,
    jobs::JobControl,
    log::{dev_debug, dev_error, dev_info, dev_warn},
    system::{
        interface::ProcessId,
        signal::{
            consts::*, register_handlers, signal_name, SignalHandler, SignalHandlerBehavior,
            SignalInfo, SignalStream,
        },
        signal_job,
        wait::{Wait, WaitError, WaitOptions},
    },
};

use super::{io_util::was_interrupted, ForegroundOutcome, RELAYED_SIGNALS};

/// The shell's signal dispositions, active for as long as this value lives.
///
/// `SIGINT`, `SIGTSTP` and `SIGCHLD` are written into the [`SignalStream`] and acted upon by
/// [`SignalRelay::on_signal`]; `SIGQUIT` is ignored.
pub(crate) struct SignalRelay {
    stream: &'static SignalStream,
    _handlers: [SignalHandler; RELAYED_SIGNALS.len()],
    _quit: SignalHandler,
}

impl SignalRelay {
    pub(crate) fn install() -> io::Result<Self> {
        let stream = SignalStream::init()?;
        let handlers = register_handlers(RELAYED_SIGNALS)?;
        let quit = SignalHandler::register(SIGQUIT, SignalHandlerBehavior::Ignore)?;

        Ok(Self {
            stream,
            _handlers: handlers,
            _quit: quit,
        })
    }

    /// The descriptor to poll for pending notifications.
    pub(crate) fn stream(&self) -> &'static SignalStream {
        self.stream
    }

    /// Consume one notification from the stream and apply it to `jobs`.
    ///
    /// Only call this once the stream is readable.
    pub(crate) fn on_signal(&self, jobs: &mut JobControl) -> Result<Option<ForegroundOutcome>, Error> {
        let info = match self.stream.recv() {
            Ok(info) => info,
            Err(err) if was_interrupted(&err) => return Ok(None),
            Err(err) => {
                dev_error!("could not receive signal: {err}");
                return Ok(None);
            }
        };

        dispatch(jobs, &info)
    }
}

fn dispatch(jobs: &mut JobControl, info: &SignalInfo) -> Result<Option<ForegroundOutcome>, Error> {
    let signal = info.signal();
    dev_debug!("received {info:?}");

    match signal {
        SIGINT => {
            interrupt(jobs);
            Ok(None)
        }
        SIGTSTP => Ok(suspend(jobs)),
        SIGCHLD => reap_children(jobs),
        _ => {
            dev_warn!("{} was not expected in the signal stream", signal_name(signal));
            Ok(None)
        }
    }
}

/// Forward an interrupt to the foreground job and stop tracking it.
///
/// The foreground pointer stays put: whoever waits for the job keeps waiting until the kernel
/// reports that it is actually gone. A job that ignores the interrupt and is stopped later is
/// tracked again.
pub(crate) fn interrupt(jobs: &mut JobControl) {
    let Some(pid) = jobs.foreground() else {
        return;
    };

    if let Err(err) = signal_job(pid, SIGINT) {
        dev_warn!("cannot interrupt {pid}: {err}");
    }
    jobs.release_interrupted(pid);
}

/// Forward a suspend request to the foreground job, mark it stopped and give the foreground back
/// to the shell.
pub(crate) fn suspend(jobs: &mut JobControl) -> Option<ForegroundOutcome> {
    let pid = jobs.foreground()?;

    if let Err(err) = signal_job(pid, SIGTSTP) {
        dev_warn!("cannot suspend {pid}: {err}");
    }
    jobs.mark_stopped(pid);
    jobs.clear_foreground();

    Some(ForegroundOutcome::Stopped)
}

/// Collect every child that changed state without blocking.
///
/// Exited and killed children are released, stopped ones are marked as such. Returns what
/// happened to the foreground process if it was among them.
pub(crate) fn reap_children(jobs: &mut JobControl) -> Result<Option<ForegroundOutcome>, Error> {
    let mut outcome = None;

    loop {
        let (pid, status) = match ProcessId::ANY_CHILD.wait(WaitOptions::new().no_hang().untraced())
        {
            Ok(reaped) => reaped,
            Err(WaitError::NotReady) => break,
            Err(err) if err.is_no_child() => {
                // Nothing left to wait for, so a foreground process cannot be running anymore.
                if jobs.foreground().is_some() {
                    outcome = Some(ForegroundOutcome::Exited);
                }
                break;
            }
            Err(WaitError::Io(err)) if was_interrupted(&err) => continue,
            Err(WaitError::Io(err)) => return Err(Error::Wait(err)),
        };

        let is_foreground = jobs.foreground() == Some(pid);

        if status.is_terminated() {
            dev_info!("{pid} finished: {status:?}");
            jobs.reaped(pid);
            if is_foreground {
                outcome = Some(ForegroundOutcome::Exited);
            }
        } else if let Some(signal) = status.stop_signal() {
            if matches!(signal, SIGTTIN | SIGTTOU) {
                dev_info!("{pid} stopped for touching the terminal: {status:?}");
            } else {
                dev_info!("{pid} stopped: {status:?}");
            }
            jobs.mark_stopped(pid);
            if is_foreground {
                jobs.clear_foreground();
                outcome = Some(ForegroundOutcome::Stopped);
            }
        }
    }

    Ok(outcome)
}
