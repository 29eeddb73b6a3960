use crate::{
    common::Error,
    jobs::JobControl,
    log::dev_info,
    system::{interface::ProcessId, poll::PollEvent},
};

use super::{
    event::{EventRegistry, Process, StopReason},
    relay::reap_children,
    ForegroundOutcome, SignalRelay,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaiterEvent {
    Signal,
}

struct ForegroundWaiter<'a> {
    jobs: &'a mut JobControl,
    relay: &'a SignalRelay,
}

impl Process for ForegroundWaiter<'_> {
    type Event = WaiterEvent;
    type Break = Error;
    type Exit = ForegroundOutcome;

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>) {
        match event {
            WaiterEvent::Signal => match self.relay.on_signal(self.jobs) {
                Ok(Some(outcome)) => registry.set_exit(outcome),
                Ok(None) => {}
                Err(err) => registry.set_break(err),
            },
        }
    }
}

/// Block until `pid` exits or stops, relaying terminal signals to it in the meantime.
///
/// `pid` holds the foreground role for the duration of the call. An exited job has left the
/// table when this returns; a stopped one is still there, marked as stopped.
pub(crate) fn wait_foreground(
    jobs: &mut JobControl,
    relay: &SignalRelay,
    pid: ProcessId,
) -> Result<ForegroundOutcome, Error> {
    jobs.set_foreground(pid);

    // The job may already be done, with its notification consumed by someone else.
    let result = match reap_children(jobs) {
        Ok(Some(outcome)) => Ok(outcome),
        Ok(None) => {
            let mut registry = EventRegistry::new();
            registry.register_event(relay.stream(), PollEvent::Readable, WaiterEvent::Signal);

            let mut waiter = ForegroundWaiter {
                jobs: &mut *jobs,
                relay,
            };
            match registry.event_loop(&mut waiter) {
                StopReason::Exit(outcome) => Ok(outcome),
                StopReason::Break(err) => Err(err),
            }
        }
        Err(err) => Err(err),
    };

    if let Ok(outcome) = &result {
        dev_info!("foreground job {pid} is done waiting: {outcome:?}");
    }

    jobs.clear_foreground();
    result
}
