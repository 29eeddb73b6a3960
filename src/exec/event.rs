use std::{collections::BTreeMap, os::fd::AsRawFd};

use crate::{
    log::dev_warn,
    system::poll::{PollEvent, PollSet},
};

use super::io_util::was_interrupted;

/// Something driven by an [`EventRegistry`]: the interpreter, or a foreground wait.
pub(crate) trait Process: Sized {
    /// What a ready descriptor means to this process.
    type Event: Copy + Eq;
    /// An error the loop cannot continue after.
    type Break;
    /// The result of a loop that ran to completion.
    type Exit;

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>);
}

pub(crate) enum StopReason<T: Process> {
    Break(T::Break),
    Exit(T::Exit),
}

#[derive(PartialEq, Eq, Ord, PartialOrd, Clone, Copy)]
struct EventId(usize);

/// Descriptors to poll and the events they stand for.
pub(crate) struct EventRegistry<T: Process> {
    poll_set: PollSet<EventId>,
    events: BTreeMap<EventId, T::Event>,
    stop: Option<StopReason<T>>,
}

impl<T: Process> EventRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            poll_set: PollSet::new(),
            events: BTreeMap::new(),
            stop: None,
        }
    }

    /// Produce `event` whenever `fd` is ready for `poll_event`.
    pub(crate) fn register_event<F: AsRawFd>(
        &mut self,
        fd: &F,
        poll_event: PollEvent,
        event: T::Event,
    ) {
        let id = EventId(self.events.len());
        self.poll_set.add_fd(id, fd, poll_event);
        self.events.insert(id, event);
    }

    /// Stop the loop with an error once the current callback returns.
    pub(crate) fn set_break(&mut self, reason: T::Break) {
        self.stop = Some(StopReason::Break(reason));
    }

    /// Stop the loop with a result once the current callback returns.
    pub(crate) fn set_exit(&mut self, reason: T::Exit) {
        self.stop = Some(StopReason::Exit(reason));
    }

    /// Poll and dispatch until a callback asks to stop. Events that were ready together with the
    /// stopping one are not dispatched.
    pub(crate) fn event_loop(&mut self, process: &mut T) -> StopReason<T> {
        loop {
            let ready = match self.poll_set.poll() {
                Ok(ids) => ids,
                // Woken up by a signal, which is now waiting in the signal stream.
                Err(err) if was_interrupted(&err) => continue,
                Err(err) => {
                    dev_warn!("poll failed: {err}");
                    continue;
                }
            };

            for id in ready {
                let Some(&event) = self.events.get(&id) else {
                    continue;
                };
                process.on_event(event, self);

                if let Some(reason) = self.stop.take() {
                    return reason;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        os::unix::net::UnixStream,
    };

    use crate::system::poll::PollEvent;

    use super::{EventRegistry, Process, StopReason};

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    enum Event {
        First,
        Second,
    }

    struct Collector {
        rx1: UnixStream,
        rx2: UnixStream,
        seen: Vec<u8>,
    }

    impl Process for Collector {
        type Event = Event;
        type Break = &'static str;
        type Exit = usize;

        fn on_event(&mut self, event: Event, registry: &mut EventRegistry<Self>) {
            let mut byte = [0];
            match event {
                Event::First => self.rx1.read_exact(&mut byte).unwrap(),
                Event::Second => self.rx2.read_exact(&mut byte).unwrap(),
            }
            self.seen.push(byte[0]);

            match byte[0] {
                b'q' => registry.set_exit(self.seen.len()),
                b'!' => registry.set_break("bang"),
                _ => {}
            }
        }
    }

    #[test]
    fn exits_with_reason() {
        let (rx1, mut tx1) = UnixStream::pair().unwrap();
        let (rx2, mut tx2) = UnixStream::pair().unwrap();
        let mut collector = Collector {
            rx1,
            rx2,
            seen: Vec::new(),
        };

        let mut registry = EventRegistry::new();
        registry.register_event(&collector.rx1, PollEvent::Readable, Event::First);
        registry.register_event(&collector.rx2, PollEvent::Readable, Event::Second);

        tx1.write_all(b"a").unwrap();
        tx2.write_all(b"bq").unwrap();

        let StopReason::Exit(count) = registry.event_loop(&mut collector) else {
            panic!("expected exit");
        };
        assert_eq!(count, collector.seen.len());
        assert!(collector.seen.ends_with(b"q"));
    }

    #[test]
    fn breaks_on_request() {
        let (rx1, mut tx1) = UnixStream::pair().unwrap();
        let (rx2, _tx2) = UnixStream::pair().unwrap();
        let mut collector = Collector {
            rx1,
            rx2,
            seen: Vec::new(),
        };

        let mut registry = EventRegistry::new();
        registry.register_event(&collector.rx1, PollEvent::Readable, Event::First);
        registry.register_event(&collector.rx2, PollEvent::Readable, Event::Second);

        tx1.write_all(b"!").unwrap();

        let StopReason::Break(reason) = registry.event_loop(&mut collector) else {
            panic!("expected break");
        };
        assert_eq!(reason, "bang");
    }
}
