use std::{
    collections::BTreeMap,
    io,
    os::fd::{AsRawFd, RawFd},
};

use crate::cutils::cerr;
use libc::{c_short, pollfd, POLLERR, POLLHUP, POLLIN};

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Reading will not block.
    Readable,
}

impl PollEvent {
    const fn mask(self) -> c_short {
        match self {
            PollEvent::Readable => POLLIN,
        }
    }
}

/// Descriptors watched with `poll(2)`, each under a key of the caller's choosing.
pub struct PollSet<K> {
    fds: BTreeMap<K, (RawFd, c_short)>,
}

impl<K: Ord + Clone> PollSet<K> {
    pub const fn new() -> Self {
        Self {
            fds: BTreeMap::new(),
        }
    }

    /// Watch `fd` for `event`. Adding a key twice replaces the first descriptor.
    pub fn add_fd<F: AsRawFd>(&mut self, key: K, fd: &F, event: PollEvent) {
        self.fds.insert(key, (fd.as_raw_fd(), event.mask()));
    }

    /// Block until at least one descriptor is ready and return the keys of the ready ones, in key
    /// order.
    ///
    /// Hangups and errors count as readable, the following read reports them.
    pub fn poll(&mut self) -> io::Result<Vec<K>> {
        let mut raw: Vec<pollfd> = self
            .fds
            .values()
            .map(|&(fd, events)| pollfd {
                fd,
                events,
                revents: 0,
            })
            .collect();

        cerr(unsafe { libc::poll(raw.as_mut_ptr(), raw.len() as libc::nfds_t, -1) })?;

        let ready = self
            .fds
            .keys()
            .zip(raw)
            .filter(|(_, fd)| fd.revents & (fd.events | POLLHUP | POLLERR) != 0)
            .map(|(key, _)| key.clone())
            .collect();

        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, os::unix::net::UnixStream};

    use super::{PollEvent, PollSet};

    #[test]
    fn reports_only_ready_descriptors() {
        let (rx1, mut tx1) = UnixStream::pair().unwrap();
        let (rx2, _tx2) = UnixStream::pair().unwrap();

        let mut set = PollSet::new();
        set.add_fd(1, &rx1, PollEvent::Readable);
        set.add_fd(2, &rx2, PollEvent::Readable);

        tx1.write_all(b"x").unwrap();

        assert_eq!(set.poll().unwrap(), vec![1]);
    }

    #[test]
    fn hangup_is_ready() {
        let (rx, tx) = UnixStream::pair().unwrap();
        let mut set = PollSet::new();
        set.add_fd("rx", &rx, PollEvent::Readable);
        drop(tx);

        assert_eq!(set.poll().unwrap(), vec!["rx"]);
    }
}
