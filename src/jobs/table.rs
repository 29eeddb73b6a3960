use std::fmt;

use crate::{common::Error, log::dev_warn, system::interface::ProcessId};

use super::token::JobToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        })
    }
}

/// One tracked child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Job {
    slot_id: usize,
    pid: ProcessId,
    state: JobState,
    command_line: String,
}

impl Job {
    /// The 0-based slot this job occupies.
    pub(crate) fn slot_id(&self) -> usize {
        self.slot_id
    }

    pub(crate) fn pid(&self) -> ProcessId {
        self.pid
    }

    pub(crate) fn state(&self) -> JobState {
        self.state
    }

    pub(crate) fn command_line(&self) -> &str {
        &self.command_line
    }
}

/// `[slot] (pid) state command`, with the slot counted from 1.
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}) {} {}",
            self.slot_id + 1,
            self.pid,
            self.state,
            self.command_line
        )
    }
}

/// Fixed-capacity registry of tracked children. An empty slot is `None`.
///
/// At most one job is [`JobState::Foreground`] at any time: promoting a job to the foreground
/// demotes any previous foreground job to the background.
#[derive(Debug)]
pub(crate) struct JobTable {
    slots: Vec<Option<Job>>,
}

impl JobTable {
    pub(crate) const DEFAULT_CAPACITY: usize = 5;

    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Track `pid` in the first empty slot and return the slot id.
    pub(crate) fn register(
        &mut self,
        pid: ProcessId,
        background: bool,
        command_line: impl Into<String>,
    ) -> Result<usize, Error> {
        // The kernel reused a pid we never saw exit.
        if let Some(stale) = self.release(pid) {
            dev_warn!("{pid} was already tracked in slot {}", stale.slot_id + 1);
        }

        let capacity = self.capacity();
        let slot_id = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TableFull { capacity })?;

        let state = if background {
            JobState::Background
        } else {
            self.demote_foreground();
            JobState::Foreground
        };

        self.slots[slot_id] = Some(Job {
            slot_id,
            pid,
            state,
            command_line: command_line.into(),
        });

        Ok(slot_id)
    }

    /// Empty the slot of `pid`. Releasing a pid that is not tracked (anymore) does nothing, so a
    /// child may be accounted for by more than one path.
    pub(crate) fn release(&mut self, pid: ProcessId) -> Option<Job> {
        self.slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|job| job.pid == pid))
            .and_then(Option::take)
    }

    /// Resolve a `%N` or PID argument into the pid of a tracked job.
    pub(crate) fn find_by_token(&self, token: &str) -> Result<ProcessId, Error> {
        let job = match token.parse::<JobToken>()? {
            JobToken::Slot(slot_id) => self.slots.get(slot_id).and_then(Option::as_ref),
            JobToken::Pid(pid) => self.get(pid),
        };

        job.map(Job::pid)
            .ok_or_else(|| Error::TargetNotFound(token.to_string()))
    }

    /// The occupied slots, in slot order.
    pub(crate) fn list(&self) -> impl Iterator<Item = &Job> + '_ {
        self.slots.iter().flatten()
    }

    /// Change the state of `pid`, returning whether it is tracked.
    pub(crate) fn set_state(&mut self, pid: ProcessId, state: JobState) -> bool {
        if state == JobState::Foreground {
            self.demote_foreground_except(pid);
        }

        match self.get_mut(pid) {
            Some(job) => {
                job.state = state;
                true
            }
            None => false,
        }
    }

    pub(crate) fn get(&self, pid: ProcessId) -> Option<&Job> {
        self.list().find(|job| job.pid == pid)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, pid: ProcessId) -> bool {
        self.get(pid).is_some()
    }

    /// Empty every slot, returning the jobs that were tracked.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Job> + '_ {
        self.slots.iter_mut().filter_map(Option::take)
    }

    fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Job> {
        self.slots.iter_mut().flatten().find(|job| job.pid == pid)
    }

    fn demote_foreground(&mut self) {
        self.demote_foreground_except(ProcessId::new(0))
    }

    fn demote_foreground_except(&mut self, pid: ProcessId) {
        for job in self.slots.iter_mut().flatten() {
            if job.state == JobState::Foreground && job.pid != pid {
                dev_warn!("{} was still in the foreground, moving it to the background", job.pid);
                job.state = JobState::Background;
            }
        }
    }
}
