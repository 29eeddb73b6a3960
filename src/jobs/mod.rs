//! Job table and the state shared between the interpreter loop and the signal relay.
mod table;
mod token;

pub(crate) use table::{Job, JobState, JobTable};

use crate::{
    log::{dev_info, dev_warn},
    system::interface::ProcessId,
};

/// Everything the shell knows about its children.
///
/// Owned by the interpreter loop and lent by `&mut` to whatever reacts to an OS notification, so
/// there is exactly one writer at any time.
#[derive(Debug)]
pub(crate) struct JobControl {
    table: JobTable,
    /// The process that currently owns the terminal's foreground role, if any.
    foreground: Option<ProcessId>,
    /// Background jobs that finished since the last prompt.
    finished: Vec<Job>,
    /// The foreground job released by an interrupt, until the kernel reports it gone.
    interrupted: Option<Job>,
}

impl JobControl {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            table: JobTable::new(capacity),
            foreground: None,
            finished: Vec::new(),
            interrupted: None,
        }
    }

    pub(crate) fn table(&self) -> &JobTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut JobTable {
        &mut self.table
    }

    pub(crate) fn foreground(&self) -> Option<ProcessId> {
        self.foreground
    }

    /// Hand the foreground role to `pid`.
    pub(crate) fn set_foreground(&mut self, pid: ProcessId) {
        self.table.set_state(pid, JobState::Foreground);
        self.foreground = Some(pid);
    }

    /// Give up the foreground role without touching the job's entry.
    pub(crate) fn clear_foreground(&mut self) -> Option<ProcessId> {
        self.interrupted = None;
        self.foreground.take()
    }

    /// Free the slot of the interrupted foreground job `pid`. The job may survive the interrupt,
    /// so it is kept aside until it is reaped or the foreground role is given up.
    pub(crate) fn release_interrupted(&mut self, pid: ProcessId) {
        if let Some(job) = self.table.release(pid) {
            self.interrupted = Some(job);
        }
    }

    /// Mark `pid` as stopped. A foreground job that was released by an interrupt it then ignored
    /// is tracked again, so it can still be resumed or killed.
    pub(crate) fn mark_stopped(&mut self, pid: ProcessId) {
        if self.table.set_state(pid, JobState::Stopped) {
            return;
        }

        let job = match self.interrupted.take() {
            Some(job) if job.pid() == pid => job,
            other => {
                self.interrupted = other;
                return;
            }
        };

        match self.table.register(pid, true, job.command_line()) {
            Ok(slot_id) => {
                self.table.set_state(pid, JobState::Stopped);
                dev_info!("{pid} survived an interrupt, tracking it again in slot {}", slot_id + 1);
            }
            Err(err) => dev_warn!("cannot track stopped {pid} again: {err}"),
        }
    }

    /// Forget about a child that is gone. Background jobs are remembered so the user can be told
    /// at the next prompt.
    pub(crate) fn reaped(&mut self, pid: ProcessId) {
        if self.interrupted.as_ref().is_some_and(|job| job.pid() == pid) {
            self.interrupted = None;
        }
        if let Some(job) = self.table.release(pid) {
            if job.state() == JobState::Background {
                self.finished.push(job);
            }
        }
    }

    /// The background jobs that finished since the last call.
    pub(crate) fn take_finished(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::{JobControl, JobState};
    use crate::system::interface::ProcessId;

    #[test]
    fn foreground_pointer_follows_the_table() {
        let mut jobs = JobControl::new(3);
        let pid = ProcessId::new(77);
        jobs.table_mut().register(pid, true, "sleep 1 &").unwrap();

        jobs.set_foreground(pid);
        assert_eq!(jobs.foreground(), Some(pid));
        assert_eq!(jobs.table().get(pid).unwrap().state(), JobState::Foreground);

        assert_eq!(jobs.clear_foreground(), Some(pid));
        assert_eq!(jobs.foreground(), None);
        // Clearing the pointer does not drop the job.
        assert!(jobs.table().contains(pid));
    }

    #[test]
    fn interrupted_job_that_stops_is_tracked_again() {
        let mut jobs = JobControl::new(2);
        let pid = ProcessId::new(90);
        jobs.table_mut().register(pid, false, "vi notes").unwrap();
        jobs.set_foreground(pid);

        jobs.release_interrupted(pid);
        assert!(jobs.table().is_empty());

        jobs.mark_stopped(pid);
        let job = jobs.table().get(pid).unwrap();
        assert_eq!(job.state(), JobState::Stopped);
        assert_eq!(job.command_line(), "vi notes");
        assert!(jobs.take_finished().is_empty());
    }

    #[test]
    fn interrupted_job_is_forgotten_once_reaped() {
        let mut jobs = JobControl::new(2);
        let pid = ProcessId::new(91);
        jobs.table_mut().register(pid, false, "sleep 9").unwrap();
        jobs.set_foreground(pid);

        jobs.release_interrupted(pid);
        jobs.reaped(pid);
        jobs.mark_stopped(pid);
        assert!(jobs.table().is_empty());

        // Unknown children are never picked up.
        jobs.mark_stopped(ProcessId::new(92));
        assert!(jobs.table().is_empty());
        assert!(jobs.take_finished().is_empty());
    }

    #[test]
    fn only_background_jobs_are_reported_finished() {
        let mut jobs = JobControl::new(3);
        let (bg, fg, stopped) = (ProcessId::new(1), ProcessId::new(2), ProcessId::new(3));
        jobs.table_mut().register(bg, true, "sleep 1 &").unwrap();
        jobs.table_mut().register(fg, false, "sleep 2").unwrap();
        jobs.table_mut().register(stopped, true, "vi").unwrap();
        jobs.table_mut().set_state(stopped, JobState::Stopped);

        jobs.reaped(bg);
        jobs.reaped(fg);
        jobs.reaped(stopped);
        jobs.reaped(bg);

        let finished = jobs.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].pid(), bg);
        assert!(jobs.take_finished().is_empty());
        assert!(jobs.table().is_empty());
    }
}
