use std::{env, path::PathBuf};

use crate::{
    common::Error,
    exec::{wait_foreground, ForegroundOutcome, SignalRelay},
    jobs::{JobControl, JobState},
    log::{dev_info, dev_warn},
    system::{
        interface::ProcessId,
        signal::consts::{SIGCONT, SIGKILL},
        signal_job,
    },
};

/// Commands run by the shell itself instead of being launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Quit,
    Pwd,
    Cd,
    Jobs,
    Fg,
    Bg,
    Kill,
}

/// Whether the interpreter keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

impl Builtin {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "quit" => Builtin::Quit,
            "pwd" => Builtin::Pwd,
            "cd" => Builtin::Cd,
            "jobs" => Builtin::Jobs,
            "fg" => Builtin::Fg,
            "bg" => Builtin::Bg,
            "kill" => Builtin::Kill,
            _ => return None,
        })
    }

    /// Run the builtin. `args[0]` is the builtin's own name.
    pub(crate) fn run(
        self,
        args: &[String],
        jobs: &mut JobControl,
        relay: &SignalRelay,
    ) -> Result<Flow, Error> {
        let operand = args.get(1).map(String::as_str);

        match self {
            Builtin::Quit => {
                quit_all(jobs);
                return Ok(Flow::Exit);
            }
            Builtin::Pwd => {
                let cwd = env::current_dir()?;
                println_ignore_io_error!("{}", cwd.display());
            }
            Builtin::Cd => {
                let path = operand.ok_or(Error::MissingOperand("cd"))?;
                env::set_current_dir(path).map_err(|e| Error::Io(Some(PathBuf::from(path)), e))?;
            }
            Builtin::Jobs => {
                for job in jobs.table().list() {
                    println_ignore_io_error!("{job}");
                }
            }
            Builtin::Fg => {
                let pid = jobs.table().find_by_token(operand.unwrap_or_default())?;
                continue_job(pid)?;
                if wait_foreground(jobs, relay, pid)? == ForegroundOutcome::Stopped {
                    report_stopped(jobs, pid);
                }
            }
            Builtin::Bg => {
                let pid = jobs.table().find_by_token(operand.unwrap_or_default())?;
                continue_job(pid)?;
                jobs.table_mut().set_state(pid, JobState::Background);
                if let Some(job) = jobs.table().get(pid) {
                    println_ignore_io_error!("[{}] ({}) {}", job.slot_id() + 1, pid, job.command_line());
                }
            }
            Builtin::Kill => {
                let pid = jobs.table().find_by_token(operand.unwrap_or_default())?;
                signal_job(pid, SIGKILL)?;
                jobs.table_mut().release(pid);
                dev_info!("killed {pid}");
            }
        }

        Ok(Flow::Continue)
    }
}

fn continue_job(pid: ProcessId) -> Result<(), Error> {
    signal_job(pid, SIGCONT)?;
    Ok(())
}

/// Tell the user that the foreground job `pid` was stopped.
pub(crate) fn report_stopped(jobs: &JobControl, pid: ProcessId) {
    if let Some(job) = jobs.table().get(pid) {
        println_ignore_io_error!("{job}");
    }
}

/// Kill every tracked job and forget about all of them.
pub(crate) fn quit_all(jobs: &mut JobControl) {
    jobs.clear_foreground();
    if jobs.table().is_empty() {
        return;
    }

    dev_info!("killing {} remaining jobs", jobs.table().len());
    for job in jobs.table_mut().drain() {
        if let Err(err) = signal_job(job.pid(), SIGKILL) {
            dev_warn!("cannot kill {}: {err}", job.pid());
        }
    }
}
