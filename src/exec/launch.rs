use std::{
    io,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    common::Error,
    jobs::JobControl,
    log::{dev_info, dev_warn},
    system::{
        _exit, fork,
        interface::ProcessId,
        kill, setpgid,
        signal::{consts::SIGKILL, SignalHandler, SignalHandlerBehavior, SignalSet},
        ForkResult,
    },
};

use super::SHELL_SIGNALS;

/// Exit status of a child whose command could not be executed.
const EXIT_NOT_FOUND: libc::c_int = 127;

/// Start `args` as a new job and track it in `jobs`.
///
/// The child leads a new process group so terminal signals aimed at the shell never reach it
/// directly. The job is registered before this function returns, so it is tracked before anything
/// could reap it.
pub(crate) fn launch(
    jobs: &mut JobControl,
    args: &[String],
    background: bool,
    command_line: &str,
) -> Result<ProcessId, Error> {
    let Some(program) = args.first() else {
        return Err(Error::CommandNotFound(String::new()));
    };

    // Never fork a process we would not be able to track.
    if jobs.table().is_full() {
        return Err(Error::TableFull {
            capacity: jobs.table().capacity(),
        });
    }

    // Block all the signals so the child can reset its handlers before anything is delivered to
    // it, and so a fast `SIGCHLD` cannot be handled before the job is registered.
    let original_set = match SignalSet::full().and_then(|set| set.block()) {
        Ok(original_set) => Some(original_set),
        Err(err) => {
            dev_warn!("cannot block signals: {err}");
            None
        }
    };

    let fork_result = fork();

    let command_pid = match fork_result {
        Ok(ForkResult::Parent(command_pid)) => command_pid,
        Ok(ForkResult::Child) => run_child(program, &args[1..], original_set),
        Err(err) => {
            restore_mask(original_set);
            dev_warn!("unable to fork command process: {err}");
            return Err(err.into());
        }
    };

    // Also done by the child; whoever runs first wins and the other call is harmless.
    if let Err(err) = setpgid(command_pid, command_pid) {
        dev_info!("cannot move {command_pid} to its own process group: {err}");
    }

    let registered = jobs
        .table_mut()
        .register(command_pid, background, command_line);

    restore_mask(original_set);

    match registered {
        Ok(slot_id) => {
            dev_info!("started `{command_line}` as {command_pid} in slot {}", slot_id + 1);
            Ok(command_pid)
        }
        Err(err) => {
            // Untracked children must not outlive the launch.
            kill(command_pid, SIGKILL).ok();
            Err(err)
        }
    }
}

fn restore_mask(original_set: Option<SignalSet>) {
    if let Some(set) = original_set {
        if let Err(err) = set.set_mask() {
            dev_warn!("cannot restore signal mask: {err}");
        }
    }
}

/// The child side of [`launch`]. Never returns into the interpreter.
fn run_child(program: &str, args: &[String], original_set: Option<SignalSet>) -> ! {
    if let Err(err) = setpgid(ProcessId::new(0), ProcessId::new(0)) {
        dev_warn!("cannot create process group: {err}");
    }

    // The shell catches or ignores these; the command gets the default behavior back.
    for signal in SHELL_SIGNALS {
        match SignalHandler::register(signal, SignalHandlerBehavior::Default) {
            Ok(handler) => handler.forget(),
            Err(err) => dev_warn!("cannot reset handler for signal {signal}: {err}"),
        }
    }

    restore_mask(original_set);

    let err = exec_command(program, args);

    let error = if err.kind() == io::ErrorKind::NotFound {
        Error::CommandNotFound(program.to_string())
    } else {
        Error::Io(Some(PathBuf::from(program)), err)
    };
    eprintln_ignore_io_error!("{error}");

    _exit(EXIT_NOT_FOUND)
}

/// Replace the current process image. Tries a `PATH` search first and then the name as a path
/// relative to the working directory. Only returns if both attempts failed.
fn exec_command(program: &str, args: &[String]) -> io::Error {
    let err = Command::new(program).args(args).exec();

    if program.contains('/') {
        return err;
    }

    dev_info!("`{program}` not found in PATH ({err}), trying the working directory");
    let fallback = Command::new(Path::new(".").join(program))
        .arg0(program)
        .args(args)
        .exec();

    // Report the first error unless the file does exist locally.
    if fallback.kind() == io::ErrorKind::NotFound {
        err
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::{
        common::Error,
        jobs::{JobControl, JobState},
        system::{
            getpgid,
            interface::ProcessId,
            kill,
            signal::consts::SIGKILL,
            testing::in_child_process,
            wait::{Wait, WaitOptions},
        },
    };

    use super::launch;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn registers_and_isolates_the_child() {
        in_child_process(|| {
            let mut jobs = JobControl::new(2);
            let pid = launch(&mut jobs, &args(&["sleep", "5"]), true, "sleep 5 &").unwrap();

            let job = jobs.table().get(pid).unwrap();
            assert_eq!(job.state(), JobState::Background);
            assert_eq!(job.command_line(), "sleep 5 &");
            assert_eq!(getpgid(pid).unwrap(), pid);

            kill(pid, SIGKILL).unwrap();
            let (_, status) = pid.wait(WaitOptions::new()).unwrap();
            assert_eq!(status.term_signal(), Some(SIGKILL));
        });
    }

    #[test]
    fn foreground_launch_is_registered_as_foreground() {
        in_child_process(|| {
            let mut jobs = JobControl::new(2);
            let pid = launch(&mut jobs, &args(&["true"]), false, "true").unwrap();
            assert_eq!(jobs.table().get(pid).unwrap().state(), JobState::Foreground);

            let (_, status) = pid.wait(WaitOptions::new()).unwrap();
            assert_eq!(status.exit_status(), Some(0));
        });
    }

    #[test]
    fn unknown_command_exits_127() {
        in_child_process(|| {
            let mut jobs = JobControl::new(2);
            let pid = launch(
                &mut jobs,
                &args(&["definitely-not-a-command-jobsh"]),
                false,
                "definitely-not-a-command-jobsh",
            )
            .unwrap();

            let (_, status) = pid.wait(WaitOptions::new()).unwrap();
            assert_eq!(status.exit_status(), Some(127));
        });
    }

    #[test]
    fn full_table_never_forks() {
        in_child_process(|| {
            let mut jobs = JobControl::new(1);
            jobs.table_mut()
                .register(ProcessId::new(999_999), true, "placeholder")
                .unwrap();

            let started = Instant::now();
            let err = launch(&mut jobs, &args(&["sleep", "5"]), true, "sleep 5 &").unwrap_err();
            assert!(matches!(err, Error::TableFull { capacity: 1 }));
            assert!(started.elapsed() < Duration::from_secs(1));

            // No child was created, so there is nothing to wait for.
            let err = ProcessId::ANY_CHILD
                .wait(WaitOptions::new().no_hang())
                .unwrap_err();
            assert!(err.is_no_child());
        });
    }
}
