//! The interactive interpreter: prompt, line reading and command dispatch.
mod builtins;
mod cli;
mod help;
mod input;
mod parse;
mod redirect;

use std::{fs::File, process::exit};

use crate::{
    common::Error,
    cutils::is_terminal,
    exec::{launch, wait_foreground, EventRegistry, ForegroundOutcome, Process, SignalRelay, StopReason},
    jobs::JobControl,
    log::{dev_info, dev_warn, user_error},
    system::poll::PollEvent,
};

use self::{
    builtins::{quit_all, report_stopped, Builtin, Flow},
    cli::{ShellAction, ShellOptions},
    help::{long_help_message, USAGE_MSG},
    input::LineReader,
    parse::parse,
    redirect::Redirections,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn main() {
    crate::log::ShellLogger::new("jobsh: ").into_global_logger();

    dev_info!("development logs are enabled");

    let options = match ShellOptions::from_env() {
        Ok(options) => options,
        Err(error) => {
            eprintln_ignore_io_error!("jobsh: {error}\n{USAGE_MSG}");
            exit(1);
        }
    };

    match options.action {
        ShellAction::Help => {
            println_ignore_io_error!("{}", long_help_message());
            exit(0);
        }
        ShellAction::Version => {
            println_ignore_io_error!("jobsh {VERSION}");
            exit(0);
        }
        ShellAction::Run => match run(options) {
            Ok(()) => exit(0),
            Err(error) => {
                user_error!("{error}");
                exit(1);
            }
        },
    }
}

fn run(options: ShellOptions) -> Result<(), Error> {
    let relay = SignalRelay::install()?;
    let input = LineReader::stdin()?;
    let interactive = options.interactive || is_terminal(libc::STDIN_FILENO);

    let mut shell = Shell {
        jobs: JobControl::new(options.max_jobs),
        relay,
        input,
        prompt: options.prompt,
        interactive,
    };

    let mut registry = EventRegistry::new();
    registry.register_event(&shell.input, PollEvent::Readable, ShellEvent::Input);
    registry.register_event(shell.relay.stream(), PollEvent::Readable, ShellEvent::Signal);

    shell.show_prompt();

    match registry.event_loop(&mut shell) {
        StopReason::Exit(()) => Ok(()),
        StopReason::Break(error) => {
            quit_all(&mut shell.jobs);
            Err(error)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellEvent {
    Input,
    Signal,
}

struct Shell {
    jobs: JobControl,
    relay: SignalRelay,
    input: LineReader<File>,
    prompt: String,
    interactive: bool,
}

impl Process for Shell {
    type Event = ShellEvent;
    /// Errors the shell cannot recover from.
    type Break = Error;
    type Exit = ();

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>) {
        match event {
            ShellEvent::Input => self.on_input(registry),
            ShellEvent::Signal => {
                if let Err(error) = self.relay.on_signal(&mut self.jobs) {
                    registry.set_break(error);
                }
            }
        }
    }
}

impl Shell {
    fn on_input(&mut self, registry: &mut EventRegistry<Self>) {
        if let Err(error) = self.input.fill() {
            dev_warn!("cannot read input: {error}");
            user_error!("{error}");
            quit_all(&mut self.jobs);
            registry.set_exit(());
            return;
        }

        while let Some(line) = self.input.next_line() {
            match self.eval(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => {
                    registry.set_exit(());
                    return;
                }
                Err(error) if error.is_fatal() => {
                    registry.set_break(error);
                    return;
                }
                Err(error) => user_error!("{error}"),
            }
            self.show_prompt();
        }

        if self.input.is_eof() {
            dev_info!("end of input");
            quit_all(&mut self.jobs);
            registry.set_exit(());
        }
    }

    /// Run one command line.
    fn eval(&mut self, line: &str) -> Result<Flow, Error> {
        let parsed = parse(line);
        if parsed.is_empty() {
            return Ok(Flow::Continue);
        }

        let (redirections, args) = Redirections::extract(parsed.args)?;
        let Some(name) = args.first() else {
            return Ok(Flow::Continue);
        };

        // Children inherit the redirected descriptors when they are forked, so the guard only
        // has to live until the builtin is done or the command is started.
        let guard = if redirections.is_empty() {
            None
        } else {
            Some(redirections.apply()?)
        };

        if let Some(builtin) = Builtin::from_name(name) {
            let flow = builtin.run(&args, &mut self.jobs, &self.relay);
            drop(guard);
            return flow;
        }

        let launched = launch(&mut self.jobs, &args, parsed.background, line.trim());
        drop(guard);
        let pid = launched?;

        if parsed.background {
            if let Some(job) = self.jobs.table().get(pid) {
                println_ignore_io_error!("[{}] {}", job.slot_id() + 1, pid);
            }
        } else if wait_foreground(&mut self.jobs, &self.relay, pid)? == ForegroundOutcome::Stopped {
            report_stopped(&self.jobs, pid);
        }

        Ok(Flow::Continue)
    }

    /// Announce the background jobs that finished, then print the prompt.
    fn show_prompt(&mut self) {
        for job in self.jobs.take_finished() {
            println_ignore_io_error!(
                "[{}] ({}) Done {}",
                job.slot_id() + 1,
                job.pid(),
                job.command_line()
            );
        }

        if self.interactive {
            print_flush_ignore_io_error!("{}", self.prompt);
        }
    }
}
