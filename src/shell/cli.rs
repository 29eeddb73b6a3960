use crate::{common::Error, jobs::JobTable};

/// Largest job table the shell agrees to manage.
const MAX_JOBS_LIMIT: usize = 64;

pub(crate) const DEFAULT_PROMPT: &str = "prompt > ";

#[derive(Debug, PartialEq)]
pub(crate) struct ShellOptions {
    pub(crate) max_jobs: usize,
    pub(crate) prompt: String,
    pub(crate) interactive: bool,
    pub(crate) action: ShellAction,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            max_jobs: JobTable::DEFAULT_CAPACITY,
            prompt: DEFAULT_PROMPT.to_string(),
            interactive: false,
            action: ShellAction::Run,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum ShellAction {
    Help,
    Version,
    Run,
}

type OptionSetter = fn(&mut ShellOptions, Option<String>) -> Result<(), Error>;

struct ShellOption {
    short: char,
    long: &'static str,
    takes_argument: bool,
    set: OptionSetter,
}

impl ShellOptions {
    const SHELL_OPTIONS: &'static [ShellOption] = &[
        ShellOption {
            short: 'h',
            long: "help",
            takes_argument: false,
            set: |options, _| {
                options.action = ShellAction::Help;
                Ok(())
            },
        },
        ShellOption {
            short: 'i',
            long: "interactive",
            takes_argument: false,
            set: |options, _| {
                options.interactive = true;
                Ok(())
            },
        },
        ShellOption {
            short: 'm',
            long: "max-jobs",
            takes_argument: true,
            set: |options, argument| {
                let argument = argument.ok_or_else(|| missing_argument('m'))?;
                options.max_jobs = match argument.parse::<usize>() {
                    Ok(n @ 1..=MAX_JOBS_LIMIT) => n,
                    _ => {
                        return Err(Error::Options(format!(
                            "invalid job count '{argument}', expected 1 to {MAX_JOBS_LIMIT}"
                        )))
                    }
                };
                Ok(())
            },
        },
        ShellOption {
            short: 'p',
            long: "prompt",
            takes_argument: true,
            set: |options, argument| {
                options.prompt = argument.ok_or_else(|| missing_argument('p'))?;
                Ok(())
            },
        },
        ShellOption {
            short: 'V',
            long: "version",
            takes_argument: false,
            set: |options, _| {
                options.action = ShellAction::Version;
                Ok(())
            },
        },
    ];

    pub(crate) fn from_env() -> Result<ShellOptions, Error> {
        let args = std::env::args().collect();

        Self::parse_arguments(args)
    }

    /// Parse the command line, `arguments[0]` being the program name.
    pub(crate) fn parse_arguments(arguments: Vec<String>) -> Result<ShellOptions, Error> {
        let mut options = ShellOptions::default();
        let mut arg_iter = arguments.into_iter().skip(1);

        while let Some(arg) = arg_iter.next() {
            if let Some(long) = arg.strip_prefix("--") {
                // '--max-jobs=8' style assignments
                let (name, value) = match long.split_once('=') {
                    Some((name, value)) => (name, Some(value.to_string())),
                    None => (long, None),
                };

                let Some(option) = Self::SHELL_OPTIONS.iter().find(|o| o.long == name) else {
                    return Err(Error::Options(format!("unrecognized option '{arg}'")));
                };

                match (option.takes_argument, value) {
                    (true, Some(value)) => (option.set)(&mut options, Some(value))?,
                    (true, None) => (option.set)(&mut options, arg_iter.next())?,
                    (false, None) => (option.set)(&mut options, None)?,
                    (false, Some(_)) => {
                        return Err(Error::Options(format!(
                            "'--{}' does not take any arguments",
                            option.long
                        )))
                    }
                }
            } else if let Some(flags) = arg.strip_prefix('-').filter(|flags| !flags.is_empty()) {
                // flags can be grouped, so we loop over the characters
                for (index, flag) in flags.char_indices() {
                    let Some(option) = Self::SHELL_OPTIONS.iter().find(|o| o.short == flag) else {
                        return Err(Error::Options(format!("invalid option -- '{flag}'")));
                    };

                    if option.takes_argument {
                        // either the rest of the current flag group or the next argument
                        let rest = &flags[index + flag.len_utf8()..];
                        let next_arg = if rest.is_empty() {
                            arg_iter.next()
                        } else {
                            Some(rest.to_string())
                        };
                        (option.set)(&mut options, next_arg)?;
                        break;
                    }

                    (option.set)(&mut options, None)?;
                }
            } else {
                return Err(Error::Options(format!("unexpected argument '{arg}'")));
            }
        }

        Ok(options)
    }
}

fn missing_argument(flag: char) -> Error {
    Error::Options(format!("option requires an argument -- '{flag}'"))
}
