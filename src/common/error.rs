use std::{fmt, io, path::PathBuf};

#[derive(Debug)]
pub enum Error {
    /// Every slot of the job table is occupied.
    TableFull {
        capacity: usize,
    },
    /// A `%N` or PID argument did not match a tracked job.
    TargetNotFound(String),
    /// A builtin was called without its required argument.
    MissingOperand(&'static str),
    CommandNotFound(String),
    Redirect {
        path: PathBuf,
        source: io::Error,
    },
    /// Waiting for the foreground job failed for a reason other than `ECHILD`.
    Wait(io::Error),
    Options(String),
    Io(Option<PathBuf>, io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableFull { capacity } => {
                write!(f, "all {capacity} job slots are busy, command not started")
            }
            Error::TargetNotFound(token) if token.is_empty() => {
                f.write_str("no job or process specified")
            }
            Error::TargetNotFound(token) => write!(f, "{token}: no such job"),
            Error::MissingOperand(builtin) => write!(f, "{builtin}: missing operand"),
            Error::CommandNotFound(name) => write!(f, "{name}: command not found"),
            Error::Redirect { path, source } => {
                write!(f, "cannot redirect to '{}': {source}", path.display())
            }
            Error::Wait(e) => write!(f, "waitfg: waitpid error: {e}"),
            Error::Options(e) => write!(f, "{e}"),
            Error::Io(location, e) => {
                if let Some(path) = location {
                    write!(f, "{}: {e}", path.display())
                } else {
                    write!(f, "IO error: {e}")
                }
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(None, err)
    }
}

impl Error {
    /// Returns `true` if the shell cannot keep running after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Wait(_))
    }
}
