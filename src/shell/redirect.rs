use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    os::fd::{AsFd, OwnedFd, RawFd},
    path::{Path, PathBuf},
};

use crate::{common::Error, log::dev_warn, system::dup2};

/// The `<`, `>` and `>>` operators found on a command line.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Redirections {
    pub(crate) input: Option<PathBuf>,
    pub(crate) output: Option<PathBuf>,
    /// `>>` was used for `output`.
    pub(crate) append: bool,
}

impl Redirections {
    /// Take the redirection operators and their operands out of `args`.
    ///
    /// Operators may stand alone (`> out`) or be glued to their file (`>out`). The last operator
    /// of each direction wins.
    pub(crate) fn extract(args: Vec<String>) -> Result<(Self, Vec<String>), Error> {
        let mut redirections = Self::default();
        let mut remaining = Vec::with_capacity(args.len());
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (operator, glued) = if let Some(path) = arg.strip_prefix(">>") {
                (">>", path)
            } else if let Some(path) = arg.strip_prefix('>') {
                (">", path)
            } else if let Some(path) = arg.strip_prefix('<') {
                ("<", path)
            } else {
                remaining.push(arg);
                continue;
            };

            let path = if glued.is_empty() {
                args.next().ok_or(Error::MissingOperand(operator))?
            } else {
                glued.to_string()
            };

            match operator {
                "<" => redirections.input = Some(path.into()),
                _ => {
                    redirections.output = Some(path.into());
                    redirections.append = operator == ">>";
                }
            }
        }

        Ok((redirections, remaining))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Point stdin and stdout at the redirection targets until the returned guard is dropped.
    ///
    /// Children forked while the guard lives inherit the redirected descriptors.
    pub(crate) fn apply(&self) -> Result<RedirectGuard, Error> {
        let mut guard = RedirectGuard { saved: Vec::new() };

        if let Some(path) = &self.input {
            let file = File::open(path).map_err(|source| redirect_error(path, source))?;
            guard.swap(libc::STDIN_FILENO, io::stdin().as_fd().try_clone_to_owned(), &file)?;
        }

        if let Some(path) = &self.output {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .append(self.append)
                .truncate(!self.append)
                .open(path)
                .map_err(|source| redirect_error(path, source))?;

            io::stdout().flush().ok();
            guard.swap(libc::STDOUT_FILENO, io::stdout().as_fd().try_clone_to_owned(), &file)?;
        }

        Ok(guard)
    }
}

fn redirect_error(path: &Path, source: io::Error) -> Error {
    Error::Redirect {
        path: path.to_path_buf(),
        source,
    }
}

/// Restores the standard descriptors saved by [`Redirections::apply`].
#[must_use]
pub(crate) struct RedirectGuard {
    saved: Vec<(RawFd, OwnedFd)>,
}

impl RedirectGuard {
    fn swap(&mut self, target: RawFd, saved: io::Result<OwnedFd>, file: &File) -> io::Result<()> {
        let saved = saved?;
        dup2(file, target)?;
        self.saved.push((target, saved));
        Ok(())
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        io::stdout().flush().ok();

        for (target, saved) in self.saved.drain(..).rev() {
            if let Err(err) = dup2(&saved, target) {
                dev_warn!("cannot restore descriptor {target}: {err}");
            }
        }
    }
}
