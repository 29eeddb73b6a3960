use std::{
    fs::File,
    io::{self, Read},
    os::fd::{AsFd, AsRawFd, RawFd},
};

use crate::exec::retry_while_interrupted;

/// Splits the bytes of an unbuffered source into lines.
///
/// Bytes are only read from the source when asked to, so what poll reports for the source is
/// always accurate: nothing is ever hidden in a buffer of the standard library.
pub(crate) struct LineReader<R> {
    source: R,
    pending: Vec<u8>,
    eof: bool,
}

impl LineReader<File> {
    /// Read from a private duplicate of stdin, which redirections of the standard descriptors
    /// leave untouched.
    pub(crate) fn stdin() -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self::new(File::from(fd)))
    }
}

impl<R: Read> LineReader<R> {
    pub(crate) fn new(source: R) -> Self {
        Self {
            source,
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Read once from the source. Returns `false` once the source is exhausted.
    pub(crate) fn fill(&mut self) -> io::Result<bool> {
        let mut chunk = [0; 4096];
        let n = retry_while_interrupted(|| self.source.read(&mut chunk))?;

        if n == 0 {
            self.eof = true;
        } else {
            self.pending.extend_from_slice(&chunk[..n]);
        }

        Ok(!self.eof)
    }

    /// Take the next complete line, without its line terminator. Once the source is exhausted an
    /// unterminated last line is returned as well.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|&byte| byte == b'\n') {
            Some(newline) => newline + 1,
            None if self.eof && !self.pending.is_empty() => self.pending.len(),
            None => return None,
        };

        let line: Vec<u8> = self.pending.drain(..end).collect();
        let line = String::from_utf8_lossy(&line);
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof && self.pending.is_empty()
    }
}

impl<R: AsRawFd> AsRawFd for LineReader<R> {
    fn as_raw_fd(&self) -> RawFd {
        self.source.as_raw_fd()
    }
}
