use std::str::FromStr;

use crate::{common::Error, system::interface::ProcessId};

/// A user supplied reference to a job, as accepted by `fg`, `bg` and `kill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobToken {
    /// `%N`, with `N` counted from 1 as shown by `jobs`. Stored 0-based.
    Slot(usize),
    /// A raw process id.
    Pid(ProcessId),
}

impl FromStr for JobToken {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let not_found = || Error::TargetNotFound(token.to_string());

        if let Some(slot) = token.strip_prefix('%') {
            let slot: usize = slot.parse().map_err(|_| not_found())?;
            slot.checked_sub(1).map(JobToken::Slot).ok_or_else(not_found)
        } else {
            let pid: ProcessId = token.parse().map_err(|_| not_found())?;
            if pid.is_valid() {
                Ok(JobToken::Pid(pid))
            } else {
                Err(not_found())
            }
        }
    }
}
