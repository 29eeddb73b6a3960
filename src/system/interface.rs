use std::{fmt::Display, num::ParseIntError, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(libc::pid_t);

impl ProcessId {
    /// Any child of the calling process, as understood by `waitpid`.
    pub const ANY_CHILD: Self = Self(-1);

    pub const fn new(id: libc::pid_t) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> libc::pid_t {
        self.0
    }

    /// Whether this value names one concrete process.
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProcessId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<libc::pid_t>().map(ProcessId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessId;

    #[test]
    fn parse_and_display() {
        let pid: ProcessId = "4242".parse().unwrap();
        assert_eq!(pid, ProcessId::new(4242));
        assert_eq!(pid.to_string(), "4242");
        assert!(pid.is_valid());

        assert!("abc".parse::<ProcessId>().is_err());
        assert!(!ProcessId::new(0).is_valid());
        assert!(!ProcessId::ANY_CHILD.is_valid());
    }
}
