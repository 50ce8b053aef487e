use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// The major.minor.patch triple of a release
///
/// Ordering is numeric per component, so `100.0.0 > 99.9.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Version of the very first release on a train
    pub fn initial() -> Self {
        Version::new(0, 1, 0)
    }

    /// Bump version according to bump kind
    ///
    /// Fails with `VersionOverflow` when the bumped component is already `u64::MAX`.
    pub fn bump(&self, kind: BumpKind) -> Result<Self> {
        let overflow = || ReleaseError::VersionOverflow(self.to_string());
        match kind {
            BumpKind::Major => Ok(Version {
                major: self.major.checked_add(1).ok_or_else(overflow)?,
                minor: 0,
                patch: 0,
            }),
            BumpKind::Minor => Ok(Version {
                major: self.major,
                minor: self.minor.checked_add(1).ok_or_else(overflow)?,
                patch: 0,
            }),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Which component a new release train bumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
}

impl FromStr for BumpKind {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            _ => Err(ReleaseError::InvalidBumpKind(s.to_string())),
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpKind::Major => write!(f, "Major"),
            BumpKind::Minor => write!(f, "Minor"),
        }
    }
}
