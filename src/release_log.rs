//! Append-only narration of a release train run
//!
//! The log is written for humans reading the CI job summary. It never feeds back into
//! any decision.

use crate::error::Result;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sink for release log lines
pub trait ReleaseLog {
    fn append_line(&self, line: &str) -> Result<()>;
}

/// Release log stored in a file, truncated once per invocation
#[derive(Debug)]
pub struct FileReleaseLog {
    path: PathBuf,
}

impl FileReleaseLog {
    /// Create (or truncate) the log file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::create(&path)?;
        Ok(FileReleaseLog { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReleaseLog for FileReleaseLog {
    fn append_line(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Release log kept in memory, used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryReleaseLog {
    lines: RefCell<Vec<String>>,
}

impl MemoryReleaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl ReleaseLog for MemoryReleaseLog {
    fn append_line(&self, line: &str) -> Result<()> {
        self.lines.borrow_mut().push(line.to_string());
        Ok(())
    }
}
