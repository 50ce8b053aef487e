//! Repository host abstraction layer
//!
//! The release train never talks to a hosting service directly. Every read and mutation of
//! branches, tags, releases and merges goes through the [RepositoryClient] trait so the engine
//! can run against the real host or an in-memory double.
//!
//! - [github::GitHubClient]: GitHub REST implementation
//! - [mock::MockRepositoryClient]: in-memory implementation for tests
//!
//! Timeouts, retries and pagination belong to the implementations. Callers only see
//! [crate::error::ReleaseError] values, which they propagate unmodified.

pub mod github;
pub mod mock;
pub mod retry;

pub use github::GitHubClient;
pub use mock::MockRepositoryClient;
pub use retry::RetryConfig;

use crate::error::Result;
use std::fmt;

/// Opaque commit identifier, usually a full sha
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitRef(String);

impl CommitRef {
    pub fn new(sha: impl Into<String>) -> Self {
        CommitRef(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitRef {
    fn from(sha: &str) -> Self {
        CommitRef::new(sha)
    }
}

/// A branch and the commit at its tip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub commit: CommitRef,
}

/// A tag and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub commit: CommitRef,
}

/// Parameters of a release to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    /// Tag the release is attached to; created by the host when missing
    pub tag: String,
    pub title: String,
    pub body: String,
    pub draft: bool,
    /// Branch name or commit sha the tag is created from
    pub target: String,
    pub generate_notes: bool,
}

/// A published release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    pub tag: String,
    pub url: String,
}

/// Operations the release train needs from the repository host
pub trait RepositoryClient {
    /// Commit at the tip of `name`
    fn get_branch_tip(&self, name: &str) -> Result<CommitRef>;

    /// Create branch `name` at `from`
    ///
    /// Fails with `RefExists` when the branch is already there.
    fn create_branch(&self, name: &str, from: &CommitRef) -> Result<BranchRef>;

    /// Create an annotated tag `name` on `target`
    ///
    /// Fails with `RefExists` when the tag is already there.
    fn create_tag(&self, name: &str, message: &str, target: &CommitRef) -> Result<TagRef>;

    /// Publish a release
    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRef>;

    /// Every tag in the repository
    fn list_tags(&self) -> Result<Vec<TagRef>>;

    /// Every branch in the repository
    fn list_branches(&self) -> Result<Vec<BranchRef>>;

    /// Merge `from` into branch `into`
    ///
    /// Returns the merge commit, or `None` when `into` already contains `from`.
    /// Fails with `MergeConflict` when the host cannot merge automatically.
    fn merge(&self, into: &str, from: &CommitRef, message: &str) -> Result<Option<CommitRef>>;

    /// Resolve a user supplied hash to a commit
    ///
    /// Fails with `CommitNotFound` when the hash names no commit.
    fn resolve_commit(&self, hash: &str) -> Result<CommitRef>;

    /// Browser URL of the repository, used to build compare links
    fn html_url(&self) -> String;
}
