//! Local version-control operations abstraction layer
//!
//! Cherry-picking has to happen in a real working copy, which the repository host API cannot
//! do. The [VcsWorktree] trait covers exactly the steps the cherry-pick sequence needs:
//!
//! - [worktree::Git2Worktree]: implementation on top of libgit2 via the `git2` crate
//! - [mock::MockWorktree]: in-memory implementation for tests
//!
//! Each operation is expected to be atomic from the caller's point of view; retries, if any,
//! happen inside the implementation.

pub mod mock;
pub mod worktree;

pub use mock::MockWorktree;
pub use worktree::Git2Worktree;

use crate::error::Result;
use crate::host::CommitRef;

/// Handle to a disposable branch created for one cherry-pick attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedBranch {
    /// Branch name, local and on the remote once pushed
    pub name: String,
    /// Commit the branch was created from
    pub base: CommitRef,
}

/// Working-copy operations used to fold commits into a release branch
pub trait VcsWorktree {
    /// Create branch `name` at the current tip of `from_branch` and check it out
    ///
    /// Fails with `RefExists` when a branch called `name` already exists.
    fn create_isolated_branch(&self, name: &str, from_branch: &str) -> Result<IsolatedBranch>;

    /// Cherry-pick `commit` onto the isolated branch and commit the result
    ///
    /// `mainline` selects the parent (1-based) to diff against when `commit` is a merge.
    /// Returns the new tip. Fails with `ApplyConflict` when the commit cannot be applied,
    /// leaving the in-progress pick for [VcsWorktree::abort_apply] to clean up.
    fn apply_commit(
        &self,
        branch: &IsolatedBranch,
        commit: &CommitRef,
        mainline: Option<u32>,
    ) -> Result<CommitRef>;

    /// Drop an in-progress pick, restoring the branch to its last committed state
    fn abort_apply(&self, branch: &IsolatedBranch) -> Result<()>;

    /// Publish the isolated branch to the remote and return its tip
    fn push(&self, branch: &IsolatedBranch) -> Result<CommitRef>;

    /// Delete the isolated branch locally and, when pushed, on the remote
    fn discard(&self, branch: &IsolatedBranch) -> Result<()>;
}
