//! Folding individual commits into a release branch
//!
//! The sequence runs on a disposable branch so the shared release branch is touched exactly
//! once, by the final merge. Every step is a method on [CherryPickPlanner] and can be driven
//! on its own; [CherryPickPlanner::run] chains them and owns the cleanup policy:
//!
//! - failures before the tag exists discard the disposable branch
//! - a merge conflict keeps it for inspection
//! - success discards it, best-effort

use crate::domain::VersionTag;
use crate::error::{ReleaseError, Result};
use crate::git::{IsolatedBranch, VcsWorktree};
use crate::host::{CommitRef, RepositoryClient, TagRef};
use tracing::{debug, info, warn};

/// Parent used when a merge commit has to be replayed
const MAINLINE_PARENT: u32 = 1;

/// Position of a cherry-pick sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CherryPickState {
    Idle,
    ValidatingCommits,
    Isolating,
    Applying,
    MergingBack,
    Succeeded,
    Aborted,
}

/// A commit that made it onto the disposable branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCommit {
    pub commit: CommitRef,
    /// `Some` when the commit only applied as a merge against that parent
    pub mainline: Option<u32>,
}

/// Result of a successful sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CherryPickOutcome {
    pub tag: TagRef,
    pub release_branch: String,
    pub applied: Vec<AppliedCommit>,
    /// `None` when the release branch already contained the tagged commit
    pub merge_commit: Option<CommitRef>,
}

/// Name of the disposable branch used to build `tag`
pub fn scratch_branch_name(tag: &VersionTag) -> String {
    format!("temp-{}", tag)
}

/// Tag message for a new release candidate
pub fn candidate_tag_message(tag: &VersionTag) -> String {
    format!("Release Candidate tag {} created", tag)
}

pub const CHERRY_PICK_MERGE_MESSAGE: &str =
    "Merge changes from newly created (cherrypick)tag to release branch";

/// Drives one cherry-pick sequence against injected collaborators
pub struct CherryPickPlanner<'a> {
    client: &'a dyn RepositoryClient,
    worktree: &'a dyn VcsWorktree,
    state: CherryPickState,
    history: Vec<CherryPickState>,
    tagged: Option<TagRef>,
}

impl<'a> CherryPickPlanner<'a> {
    pub fn new(client: &'a dyn RepositoryClient, worktree: &'a dyn VcsWorktree) -> Self {
        CherryPickPlanner {
            client,
            worktree,
            state: CherryPickState::Idle,
            history: vec![CherryPickState::Idle],
            tagged: None,
        }
    }

    /// Current state
    pub fn state(&self) -> CherryPickState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`
    pub fn history(&self) -> &[CherryPickState] {
        &self.history
    }

    fn enter(&mut self, state: CherryPickState) {
        debug!(from = ?self.state, to = ?state, "cherry-pick transition");
        self.state = state;
        self.history.push(state);
    }

    /// Resolve every supplied hash; nothing is applied unless all of them resolve
    pub fn validate(&mut self, hashes: &[String]) -> Result<Vec<CommitRef>> {
        self.enter(CherryPickState::ValidatingCommits);

        let mut resolved = Vec::with_capacity(hashes.len());
        let mut invalid = Vec::new();
        for hash in hashes {
            match self.client.resolve_commit(hash) {
                Ok(commit) => resolved.push(commit),
                Err(ReleaseError::CommitNotFound(_)) => invalid.push(hash.clone()),
                Err(e) => {
                    self.enter(CherryPickState::Aborted);
                    return Err(e);
                }
            }
        }

        if !invalid.is_empty() {
            self.enter(CherryPickState::Aborted);
            return Err(ReleaseError::InvalidCommitReferences(invalid));
        }
        Ok(resolved)
    }

    /// Create the disposable branch `name` from the tip of `release_branch`
    pub fn isolate(&mut self, name: &str, release_branch: &str) -> Result<IsolatedBranch> {
        self.enter(CherryPickState::Isolating);
        match self.worktree.create_isolated_branch(name, release_branch) {
            Ok(branch) => Ok(branch),
            Err(e) => {
                self.enter(CherryPickState::Aborted);
                Err(e)
            }
        }
    }

    /// Apply `commits` in order, retrying each failed one once as a merge commit
    ///
    /// On failure the in-progress pick is aborted and the error names the commit that
    /// did not apply. The caller decides what happens to the branch.
    pub fn apply(
        &mut self,
        branch: &IsolatedBranch,
        commits: &[CommitRef],
    ) -> Result<Vec<AppliedCommit>> {
        self.enter(CherryPickState::Applying);

        let mut applied = Vec::with_capacity(commits.len());
        for commit in commits {
            match self.apply_one(branch, commit) {
                Ok(entry) => applied.push(entry),
                Err(e) => {
                    self.enter(CherryPickState::Aborted);
                    return Err(e);
                }
            }
        }
        Ok(applied)
    }

    fn apply_one(&self, branch: &IsolatedBranch, commit: &CommitRef) -> Result<AppliedCommit> {
        let first_reason = match self.worktree.apply_commit(branch, commit, None) {
            Ok(_) => {
                return Ok(AppliedCommit {
                    commit: commit.clone(),
                    mainline: None,
                })
            }
            Err(ReleaseError::ApplyConflict { reason, .. }) => reason,
            Err(e) => return Err(e),
        };

        debug!(commit = %commit, reason = %first_reason, "retrying as merge commit");
        self.worktree.abort_apply(branch)?;

        match self.worktree.apply_commit(branch, commit, Some(MAINLINE_PARENT)) {
            Ok(_) => Ok(AppliedCommit {
                commit: commit.clone(),
                mainline: Some(MAINLINE_PARENT),
            }),
            Err(ReleaseError::ApplyConflict { reason, .. }) => {
                self.worktree.abort_apply(branch)?;
                Err(ReleaseError::CherryPickFailed {
                    commit: commit.to_string(),
                    reason,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Publish the branch, tag its tip and merge the tag into `release_branch`
    pub fn merge_back(
        &mut self,
        branch: &IsolatedBranch,
        tag: &VersionTag,
        release_branch: &str,
    ) -> Result<(TagRef, Option<CommitRef>)> {
        self.enter(CherryPickState::MergingBack);

        let tip = match self.worktree.push(branch) {
            Ok(tip) => tip,
            Err(e) => {
                self.enter(CherryPickState::Aborted);
                return Err(e);
            }
        };

        let tag_ref = match self
            .client
            .create_tag(&tag.render(), &candidate_tag_message(tag), &tip)
        {
            Ok(tag_ref) => tag_ref,
            Err(e) => {
                self.enter(CherryPickState::Aborted);
                return Err(e);
            }
        };
        self.tagged = Some(tag_ref.clone());
        info!(tag = %tag_ref.name, commit = %tip, "tagged cherry-picked commits");

        match self
            .client
            .merge(release_branch, &tag_ref.commit, CHERRY_PICK_MERGE_MESSAGE)
        {
            Ok(merge_commit) => {
                self.enter(CherryPickState::Succeeded);
                Ok((tag_ref, merge_commit))
            }
            Err(e) => {
                self.enter(CherryPickState::Aborted);
                Err(e)
            }
        }
    }

    /// Run the whole sequence for `commits`, producing candidate `tag` on `release_branch`
    pub fn run(
        &mut self,
        release_branch: &str,
        tag: &VersionTag,
        commits: &[String],
    ) -> Result<CherryPickOutcome> {
        let resolved = self.validate(commits)?;
        let branch = self.isolate(&scratch_branch_name(tag), release_branch)?;

        let applied = match self.apply(&branch, &resolved) {
            Ok(applied) => applied,
            Err(e) => {
                self.discard(&branch);
                return Err(e);
            }
        };

        match self.merge_back(&branch, tag, release_branch) {
            Ok((tag_ref, merge_commit)) => {
                self.discard(&branch);
                Ok(CherryPickOutcome {
                    tag: tag_ref,
                    release_branch: release_branch.to_string(),
                    applied,
                    merge_commit,
                })
            }
            Err(e) => {
                if self.tagged.is_some() {
                    warn!(branch = %branch.name, "keeping disposable branch for manual resolution");
                } else {
                    self.discard(&branch);
                }
                Err(e)
            }
        }
    }

    fn discard(&self, branch: &IsolatedBranch) {
        if let Err(e) = self.worktree.discard(branch) {
            warn!(branch = %branch.name, error = %e, "failed to discard disposable branch");
        }
    }
}
