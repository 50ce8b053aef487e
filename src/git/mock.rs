use crate::error::{ReleaseError, Result};
use crate::git::{IsolatedBranch, VcsWorktree};
use crate::host::CommitRef;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// How a commit behaves when the mock cherry-picks it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickBehavior {
    /// Applies directly
    Clean,
    /// Merge commit: only applies with a mainline parent
    MergeCommit,
    /// Never applies
    Conflict,
}

/// One operation the mock worktree was asked to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorktreeOp {
    Create { name: String, from: String },
    Apply { commit: String, mainline: Option<u32> },
    Abort,
    Push { name: String },
    Discard { name: String },
}

#[derive(Debug, Default)]
struct MockBranch {
    base: String,
    applied: Vec<String>,
    pending: Option<String>,
}

#[derive(Debug, Default)]
struct WorktreeState {
    branches: BTreeMap<String, MockBranch>,
    pushed: BTreeMap<String, CommitRef>,
    ops: Vec<WorktreeOp>,
}

/// Mock working copy for testing without a git repository
///
/// Commits are clean unless configured otherwise. The tip of an isolated branch is a
/// synthetic sha derived from the branch name and the commits applied to it.
pub struct MockWorktree {
    behaviors: HashMap<String, PickBehavior>,
    fail_push: bool,
    state: RefCell<WorktreeState>,
}

impl MockWorktree {
    /// Create a mock where every commit applies cleanly
    pub fn new() -> Self {
        MockWorktree {
            behaviors: HashMap::new(),
            fail_push: false,
            state: RefCell::new(WorktreeState::default()),
        }
    }

    /// Configure how `commit` behaves when picked
    pub fn with_behavior(mut self, commit: &str, behavior: PickBehavior) -> Self {
        self.behaviors.insert(commit.to_string(), behavior);
        self
    }

    /// Make every push fail
    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Commits currently applied to the isolated branch `name`, or `None` when it does not exist
    pub fn applied(&self, name: &str) -> Option<Vec<String>> {
        self.state.borrow().branches.get(name).map(|b| b.applied.clone())
    }

    /// Whether the isolated branch `name` still exists
    pub fn has_branch(&self, name: &str) -> bool {
        self.state.borrow().branches.contains_key(name)
    }

    /// Whether `name` is currently published on the remote
    pub fn is_pushed(&self, name: &str) -> bool {
        self.state.borrow().pushed.contains_key(name)
    }

    /// Every operation performed, in order
    pub fn ops(&self) -> Vec<WorktreeOp> {
        self.state.borrow().ops.clone()
    }

    fn tip_of(name: &str, branch: &MockBranch) -> CommitRef {
        if branch.applied.is_empty() {
            CommitRef::new(branch.base.clone())
        } else {
            CommitRef::new(format!("{}+{}", name, branch.applied.join("+")))
        }
    }
}

impl Default for MockWorktree {
    fn default() -> Self {
        Self::new()
    }
}

impl VcsWorktree for MockWorktree {
    fn create_isolated_branch(&self, name: &str, from_branch: &str) -> Result<IsolatedBranch> {
        let mut state = self.state.borrow_mut();
        state.ops.push(WorktreeOp::Create {
            name: name.to_string(),
            from: from_branch.to_string(),
        });
        if state.branches.contains_key(name) {
            return Err(ReleaseError::RefExists(name.to_string()));
        }

        let base = format!("{}@tip", from_branch);
        state.branches.insert(
            name.to_string(),
            MockBranch {
                base: base.clone(),
                ..MockBranch::default()
            },
        );
        Ok(IsolatedBranch {
            name: name.to_string(),
            base: CommitRef::new(base),
        })
    }

    fn apply_commit(
        &self,
        branch: &IsolatedBranch,
        commit: &CommitRef,
        mainline: Option<u32>,
    ) -> Result<CommitRef> {
        let mut state = self.state.borrow_mut();
        state.ops.push(WorktreeOp::Apply {
            commit: commit.to_string(),
            mainline,
        });

        let behavior = self
            .behaviors
            .get(commit.as_str())
            .copied()
            .unwrap_or(PickBehavior::Clean);
        let target = state
            .branches
            .get_mut(&branch.name)
            .ok_or_else(|| ReleaseError::remote(format!("no isolated branch '{}'", branch.name)))?;

        if let Some(pending) = &target.pending {
            return Err(ReleaseError::ApplyConflict {
                commit: commit.to_string(),
                reason: format!("cherry-pick of {} still in progress", pending),
            });
        }

        let applies = match behavior {
            PickBehavior::Clean => mainline.is_none(),
            PickBehavior::MergeCommit => mainline.is_some(),
            PickBehavior::Conflict => false,
        };

        if !applies {
            target.pending = Some(commit.to_string());
            let reason = match (behavior, mainline) {
                (PickBehavior::MergeCommit, None) => "commit is a merge but no mainline was given",
                (PickBehavior::Clean, Some(_)) => "mainline was given but commit is not a merge",
                _ => "conflict",
            };
            return Err(ReleaseError::ApplyConflict {
                commit: commit.to_string(),
                reason: reason.to_string(),
            });
        }

        target.applied.push(commit.to_string());
        Ok(Self::tip_of(&branch.name, target))
    }

    fn abort_apply(&self, branch: &IsolatedBranch) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(WorktreeOp::Abort);
        if let Some(target) = state.branches.get_mut(&branch.name) {
            target.pending = None;
        }
        Ok(())
    }

    fn push(&self, branch: &IsolatedBranch) -> Result<CommitRef> {
        let mut state = self.state.borrow_mut();
        state.ops.push(WorktreeOp::Push {
            name: branch.name.clone(),
        });
        if self.fail_push {
            return Err(ReleaseError::remote(format!("push of '{}' rejected", branch.name)));
        }

        let tip = state
            .branches
            .get(&branch.name)
            .map(|b| Self::tip_of(&branch.name, b))
            .ok_or_else(|| ReleaseError::remote(format!("no isolated branch '{}'", branch.name)))?;
        state.pushed.insert(branch.name.clone(), tip.clone());
        Ok(tip)
    }

    fn discard(&self, branch: &IsolatedBranch) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(WorktreeOp::Discard {
            name: branch.name.clone(),
        });
        state.branches.remove(&branch.name);
        state.pushed.remove(&branch.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pick() {
        let worktree = MockWorktree::new();
        let branch = worktree
            .create_isolated_branch("temp", "release/portal/v1.0.0")
            .unwrap();

        let tip = worktree
            .apply_commit(&branch, &CommitRef::new("aaa"), None)
            .unwrap();
        assert_eq!(tip, CommitRef::new("temp+aaa"));
        assert_eq!(worktree.applied("temp"), Some(vec!["aaa".to_string()]));
    }

    #[test]
    fn test_merge_commit_needs_mainline() {
        let worktree = MockWorktree::new().with_behavior("mmm", PickBehavior::MergeCommit);
        let branch = worktree.create_isolated_branch("temp", "release").unwrap();

        assert!(worktree
            .apply_commit(&branch, &CommitRef::new("mmm"), None)
            .is_err());
        worktree.abort_apply(&branch).unwrap();
        assert!(worktree
            .apply_commit(&branch, &CommitRef::new("mmm"), Some(1))
            .is_ok());
    }

    #[test]
    fn test_pending_pick_blocks_next_pick() {
        let worktree = MockWorktree::new().with_behavior("bad", PickBehavior::Conflict);
        let branch = worktree.create_isolated_branch("temp", "release").unwrap();

        assert!(worktree.apply_commit(&branch, &CommitRef::new("bad"), None).is_err());
        assert!(worktree.apply_commit(&branch, &CommitRef::new("ok"), None).is_err());
    }

    #[test]
    fn test_discard_removes_branch() {
        let worktree = MockWorktree::new();
        let branch = worktree.create_isolated_branch("temp", "release").unwrap();
        worktree.push(&branch).unwrap();
        assert!(worktree.is_pushed("temp"));

        worktree.discard(&branch).unwrap();
        assert!(!worktree.has_branch("temp"));
        assert!(!worktree.is_pushed("temp"));
    }

    #[test]
    fn test_duplicate_isolated_branch() {
        let worktree = MockWorktree::new();
        worktree.create_isolated_branch("temp", "release").unwrap();
        assert!(matches!(
            worktree.create_isolated_branch("temp", "release"),
            Err(ReleaseError::RefExists(_))
        ));
    }
}
