use crate::error::{ReleaseError, Result};
use crate::host::{BranchRef, CommitRef, NewRelease, ReleaseRef, RepositoryClient, TagRef};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// A merge the mock host performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    pub into: String,
    pub from: CommitRef,
    pub message: String,
    pub merge_commit: CommitRef,
}

#[derive(Debug, Default)]
struct HostState {
    branches: BTreeMap<String, CommitRef>,
    tags: Vec<TagRef>,
    tag_messages: BTreeMap<String, String>,
    commits: BTreeSet<String>,
    releases: Vec<NewRelease>,
    merges: Vec<MergeRecord>,
    conflicting: BTreeSet<String>,
    next_merge: u64,
}

/// Mock repository host for testing without network access
///
/// Branch and tag listings come back in insertion order, like a host API page would.
pub struct MockRepositoryClient {
    state: RefCell<HostState>,
    html_url: String,
}

impl MockRepositoryClient {
    /// Create a new empty mock host
    pub fn new() -> Self {
        MockRepositoryClient {
            state: RefCell::new(HostState::default()),
            html_url: "https://github.com/acme/portal".to_string(),
        }
    }

    /// Add a branch whose tip is `sha`
    pub fn with_branch(self, name: impl Into<String>, sha: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.commits.insert(sha.to_string());
            state.branches.insert(name.into(), CommitRef::new(sha));
        }
        self
    }

    /// Add a tag pointing at `sha`
    pub fn with_tag(self, name: impl Into<String>, sha: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.commits.insert(sha.to_string());
            state.tags.push(TagRef {
                name: name.into(),
                commit: CommitRef::new(sha),
            });
        }
        self
    }

    /// Add a commit that `resolve_commit` will find
    pub fn with_commit(self, sha: &str) -> Self {
        self.state.borrow_mut().commits.insert(sha.to_string());
        self
    }

    /// Make every merge into `branch` fail with a conflict
    pub fn conflict_on_merge_into(self, branch: impl Into<String>) -> Self {
        self.state.borrow_mut().conflicting.insert(branch.into());
        self
    }

    pub fn branch_tip(&self, name: &str) -> Option<CommitRef> {
        self.state.borrow().branches.get(name).cloned()
    }

    pub fn tag(&self, name: &str) -> Option<TagRef> {
        self.state.borrow().tags.iter().find(|t| t.name == name).cloned()
    }

    pub fn tag_message(&self, name: &str) -> Option<String> {
        self.state.borrow().tag_messages.get(name).cloned()
    }

    pub fn releases(&self) -> Vec<NewRelease> {
        self.state.borrow().releases.clone()
    }

    pub fn merges(&self) -> Vec<MergeRecord> {
        self.state.borrow().merges.clone()
    }

    fn insert_tag(state: &mut HostState, name: &str, commit: CommitRef) -> Result<TagRef> {
        if state.tags.iter().any(|t| t.name == name) {
            return Err(ReleaseError::RefExists(name.to_string()));
        }
        let tag = TagRef {
            name: name.to_string(),
            commit,
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }
}

impl Default for MockRepositoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryClient for MockRepositoryClient {
    fn get_branch_tip(&self, name: &str) -> Result<CommitRef> {
        self.branch_tip(name)
            .ok_or_else(|| ReleaseError::api(404, format!("Branch not found: {}", name)))
    }

    fn create_branch(&self, name: &str, from: &CommitRef) -> Result<BranchRef> {
        let mut state = self.state.borrow_mut();
        if state.branches.contains_key(name) {
            return Err(ReleaseError::RefExists(name.to_string()));
        }
        state.branches.insert(name.to_string(), from.clone());
        Ok(BranchRef {
            name: name.to_string(),
            commit: from.clone(),
        })
    }

    fn create_tag(&self, name: &str, message: &str, target: &CommitRef) -> Result<TagRef> {
        let mut state = self.state.borrow_mut();
        let tag = Self::insert_tag(&mut state, name, target.clone())?;
        state.tag_messages.insert(name.to_string(), message.to_string());
        Ok(tag)
    }

    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRef> {
        let mut state = self.state.borrow_mut();
        if state.releases.iter().any(|r| r.tag == release.tag) {
            return Err(ReleaseError::RefExists(release.tag.clone()));
        }

        if !state.tags.iter().any(|t| t.name == release.tag) {
            let commit = state
                .branches
                .get(&release.target)
                .cloned()
                .unwrap_or_else(|| CommitRef::new(release.target.clone()));
            Self::insert_tag(&mut state, &release.tag, commit)?;
        }

        state.releases.push(release.clone());
        Ok(ReleaseRef {
            tag: release.tag.clone(),
            url: format!("{}/releases/tag/{}", self.html_url, release.tag),
        })
    }

    fn list_tags(&self) -> Result<Vec<TagRef>> {
        Ok(self.state.borrow().tags.clone())
    }

    fn list_branches(&self) -> Result<Vec<BranchRef>> {
        Ok(self
            .state
            .borrow()
            .branches
            .iter()
            .map(|(name, commit)| BranchRef {
                name: name.clone(),
                commit: commit.clone(),
            })
            .collect())
    }

    fn merge(&self, into: &str, from: &CommitRef, message: &str) -> Result<Option<CommitRef>> {
        let mut state = self.state.borrow_mut();
        if !state.branches.contains_key(into) {
            return Err(ReleaseError::api(404, format!("Branch not found: {}", into)));
        }
        if state.conflicting.contains(into) {
            return Err(ReleaseError::MergeConflict {
                into: into.to_string(),
                from: from.to_string(),
            });
        }
        if state.branches.get(into) == Some(from) {
            return Ok(None);
        }

        state.next_merge += 1;
        let merge_commit = CommitRef::new(format!("merge-{}", state.next_merge));
        state.commits.insert(merge_commit.to_string());
        state.branches.insert(into.to_string(), merge_commit.clone());
        state.merges.push(MergeRecord {
            into: into.to_string(),
            from: from.clone(),
            message: message.to_string(),
            merge_commit: merge_commit.clone(),
        });
        Ok(Some(merge_commit))
    }

    fn resolve_commit(&self, hash: &str) -> Result<CommitRef> {
        if self.state.borrow().commits.contains(hash) {
            Ok(CommitRef::new(hash))
        } else {
            Err(ReleaseError::CommitNotFound(hash.to_string()))
        }
    }

    fn html_url(&self) -> String {
        self.html_url.clone()
    }
}
