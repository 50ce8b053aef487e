use crate::error::{ReleaseError, Result};
use crate::git::{IsolatedBranch, VcsWorktree};
use crate::host::CommitRef;
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, CherrypickOptions, Cred, CredentialType, ErrorCode, FetchOptions, Oid,
    PushOptions, RemoteCallbacks, Repository, ResetType, Signature,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FALLBACK_NAME: &str = "release-train";
const FALLBACK_EMAIL: &str = "release-train@users.noreply.github.com";

/// Working copy backed by libgit2
///
/// The repository is reopened for every operation, so constructing a worktree never touches
/// the disk and actions that need no cherry-picks never require a checkout.
pub struct Git2Worktree {
    path: PathBuf,
    remote: String,
    token: Option<String>,
    pushed: RefCell<HashSet<String>>,
}

impl Git2Worktree {
    /// Worktree for the repository discovered at `path`, syncing with `remote`
    pub fn new<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Self {
        Git2Worktree {
            path: path.as_ref().to_path_buf(),
            remote: remote.into(),
            token: None,
            pushed: RefCell::new(HashSet::new()),
        }
    }

    /// Authenticate HTTPS fetches and pushes with an access token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::discover(&self.path)?)
    }

    fn remote_callbacks(&self) -> RemoteCallbacks<'static> {
        let token = self.token.clone();
        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |_url, username_from_url, allowed_types| {
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Some(token) = &token {
                    return Cred::userpass_plaintext("x-access-token", token);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) {
                let username = username_from_url.unwrap_or("git");
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let path = home.join(".ssh").join(key);
                        if path.exists() {
                            if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                                return Ok(cred);
                            }
                        }
                    }
                }
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }

            Cred::default()
        });

        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, message
            ))),
            None => Ok(()),
        });

        callbacks
    }

    fn fetch(&self, repo: &Repository) -> Result<()> {
        let mut remote = repo
            .find_remote(&self.remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", self.remote, e)))?;

        let mut options = FetchOptions::new();
        options.remote_callbacks(self.remote_callbacks());

        let refspec = format!("+refs/heads/*:refs/remotes/{}/*", self.remote);
        remote
            .fetch(&[refspec], Some(&mut options), None)
            .map_err(|e| ReleaseError::remote(format!("Fetch from '{}' failed: {}", self.remote, e)))?;
        Ok(())
    }

    fn push_refspec(&self, repo: &Repository, refspec: &str) -> Result<()> {
        let mut remote = repo
            .find_remote(&self.remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", self.remote, e)))?;

        let mut options = PushOptions::new();
        options.remote_callbacks(self.remote_callbacks());

        remote
            .push(&[refspec], Some(&mut options))
            .map_err(|e| ReleaseError::remote(format!("Push of '{}' failed: {}", refspec, e)))?;
        Ok(())
    }

    fn ensure_checked_out(repo: &Repository, branch: &IsolatedBranch) -> Result<()> {
        let head = repo.head()?;
        if head.shorthand() != Some(branch.name.as_str()) {
            return Err(ReleaseError::remote(format!(
                "worktree HEAD is not on isolated branch '{}'",
                branch.name
            )));
        }
        Ok(())
    }

    fn committer(repo: &Repository) -> Result<Signature<'static>> {
        match repo.signature() {
            Ok(signature) => Ok(signature.to_owned()),
            Err(_) => Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?),
        }
    }
}

impl VcsWorktree for Git2Worktree {
    fn create_isolated_branch(&self, name: &str, from_branch: &str) -> Result<IsolatedBranch> {
        let repo = self.open()?;
        self.fetch(&repo)?;

        let tracking = format!("refs/remotes/{}/{}", self.remote, from_branch);
        let base = repo
            .find_reference(&tracking)
            .map_err(|e| ReleaseError::remote(format!("Cannot find '{}': {}", tracking, e)))?
            .peel_to_commit()?;

        match repo.branch(name, &base, false) {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::Exists => {
                return Err(ReleaseError::RefExists(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        repo.set_head(&format!("refs/heads/{}", name))?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

        info!(branch = name, base = %base.id(), "created isolated branch");
        Ok(IsolatedBranch {
            name: name.to_string(),
            base: CommitRef::new(base.id().to_string()),
        })
    }

    fn apply_commit(
        &self,
        branch: &IsolatedBranch,
        commit: &CommitRef,
        mainline: Option<u32>,
    ) -> Result<CommitRef> {
        let repo = self.open()?;
        Self::ensure_checked_out(&repo, branch)?;

        let picked = repo
            .revparse_single(commit.as_str())
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| ReleaseError::CommitNotFound(commit.to_string()))?;

        let mut options = CherrypickOptions::new();
        if let Some(parent) = mainline {
            options.mainline(parent);
        }

        debug!(commit = %picked.id(), ?mainline, branch = %branch.name, "cherry-picking");
        repo.cherrypick(&picked, Some(&mut options))
            .map_err(|e| ReleaseError::ApplyConflict {
                commit: commit.to_string(),
                reason: e.message().to_string(),
            })?;

        let mut index = repo.index()?;
        if index.has_conflicts() {
            return Err(ReleaseError::ApplyConflict {
                commit: commit.to_string(),
                reason: "cherry-pick produced conflicts".to_string(),
            });
        }

        let head = repo.head()?.peel_to_commit()?;
        let tree_id = index.write_tree()?;
        if tree_id == head.tree_id() {
            warn!(commit = %picked.id(), "cherry-pick is empty, commit already present");
            repo.cleanup_state()?;
            return Ok(CommitRef::new(head.id().to_string()));
        }

        let tree = repo.find_tree(tree_id)?;
        let committer = Self::committer(&repo)?;
        let message = picked.message().unwrap_or_default();
        let new_tip = repo.commit(
            Some("HEAD"),
            &picked.author(),
            &committer,
            message,
            &tree,
            &[&head],
        )?;
        repo.cleanup_state()?;

        Ok(CommitRef::new(new_tip.to_string()))
    }

    fn abort_apply(&self, branch: &IsolatedBranch) -> Result<()> {
        let repo = self.open()?;
        Self::ensure_checked_out(&repo, branch)?;

        repo.cleanup_state()?;
        let head = repo.head()?.peel_to_commit()?;
        repo.reset(head.as_object(), ResetType::Hard, None)?;

        debug!(branch = %branch.name, head = %head.id(), "aborted in-progress cherry-pick");
        Ok(())
    }

    fn push(&self, branch: &IsolatedBranch) -> Result<CommitRef> {
        let repo = self.open()?;
        let tip = repo
            .find_branch(&branch.name, BranchType::Local)?
            .get()
            .peel_to_commit()?;

        self.push_refspec(
            &repo,
            &format!("+refs/heads/{0}:refs/heads/{0}", branch.name),
        )?;
        self.pushed.borrow_mut().insert(branch.name.clone());

        info!(branch = %branch.name, tip = %tip.id(), "pushed isolated branch");
        Ok(CommitRef::new(tip.id().to_string()))
    }

    fn discard(&self, branch: &IsolatedBranch) -> Result<()> {
        let repo = self.open()?;
        repo.cleanup_state()?;

        let base = Oid::from_str(branch.base.as_str())?;
        repo.set_head_detached(base)?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

        match repo.find_branch(&branch.name, BranchType::Local) {
            Ok(mut local) => local.delete()?,
            Err(e) if e.code() == ErrorCode::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if self.pushed.borrow_mut().remove(&branch.name) {
            self.push_refspec(&repo, &format!(":refs/heads/{}", branch.name))?;
        }

        info!(branch = %branch.name, "discarded isolated branch");
        Ok(())
    }
}
