// tests/worktree_test.rs
use git2::{BranchType, Commit, Oid, Repository, RepositoryState, Signature};
use release_train::cherry_pick::{CherryPickPlanner, CherryPickState};
use release_train::domain::{Version, VersionTag};
use release_train::git::{Git2Worktree, VcsWorktree};
use release_train::host::{CommitRef, MockRepositoryClient};
use release_train::ReleaseError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RELEASE_BRANCH: &str = "release/portal/v1.0.0";
const SCRATCH: &str = "temp-portal/v1.0.0-rc2";

/// A working repository with a bare `origin`, holding one release branch and
/// three commits that live elsewhere in history:
///
/// - `fix` adds a new file and picks cleanly
/// - `merge` is a merge commit that only picks against its first parent
/// - `conflict` edits a line the release branch never saw
struct Fixture {
    _dir: TempDir,
    work: PathBuf,
    origin: PathBuf,
    base: Oid,
    fix: Oid,
    merge: Oid,
    conflict: Oid,
}

fn signature() -> Signature<'static> {
    Signature::now("Test", "test@example.com").unwrap()
}

fn commit_file(repo: &Repository, parents: &[&Commit], file: &str, content: &str) -> Oid {
    let blob = repo.blob(content.as_bytes()).unwrap();
    let base_tree = parents.first().map(|c| c.tree().unwrap());
    let mut builder = repo.treebuilder(base_tree.as_ref()).unwrap();
    builder.insert(file, blob, 0o100644).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();
    let sig = signature();
    repo.commit(None, &sig, &sig, &format!("edit {}", file), &tree, parents)
        .unwrap()
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let origin = dir.path().join("origin.git");
    let work = dir.path().join("work");
    Repository::init_bare(&origin).unwrap();
    let repo = Repository::init(&work).unwrap();
    repo.remote("origin", origin.to_str().unwrap()).unwrap();

    let base = commit_file(&repo, &[], "app.txt", "v1\n");
    let base_commit = repo.find_commit(base).unwrap();

    let fix = commit_file(&repo, &[&base_commit], "fix.txt", "fix\n");

    let side = commit_file(&repo, &[&base_commit], "feature.txt", "feature\n");
    let side_commit = repo.find_commit(side).unwrap();
    let merge = commit_file(&repo, &[&base_commit, &side_commit], "feature.txt", "feature\n");

    let bumped = commit_file(&repo, &[&base_commit], "app.txt", "v2\n");
    let bumped_commit = repo.find_commit(bumped).unwrap();
    let conflict = commit_file(&repo, &[&bumped_commit], "app.txt", "v3\n");

    repo.branch(RELEASE_BRANCH, &base_commit, false).unwrap();
    let refspec = format!("refs/heads/{0}:refs/heads/{0}", RELEASE_BRANCH);
    repo.find_remote("origin")
        .unwrap()
        .push(&[refspec.as_str()], None)
        .unwrap();

    Fixture {
        _dir: dir,
        work,
        origin,
        base,
        fix,
        merge,
        conflict,
    }
}

fn client_for(fixture: &Fixture) -> MockRepositoryClient {
    MockRepositoryClient::new()
        .with_branch(RELEASE_BRANCH, &fixture.base.to_string())
        .with_commit(&fixture.fix.to_string())
        .with_commit(&fixture.merge.to_string())
        .with_commit(&fixture.conflict.to_string())
}

fn commit_ref(oid: Oid) -> CommitRef {
    CommitRef::new(oid.to_string())
}

fn has_branch(path: &Path, name: &str) -> bool {
    Repository::open(path)
        .unwrap()
        .find_branch(name, BranchType::Local)
        .is_ok()
}

fn tag() -> VersionTag {
    VersionTag::new("portal", Version::new(1, 0, 0), Some(2))
}

#[test]
fn test_isolated_branch_starts_at_release_tip() {
    let fixture = setup();
    let worktree = Git2Worktree::new(&fixture.work, "origin");

    let branch = worktree
        .create_isolated_branch(SCRATCH, RELEASE_BRANCH)
        .unwrap();

    assert_eq!(branch.base, commit_ref(fixture.base));
    let repo = Repository::open(&fixture.work).unwrap();
    assert_eq!(repo.head().unwrap().shorthand(), Some(SCRATCH));
    assert!(matches!(
        worktree.create_isolated_branch(SCRATCH, RELEASE_BRANCH),
        Err(ReleaseError::RefExists(_))
    ));
}

#[test]
fn test_merge_commit_needs_mainline() {
    let fixture = setup();
    let worktree = Git2Worktree::new(&fixture.work, "origin");
    let branch = worktree
        .create_isolated_branch(SCRATCH, RELEASE_BRANCH)
        .unwrap();

    assert!(matches!(
        worktree.apply_commit(&branch, &commit_ref(fixture.merge), None),
        Err(ReleaseError::ApplyConflict { .. })
    ));
    worktree.abort_apply(&branch).unwrap();

    let tip = worktree
        .apply_commit(&branch, &commit_ref(fixture.merge), Some(1))
        .unwrap();
    assert_ne!(tip, branch.base);
    assert_eq!(
        std::fs::read_to_string(fixture.work.join("feature.txt")).unwrap(),
        "feature\n"
    );
}

#[test]
fn test_abort_leaves_no_trace() {
    let fixture = setup();
    let worktree = Git2Worktree::new(&fixture.work, "origin");
    let branch = worktree
        .create_isolated_branch(SCRATCH, RELEASE_BRANCH)
        .unwrap();

    let after_fix = worktree
        .apply_commit(&branch, &commit_ref(fixture.fix), None)
        .unwrap();
    assert!(worktree
        .apply_commit(&branch, &commit_ref(fixture.conflict), None)
        .is_err());
    worktree.abort_apply(&branch).unwrap();

    let repo = Repository::open(&fixture.work).unwrap();
    assert_eq!(repo.state(), RepositoryState::Clean);
    assert!(!repo.index().unwrap().has_conflicts());
    assert_eq!(
        repo.head().unwrap().target().unwrap().to_string(),
        after_fix.as_str()
    );
    assert_eq!(
        std::fs::read_to_string(fixture.work.join("app.txt")).unwrap(),
        "v1\n"
    );

    worktree.discard(&branch).unwrap();
    assert!(!has_branch(&fixture.work, SCRATCH));
}

#[test]
fn test_unknown_commit() {
    let fixture = setup();
    let worktree = Git2Worktree::new(&fixture.work, "origin");
    let branch = worktree
        .create_isolated_branch(SCRATCH, RELEASE_BRANCH)
        .unwrap();

    assert!(matches!(
        worktree.apply_commit(&branch, &CommitRef::new("0123456789abcdef0123"), None),
        Err(ReleaseError::CommitNotFound(_))
    ));
}

#[test]
fn test_planner_folds_commits_through_real_worktree() {
    let fixture = setup();
    let client = client_for(&fixture);
    let worktree = Git2Worktree::new(&fixture.work, "origin");
    let mut planner = CherryPickPlanner::new(&client, &worktree);

    let commits = vec![fixture.fix.to_string(), fixture.merge.to_string()];
    let outcome = planner.run(RELEASE_BRANCH, &tag(), &commits).unwrap();

    assert_eq!(planner.state(), CherryPickState::Succeeded);
    assert_eq!(outcome.applied[0].mainline, None);
    assert_eq!(outcome.applied[1].mainline, Some(1));

    let repo = Repository::open(&fixture.work).unwrap();
    let tagged = repo
        .find_commit(Oid::from_str(outcome.tag.commit.as_str()).unwrap())
        .unwrap();
    let tree = tagged.tree().unwrap();
    assert!(tree.get_name("fix.txt").is_some());
    assert!(tree.get_name("feature.txt").is_some());
    assert_eq!(tagged.parent_count(), 1);

    assert!(!has_branch(&fixture.work, SCRATCH));
    assert!(!has_branch(&fixture.origin, SCRATCH));
    assert!(client.branch_tip(RELEASE_BRANCH).is_some());
    assert_eq!(client.merges().len(), 1);
}

#[test]
fn test_planner_conflict_leaves_release_branch_unchanged() {
    let fixture = setup();
    let client = client_for(&fixture);
    let worktree = Git2Worktree::new(&fixture.work, "origin");
    let mut planner = CherryPickPlanner::new(&client, &worktree);

    let commits = vec![fixture.fix.to_string(), fixture.conflict.to_string()];
    let err = planner.run(RELEASE_BRANCH, &tag(), &commits).unwrap_err();

    assert!(matches!(err, ReleaseError::CherryPickFailed { .. }));
    assert_eq!(planner.state(), CherryPickState::Aborted);
    assert!(!has_branch(&fixture.work, SCRATCH));
    assert!(!has_branch(&fixture.origin, SCRATCH));
    assert_eq!(client.branch_tip(RELEASE_BRANCH), Some(commit_ref(fixture.base)));

    let origin = Repository::open_bare(&fixture.origin).unwrap();
    let release_tip = origin
        .find_branch(RELEASE_BRANCH, BranchType::Local)
        .unwrap()
        .get()
        .target()
        .unwrap();
    assert_eq!(release_tip, fixture.base);

    let repo = Repository::open(&fixture.work).unwrap();
    assert_eq!(repo.state(), RepositoryState::Clean);
}
