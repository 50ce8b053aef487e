//! Release train workflow orchestration
//!
//! Turns an action request into a [ReleasePlan] using read-only host queries, then executes
//! the plan against the injected collaborators. Splitting the two keeps `--dry-run` honest:
//! a dry run is exactly the plan, with nothing executed.

use std::fmt;

use tracing::info;

use crate::cherry_pick::{candidate_tag_message, AppliedCommit, CherryPickPlanner};
use crate::config::Config;
use crate::domain::{BumpKind, ReleaseAction, ReleaseBranch, VersionTag};
use crate::error::{ReleaseError, Result};
use crate::git::VcsWorktree;
use crate::host::{CommitRef, NewRelease, ReleaseRef, RepositoryClient, TagRef};
use crate::release_log::ReleaseLog;
use crate::train::{self, NextRelease};

pub const TRUNK_MERGE_MESSAGE: &str = "Merge changes from newly created tag to release branch";

/// Settings the controller needs from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainSettings {
    pub release_name: String,
    pub trunk_branch: String,
    /// Body of the bootstrap release
    pub first_release_message: String,
}

impl From<&Config> for TrainSettings {
    fn from(config: &Config) -> Self {
        TrainSettings {
            release_name: config.release_name.trim().to_string(),
            trunk_branch: config.trunk_branch.clone(),
            first_release_message: config.messages.first_release.clone(),
        }
    }
}

/// A validated action and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Create(BumpKind),
    /// Advance the candidate; an empty list tags the trunk tip instead of cherry-picking
    Update { commits: Vec<String> },
    Finalize,
    Hotfix,
}

impl ActionRequest {
    /// Validate raw CI inputs
    ///
    /// `release_version` is only consulted for create, `commits` only for update.
    pub fn from_inputs(
        action: &str,
        release_version: Option<&str>,
        commits: Option<&str>,
    ) -> Result<Self> {
        match action.parse::<ReleaseAction>()? {
            ReleaseAction::Create => Ok(ActionRequest::Create(
                release_version.unwrap_or_default().parse()?,
            )),
            ReleaseAction::Update => Ok(ActionRequest::Update {
                commits: parse_commit_list(commits.unwrap_or_default()),
            }),
            ReleaseAction::Finalize => Ok(ActionRequest::Finalize),
            ReleaseAction::Hotfix => Ok(ActionRequest::Hotfix),
        }
    }

    pub fn action(&self) -> ReleaseAction {
        match self {
            ActionRequest::Create(_) => ReleaseAction::Create,
            ActionRequest::Update { .. } => ReleaseAction::Update,
            ActionRequest::Finalize => ReleaseAction::Finalize,
            ActionRequest::Hotfix => ReleaseAction::Hotfix,
        }
    }
}

/// Split a comma separated list of commit hashes, dropping blanks
pub fn parse_commit_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|hash| !hash.is_empty())
        .map(String::from)
        .collect()
}

/// Where the commits of a new candidate come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Tag the trunk tip and merge it into the release branch
    Trunk(CommitRef),
    /// Fold these commits into the release branch
    CherryPick(Vec<String>),
}

/// Everything an action will do, computed without mutating anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleasePlan {
    Bootstrap {
        next: NextRelease,
        trunk_tip: CommitRef,
    },
    Create {
        previous: VersionTag,
        next: NextRelease,
        trunk_tip: CommitRef,
    },
    Update {
        previous: VersionTag,
        tag: VersionTag,
        release_branch: ReleaseBranch,
        source: CandidateSource,
    },
    Finalize {
        candidate: VersionTag,
        release: VersionTag,
        target: CommitRef,
    },
    Hotfix,
}

impl fmt::Display for ReleasePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleasePlan::Bootstrap { next, trunk_tip } => {
                writeln!(f, "First release of the train")?;
                writeln!(f, "  create branch {} at {}", next.branch, trunk_tip)?;
                write!(f, "  publish release {}", next.tag)
            }
            ReleasePlan::Create {
                previous,
                next,
                trunk_tip,
            } => {
                writeln!(f, "New version after {}", previous)?;
                writeln!(f, "  create branch {} at {}", next.branch, trunk_tip)?;
                write!(f, "  publish release {}", next.tag)
            }
            ReleasePlan::Update {
                previous,
                tag,
                release_branch,
                source,
            } => {
                writeln!(f, "Next candidate after {}", previous)?;
                match source {
                    CandidateSource::Trunk(tip) => {
                        writeln!(f, "  tag {} at trunk tip {}", tag, tip)?;
                    }
                    CandidateSource::CherryPick(commits) => {
                        writeln!(f, "  cherry-pick {}", commits.join(", "))?;
                        writeln!(f, "  tag {} on the cherry-picked commits", tag)?;
                    }
                }
                write!(f, "  merge {} into {}", tag, release_branch)
            }
            ReleasePlan::Finalize {
                candidate,
                release,
                target,
            } => {
                writeln!(f, "Finalize {}", candidate)?;
                write!(f, "  publish release {} at {}", release, target)
            }
            ReleasePlan::Hotfix => write!(f, "Hotfix is reserved, nothing to do"),
        }
    }
}

/// What an executed action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Released(ReleaseRef),
    Advanced {
        tag: TagRef,
        compare_url: String,
        applied: Vec<AppliedCommit>,
        merge_commit: Option<CommitRef>,
    },
    Skipped,
}

/// Runs the four release train actions against injected collaborators
pub struct ReleaseTrainController<'a> {
    client: &'a dyn RepositoryClient,
    worktree: &'a dyn VcsWorktree,
    log: &'a dyn ReleaseLog,
    settings: TrainSettings,
}

impl<'a> ReleaseTrainController<'a> {
    pub fn new(
        client: &'a dyn RepositoryClient,
        worktree: &'a dyn VcsWorktree,
        log: &'a dyn ReleaseLog,
        settings: TrainSettings,
    ) -> Self {
        ReleaseTrainController {
            client,
            worktree,
            log,
            settings,
        }
    }

    pub fn settings(&self) -> &TrainSettings {
        &self.settings
    }

    /// Record the start of an action in the release log
    pub fn start(&self, action: ReleaseAction) -> Result<()> {
        info!(%action, release = %self.settings.release_name, "starting release train");
        self.log.append_line(&format!(
            "🏁 Started release train using release action: {} 🏁",
            action
        ))
    }

    /// Start, plan and execute `request`
    pub fn run(&self, request: &ActionRequest) -> Result<ActionOutcome> {
        self.start(request.action())?;
        let plan = self.plan(request)?;
        self.execute(plan)
    }

    /// Work out what `request` would do; only reads from the host
    pub fn plan(&self, request: &ActionRequest) -> Result<ReleasePlan> {
        match request {
            ActionRequest::Create(kind) => self.plan_create(*kind),
            ActionRequest::Update { commits } => self.plan_update(commits),
            ActionRequest::Finalize => self.plan_finalize(),
            ActionRequest::Hotfix => Ok(ReleasePlan::Hotfix),
        }
    }

    fn name(&self) -> &str {
        &self.settings.release_name
    }

    fn trunk_tip(&self) -> Result<CommitRef> {
        self.client.get_branch_tip(&self.settings.trunk_branch)
    }

    /// Latest candidate of the train together with the tag it came from
    ///
    /// The latest version is chosen first, then the highest `-rcN` within it.
    fn latest_candidate(&self, tags: &[TagRef]) -> Option<(VersionTag, TagRef)> {
        let names = tags.iter().map(|t| t.name.as_str());
        let latest = train::find_latest_matching_tag(self.name(), names.clone())?;
        let candidate =
            train::find_latest_candidate_of(self.name(), latest.version, names).unwrap_or(latest);

        // Match on the parsed form, listed names may carry leading zeros like `-rc01`.
        tags.iter()
            .find(|t| VersionTag::parse(&t.name).map_or(false, |parsed| parsed == candidate))
            .map(|t| (candidate, t.clone()))
    }

    fn require_latest_candidate(&self, tags: &[TagRef]) -> Result<(VersionTag, TagRef)> {
        self.latest_candidate(tags)
            .ok_or_else(|| ReleaseError::NoReleaseTag {
                release_name: self.name().to_string(),
            })
    }

    fn plan_create(&self, kind: BumpKind) -> Result<ReleasePlan> {
        let tags = self.client.list_tags()?;
        let latest = train::find_latest_matching_tag(self.name(), tags.iter().map(|t| &t.name));
        let trunk_tip = self.trunk_tip()?;

        Ok(match latest {
            None => {
                info!(release = %self.name(), "no release candidate tags yet, bootstrapping");
                ReleasePlan::Bootstrap {
                    next: train::bootstrap(self.name()),
                    trunk_tip,
                }
            }
            Some(previous) => ReleasePlan::Create {
                next: train::next_from_bump(&previous, kind, self.name())?,
                previous,
                trunk_tip,
            },
        })
    }

    fn plan_update(&self, commits: &[String]) -> Result<ReleasePlan> {
        let tags = self.client.list_tags()?;
        let (previous, _) = self.require_latest_candidate(&tags)?;
        let tag = train::next_candidate(&previous)?;

        let branches = self.client.list_branches()?;
        let release_branch =
            train::find_latest_matching_branch(self.name(), branches.iter().map(|b| &b.name))?;

        let source = if commits.is_empty() {
            CandidateSource::Trunk(self.trunk_tip()?)
        } else {
            CandidateSource::CherryPick(commits.to_vec())
        };

        Ok(ReleasePlan::Update {
            previous,
            tag,
            release_branch,
            source,
        })
    }

    fn plan_finalize(&self) -> Result<ReleasePlan> {
        let tags = self.client.list_tags()?;
        let (candidate, tag_ref) = self.require_latest_candidate(&tags)?;
        let release = train::finalize(&candidate)?;

        Ok(ReleasePlan::Finalize {
            candidate,
            release,
            target: tag_ref.commit,
        })
    }

    /// Carry out a plan
    pub fn execute(&self, plan: ReleasePlan) -> Result<ActionOutcome> {
        match plan {
            ReleasePlan::Bootstrap { next, trunk_tip } => {
                self.open_version(&next, &trunk_tip, &self.settings.first_release_message)
            }
            ReleasePlan::Create {
                next, trunk_tip, ..
            } => self.open_version(&next, &trunk_tip, ""),
            ReleasePlan::Update {
                previous,
                tag,
                release_branch,
                source,
            } => self.advance(&previous, &tag, &release_branch, source),
            ReleasePlan::Finalize {
                release, target, ..
            } => {
                let published = self.client.create_release(&NewRelease {
                    tag: release.render(),
                    title: release.render(),
                    body: String::new(),
                    draft: false,
                    target: target.to_string(),
                    generate_notes: true,
                })?;
                self.log_release_notes(&published)?;
                Ok(ActionOutcome::Released(published))
            }
            ReleasePlan::Hotfix => {
                info!("hotfix action is reserved");
                self.log.append_line("🚧 Hotfix is reserved and not implemented yet 🚧")?;
                Ok(ActionOutcome::Skipped)
            }
        }
    }

    /// Cut the release branch from the trunk and publish the first candidate of a version
    fn open_version(
        &self,
        next: &NextRelease,
        trunk_tip: &CommitRef,
        body: &str,
    ) -> Result<ActionOutcome> {
        let branch = next.branch.name();
        self.client
            .create_branch(&branch, trunk_tip)
            .map_err(|e| match e {
                ReleaseError::RefExists(_) => e,
                other => ReleaseError::remote(format!(
                    "Failed to create new branch {}: {}",
                    branch, other
                )),
            })?;
        info!(%branch, commit = %trunk_tip, "created release branch");

        let published = self.client.create_release(&NewRelease {
            tag: next.tag.render(),
            title: next.tag.render(),
            body: body.to_string(),
            draft: false,
            target: branch,
            generate_notes: true,
        })?;
        self.log_release_notes(&published)?;
        Ok(ActionOutcome::Released(published))
    }

    fn advance(
        &self,
        previous: &VersionTag,
        tag: &VersionTag,
        release_branch: &ReleaseBranch,
        source: CandidateSource,
    ) -> Result<ActionOutcome> {
        let branch = release_branch.name();

        let (tag_ref, applied, merge_commit) = match source {
            CandidateSource::Trunk(tip) => {
                let tag_ref =
                    self.client
                        .create_tag(&tag.render(), &candidate_tag_message(tag), &tip)?;
                let merge_commit = self
                    .client
                    .merge(&branch, &tag_ref.commit, TRUNK_MERGE_MESSAGE)?;
                (tag_ref, Vec::new(), merge_commit)
            }
            CandidateSource::CherryPick(commits) => {
                let mut planner = CherryPickPlanner::new(self.client, self.worktree);
                let outcome = planner.run(&branch, tag, &commits)?;
                (outcome.tag, outcome.applied, outcome.merge_commit)
            }
        };
        info!(tag = %tag_ref.name, %branch, "advanced release candidate");

        let compare_url = format!(
            "{}/compare/{}...{}",
            self.client.html_url(),
            previous,
            tag
        );
        self.log
            .append_line(&format!("🔗 **Tag Comparison:** {}", compare_url))?;

        Ok(ActionOutcome::Advanced {
            tag: tag_ref,
            compare_url,
            applied,
            merge_commit,
        })
    }

    fn log_release_notes(&self, release: &ReleaseRef) -> Result<()> {
        info!(tag = %release.tag, url = %release.url, "published release");
        self.log.append_line(&format!(
            "📝 **Release Notes can be found here:** {}",
            release.url
        ))
    }
}
