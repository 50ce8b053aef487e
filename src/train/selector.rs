//! Picks the "latest" tag or branch of a release train out of everything the host lists.
//!
//! Ordering is always by the numeric major.minor.patch triple. Lexical ordering would put
//! `v9` above `v100`.

use crate::domain::branch::BranchMatcher;
use crate::domain::{ReleaseBranch, Version, VersionTag};
use crate::error::{ReleaseError, Result};
use tracing::warn;

/// Release-candidate tags belonging to `release_name`, in input order.
///
/// Names that carry the train prefix and an rc marker but fail the strict grammar are
/// skipped with a warning instead of aborting selection.
fn candidate_tags<I, S>(release_name: &str, tag_names: I) -> impl Iterator<Item = VersionTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = format!("{}/", release_name);
    let release_name = release_name.to_string();

    tag_names.into_iter().filter_map(move |name| {
        let name = name.as_ref();
        if !name.starts_with(&prefix) || !name.contains("-rc") {
            return None;
        }
        match VersionTag::parse(name) {
            Ok(tag) if tag.release_name == release_name && tag.is_candidate() => Some(tag),
            Ok(_) => None,
            Err(e) => {
                warn!(tag = name, error = %e, "skipping unparseable release tag");
                None
            }
        }
    })
}

/// Find the release-candidate tag with the highest version triple.
///
/// Only `-rcN` tags take part; finalized tags are ignored. When several candidates share
/// the highest triple the first one listed wins, the candidate number is not consulted.
/// Returns `None` when the train has not been started yet.
pub fn find_latest_matching_tag<I, S>(release_name: &str, tag_names: I) -> Option<VersionTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidate_tags(release_name, tag_names).fold(None, |latest: Option<VersionTag>, tag| match latest {
        Some(current) if tag.version <= current.version => Some(current),
        _ => Some(tag),
    })
}

/// Find the highest `-rcN` already cut for one version of the train.
pub fn find_latest_candidate_of<I, S>(
    release_name: &str,
    version: Version,
    tag_names: I,
) -> Option<VersionTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidate_tags(release_name, tag_names)
        .filter(|tag| tag.version == version)
        .max_by_key(|tag| tag.candidate)
}

/// Find the release branch with the highest version triple.
///
/// A train that has started always has a branch, so an empty match is an error.
pub fn find_latest_matching_branch<I, S>(release_name: &str, branch_names: I) -> Result<ReleaseBranch>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let matcher = BranchMatcher::new(release_name);

    branch_names
        .into_iter()
        .filter_map(|name| matcher.matches(name.as_ref()))
        .max_by_key(|branch| branch.version)
        .ok_or_else(|| ReleaseError::NoBranchesFound {
            release_name: release_name.to_string(),
        })
}
