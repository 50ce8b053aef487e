use crate::domain::{BumpKind, ReleaseBranch, Version, VersionTag};
use crate::error::{ReleaseError, Result};

/// Tag and branch that open a new version of the train
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextRelease {
    pub tag: VersionTag,
    pub branch: ReleaseBranch,
}

impl NextRelease {
    fn first_candidate(release_name: &str, version: Version) -> Self {
        let tag = VersionTag::first_candidate(release_name, version);
        let branch = tag.branch();
        NextRelease { tag, branch }
    }
}

/// Tag and branch of the very first release of a train: `v0.1.0-rc1`
pub fn bootstrap(release_name: &str) -> NextRelease {
    NextRelease::first_candidate(release_name, Version::initial())
}

/// Open the next major or minor version after `latest`
///
/// The new tag always starts at `-rc1` and the branch carries the same triple.
pub fn next_from_bump(
    latest: &VersionTag,
    kind: BumpKind,
    release_name: &str,
) -> Result<NextRelease> {
    let version = latest
        .version
        .bump(kind)
        .map_err(|_| ReleaseError::VersionOverflow(latest.render()))?;
    Ok(NextRelease::first_candidate(release_name, version))
}

/// Advance `latest` by exactly one release candidate
pub fn next_candidate(latest: &VersionTag) -> Result<VersionTag> {
    match latest.candidate {
        Some(candidate) => Ok(VersionTag {
            candidate: Some(
                candidate
                    .checked_add(1)
                    .ok_or_else(|| ReleaseError::VersionOverflow(latest.render()))?,
            ),
            ..latest.clone()
        }),
        None => Err(ReleaseError::NotAReleaseCandidate(latest.render())),
    }
}

/// Drop the `-rcN` suffix, turning a candidate into the shipped release tag
pub fn finalize(latest: &VersionTag) -> Result<VersionTag> {
    if !latest.is_candidate() {
        return Err(ReleaseError::NotAReleaseCandidate(latest.render()));
    }

    Ok(VersionTag {
        candidate: None,
        ..latest.clone()
    })
}
