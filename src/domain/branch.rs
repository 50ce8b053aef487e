use crate::domain::version::Version;
use regex::Regex;
use std::fmt;

const RELEASE_PREFIX: &str = "release";

/// A release branch: `release/{release_name}/v{major}.{minor}.{patch}`
///
/// Branches never carry a release candidate suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseBranch {
    pub release_name: String,
    pub version: Version,
}

impl ReleaseBranch {
    /// Create a release branch name for a version
    pub fn new(release_name: impl Into<String>, version: Version) -> Self {
        ReleaseBranch {
            release_name: release_name.into(),
            version,
        }
    }

    /// Recognize a branch name as a release branch of `release_name`
    ///
    /// Only exact `release/{release_name}/vX.Y.Z` names match.
    pub fn recognize(release_name: &str, branch_name: &str) -> Option<Self> {
        BranchMatcher::new(release_name).matches(branch_name)
    }

    /// Render the branch name
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReleaseBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/v{}", RELEASE_PREFIX, self.release_name, self.version)
    }
}

/// Compiled release-branch pattern for one release name
#[derive(Debug, Clone)]
pub struct BranchMatcher {
    release_name: String,
    pattern: Regex,
}

impl BranchMatcher {
    pub fn new(release_name: &str) -> Self {
        let pattern = Regex::new(&format!(
            r"^{}/{}/v(\d+)\.(\d+)\.(\d+)$",
            RELEASE_PREFIX,
            regex::escape(release_name)
        ))
        .expect("escaped release name always forms a valid regex");

        BranchMatcher {
            release_name: release_name.to_string(),
            pattern,
        }
    }

    pub fn matches(&self, branch_name: &str) -> Option<ReleaseBranch> {
        let captures = self.pattern.captures(branch_name)?;

        let major = captures[1].parse().ok()?;
        let minor = captures[2].parse().ok()?;
        let patch = captures[3].parse().ok()?;

        Some(ReleaseBranch::new(
            self.release_name.clone(),
            Version::new(major, minor, patch),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let branch = ReleaseBranch::new("portal", Version::new(1, 1, 0));
        assert_eq!(branch.name(), "release/portal/v1.1.0");
    }

    #[test]
    fn test_recognize_release_branch() {
        let branch = ReleaseBranch::recognize("portal", "release/portal/v100.2.0").unwrap();
        assert_eq!(branch.version, Version::new(100, 2, 0));
    }

    #[test]
    fn test_recognize_rejects_other_names() {
        assert!(ReleaseBranch::recognize("portal", "release/other/v1.0.0").is_none());
        assert!(ReleaseBranch::recognize("portal", "feature/portal/new-feature").is_none());
        assert!(ReleaseBranch::recognize("portal", "release/portal/v1.0.0-rc1").is_none());
        assert!(ReleaseBranch::recognize("portal", "release/portal/v1.0").is_none());
        assert!(ReleaseBranch::recognize("portal", "xrelease/portal/v1.0.0").is_none());
    }

    #[test]
    fn test_recognize_escapes_release_name() {
        assert!(ReleaseBranch::recognize("a.b", "release/axb/v1.0.0").is_none());
        assert!(ReleaseBranch::recognize("a.b", "release/a.b/v1.0.0").is_some());
    }
}
