use crate::domain::branch::ReleaseBranch;
use crate::domain::version::Version;
use crate::error::{ParseError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const CANDIDATE_MARKER: &str = "-rc";

fn tag_grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Regex::new(r"^(?P<name>[^/\s]+(?:/[^/\s]+)*)/v(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+)$")
            .expect("tag grammar is a valid regex")
    })
}

fn digit_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"\d+").expect("digit run is a valid regex"))
}

/// A release-train tag: `{release_name}/v{major}.{minor}.{patch}[-rc{candidate}]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag {
    pub release_name: String,
    pub version: Version,
    pub candidate: Option<u64>,
}

impl VersionTag {
    /// Create a tag from its parts
    pub fn new(release_name: impl Into<String>, version: Version, candidate: Option<u64>) -> Self {
        VersionTag {
            release_name: release_name.into(),
            version,
            candidate,
        }
    }

    /// First release candidate of `version`
    pub fn first_candidate(release_name: impl Into<String>, version: Version) -> Self {
        VersionTag::new(release_name, version, Some(1))
    }

    /// Parse a tag string against the strict grammar
    ///
    /// The `-rc` marker is only looked for in the version segment (after the last `/`),
    /// so release names that happen to contain `-rc` still parse.
    pub fn parse(tag: &str) -> std::result::Result<Self, ParseError> {
        let version_start = tag.rfind('/').map(|i| i + 1).unwrap_or(0);

        let (base, candidate) = match tag[version_start..].rfind(CANDIDATE_MARKER) {
            Some(offset) => {
                let marker = version_start + offset;
                let suffix = &tag[marker + CANDIDATE_MARKER.len()..];
                if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ParseError::MalformedCandidateSuffix(tag.to_string()));
                }
                let candidate = suffix
                    .parse::<u64>()
                    .map_err(|_| ParseError::MalformedCandidateSuffix(tag.to_string()))?;
                (&tag[..marker], Some(candidate))
            }
            None => (tag, None),
        };

        let captures = match tag_grammar().captures(base) {
            Some(captures) => captures,
            None => {
                return Err(if digit_runs().find_iter(base).count() < 3 {
                    ParseError::InsufficientNumericComponents(tag.to_string())
                } else {
                    ParseError::InvalidFormat(tag.to_string())
                });
            }
        };

        let component = |name: &str| -> std::result::Result<u64, ParseError> {
            captures[name]
                .parse::<u64>()
                .map_err(|_| ParseError::InvalidFormat(tag.to_string()))
        };

        Ok(VersionTag {
            release_name: captures["name"].to_string(),
            version: Version::new(component("major")?, component("minor")?, component("patch")?),
            candidate,
        })
    }

    /// Whether this tag carries an `-rcN` suffix
    pub fn is_candidate(&self) -> bool {
        self.candidate.is_some()
    }

    /// The release branch this tag belongs to
    pub fn branch(&self) -> ReleaseBranch {
        ReleaseBranch::new(self.release_name.clone(), self.version)
    }

    /// Render the tag name
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}", self.release_name, self.version)?;
        if let Some(candidate) = self.candidate {
            write!(f, "{}{}", CANDIDATE_MARKER, candidate)?;
        }
        Ok(())
    }
}

impl FromStr for VersionTag {
    type Err = crate::error::ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(VersionTag::parse(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidate_tag() {
        let tag = VersionTag::parse("portal/v2.5.1-rc3").unwrap();
        assert_eq!(tag.release_name, "portal");
        assert_eq!(tag.version, Version::new(2, 5, 1));
        assert_eq!(tag.candidate, Some(3));
        assert!(tag.is_candidate());
    }

    #[test]
    fn test_parse_final_tag() {
        let tag = VersionTag::parse("portal/v1.0.0").unwrap();
        assert_eq!(tag.version, Version::new(1, 0, 0));
        assert_eq!(tag.candidate, None);
    }

    #[test]
    fn test_render_round_trip() {
        for raw in [
            "portal/v1.0.0",
            "portal/v1.0.0-rc1",
            "portal/v100.20.3-rc9000",
            "team/api/v0.1.0-rc1",
            "my-rcapp/v3.0.0",
        ] {
            assert_eq!(VersionTag::parse(raw).unwrap().render(), raw);
        }
    }

    #[test]
    fn test_parse_rejects_missing_components() {
        assert_eq!(
            VersionTag::parse("portal/v1.0"),
            Err(ParseError::InsufficientNumericComponents("portal/v1.0".into()))
        );
        assert_eq!(
            VersionTag::parse("portal/RC_test"),
            Err(ParseError::InsufficientNumericComponents("portal/RC_test".into()))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_candidate() {
        for raw in ["portal/v1.0.0-rc", "portal/v1.0.0-rcX", "portal/v1.0.0-rc1a"] {
            assert_eq!(
                VersionTag::parse(raw),
                Err(ParseError::MalformedCandidateSuffix(raw.into()))
            );
        }
    }

    #[test]
    fn test_parse_rejects_loose_numeric_text() {
        assert_eq!(
            VersionTag::parse("build-1-2-3"),
            Err(ParseError::InvalidFormat("build-1-2-3".into()))
        );
        assert_eq!(
            VersionTag::parse("v1.0.0"),
            Err(ParseError::InvalidFormat("v1.0.0".into()))
        );
        assert!(VersionTag::parse("portal/v1.0.0.4").is_err());
    }

    #[test]
    fn test_branch_drops_candidate() {
        let tag = VersionTag::parse("portal/v2.0.0-rc4").unwrap();
        assert_eq!(tag.branch().to_string(), "release/portal/v2.0.0");
    }
}
