use thiserror::Error;

/// Reasons a tag string is rejected by the release-train grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("tag '{0}' does not contain major.minor.patch")]
    InsufficientNumericComponents(String),

    #[error("tag '{0}' has a malformed release candidate suffix, expected -rcN")]
    MalformedCandidateSuffix(String),

    #[error("tag '{0}' does not match <name>/v<major>.<minor>.<patch>[-rc<n>]")]
    InvalidFormat(String),
}

/// Unified error type for release-train operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Unparseable tag: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid release version '{0}', expected Major or Minor")]
    InvalidBumpKind(String),

    #[error("Unrecognized release action '{0}'")]
    UnknownAction(String),

    #[error("Tag '{0}' is not a release candidate, expected a -rcN suffix")]
    NotAReleaseCandidate(String),

    #[error("Cannot advance '{0}', a version component would overflow")]
    VersionOverflow(String),

    #[error("No release candidate tags found for release '{release_name}', create a release first")]
    NoReleaseTag { release_name: String },

    #[error("No release branches found for release '{release_name}'")]
    NoBranchesFound { release_name: String },

    #[error("Reference already exists: {0}")]
    RefExists(String),

    #[error("Merge of '{from}' into '{into}' has conflicts and needs manual resolution")]
    MergeConflict { into: String, from: String },

    #[error("Invalid commit hashes provided: {}", .0.join(", "))]
    InvalidCommitReferences(Vec<String>),

    #[error("Cherry-pick of commit {commit} failed: {reason}")]
    CherryPickFailed { commit: String, reason: String },

    #[error("Commit {commit} does not apply cleanly: {reason}")]
    ApplyConflict { commit: String, reason: String },

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Repository host returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-train
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// Create an API error from a response status and body
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ReleaseError::Api {
            status,
            message: message.into(),
        }
    }

    /// Input errors reproduce on every attempt and are never worth retrying.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ReleaseError::Parse(_)
                | ReleaseError::InvalidBumpKind(_)
                | ReleaseError::UnknownAction(_)
                | ReleaseError::InvalidCommitReferences(_)
                | ReleaseError::Config(_)
        )
    }
}
