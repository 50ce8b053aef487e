use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// The four verbs of the release train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    Create,
    Update,
    Finalize,
    Hotfix,
}

impl FromStr for ReleaseAction {
    type Err = ReleaseError;

    /// Accepts the CI dropdown labels ("Create release") and the bare verbs ("create").
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "create release" | "create" => Ok(ReleaseAction::Create),
            "update release" | "update" => Ok(ReleaseAction::Update),
            "finalize release" | "finalize" => Ok(ReleaseAction::Finalize),
            "hotfix" => Ok(ReleaseAction::Hotfix),
            _ => Err(ReleaseError::UnknownAction(s.to_string())),
        }
    }
}

impl fmt::Display for ReleaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseAction::Create => write!(f, "Create release"),
            ReleaseAction::Update => write!(f, "Update release"),
            ReleaseAction::Finalize => write!(f, "Finalize release"),
            ReleaseAction::Hotfix => write!(f, "Hotfix"),
        }
    }
}
