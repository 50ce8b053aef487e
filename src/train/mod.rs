//! Version arithmetic of the release train: selecting the latest tag or branch and
//! computing the identifiers that come next.

pub mod increment;
pub mod selector;

pub use increment::{bootstrap, finalize, next_candidate, next_from_bump, NextRelease};
pub use selector::{find_latest_candidate_of, find_latest_matching_branch, find_latest_matching_tag};
