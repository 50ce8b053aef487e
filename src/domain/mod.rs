//! Domain logic - naming rules of the release train, independent of any host or git operations

pub mod action;
pub mod branch;
pub mod tag;
pub mod version;

pub use action::ReleaseAction;
pub use branch::ReleaseBranch;
pub use tag::VersionTag;
pub use version::{BumpKind, Version};
