pub mod cherry_pick;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod host;
pub mod release_log;
pub mod train;
pub mod ui;

pub use error::{ParseError, ReleaseError, Result};
