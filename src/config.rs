use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the project-local configuration file
pub const CONFIG_FILE: &str = "release-train.toml";

/// Represents the complete configuration for release-train.
///
/// Names the train, where its trunk lives, how to reach the repository host and the local
/// working copy, and the fixed texts used in releases.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_release_name")]
    pub release_name: String,

    #[serde(default = "default_trunk_branch")]
    pub trunk_branch: String,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub messages: MessagesConfig,
}

fn default_release_name() -> String {
    "portal".to_string()
}

fn default_trunk_branch() -> String {
    "main".to_string()
}

fn default_log_file() -> String {
    "release_log.txt".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_git_path() -> String {
    ".".to_string()
}

fn default_first_release() -> String {
    "🎉 This is the first release! 🎉".to_string()
}

/// Repository host settings.
///
/// The access token is deliberately absent: it is read from `GITHUB_TOKEN` only.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `owner/repo`
    #[serde(default)]
    pub repository: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_url: default_api_url(),
            repository: None,
        }
    }
}

/// Local working copy used for cherry-picks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_git_path")]
    pub path: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            remote: default_remote(),
            path: default_git_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MessagesConfig {
    /// Body of the very first release of a train
    #[serde(default = "default_first_release")]
    pub first_release: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        MessagesConfig {
            first_release: default_first_release(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            release_name: default_release_name(),
            trunk_branch: default_trunk_branch(),
            log_file: default_log_file(),
            github: GitHubConfig::default(),
            git: GitConfig::default(),
            messages: MessagesConfig::default(),
        }
    }
}

impl Config {
    /// Apply `GITHUB_REPOSITORY`, `RELEASE_NAME` and `GITHUB_API_URL` from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(repository) = get("GITHUB_REPOSITORY") {
            self.github.repository = Some(repository);
        }
        if let Some(release_name) = get("RELEASE_NAME") {
            self.release_name = release_name;
        }
        if let Some(api_url) = get("GITHUB_API_URL") {
            self.github.api_url = api_url;
        }
    }

    /// Check the settings every action relies on
    pub fn validate(&self) -> Result<()> {
        let name = self.release_name.trim();
        if name.is_empty() {
            return Err(ReleaseError::config("release_name must not be empty"));
        }
        if name.contains('/') {
            return Err(ReleaseError::config(format!(
                "release_name '{}' must not contain '/'",
                name
            )));
        }
        if self.trunk_branch.trim().is_empty() {
            return Err(ReleaseError::config("trunk_branch must not be empty"));
        }
        Ok(())
    }

    /// The `owner/repo` the host client talks to
    pub fn repository(&self) -> Result<&str> {
        match self.github.repository.as_deref() {
            Some(repository) if repository.contains('/') => Ok(repository),
            Some(repository) => Err(ReleaseError::config(format!(
                "github.repository '{}' must look like owner/repo",
                repository
            ))),
            None => Err(ReleaseError::config(
                "github.repository is not set, use the config file or GITHUB_REPOSITORY",
            )),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release-train.toml` in current directory
/// 3. `.release-train.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// Environment overrides are not applied here; see [Config::apply_env].
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let local = Path::new(".").join(CONFIG_FILE);

    let (source, config_str) = if let Some(path) = config_path {
        (path.to_string(), read(Path::new(path))?)
    } else if local.exists() {
        (local.display().to_string(), read(&local)?)
    } else if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join(format!(".{}", CONFIG_FILE));
        if user_config.exists() {
            (user_config.display().to_string(), read(&user_config)?)
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("Failed to parse {}: {}", source, e)))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| ReleaseError::config(format!("Failed to read {}: {}", path.display(), e)))
}
