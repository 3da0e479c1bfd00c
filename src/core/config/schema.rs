//! core::config::schema
//!
//! TOML schema for `doctrace.toml`.
//!
//! Every field is optional; [`super::Config`] accessors supply defaults.
//! Unknown keys are rejected so typos surface at startup instead of being
//! silently ignored.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [repository]
//! path = "/srv/checkouts/app"
//! remote = "origin"
//! integration_branch = "main"
//! changelog_path = "CHANGELOG.md"
//! branch_prefix = "changelog/"
//! fetch_before_diff = true
//!
//! [automation]
//! markers = ["chore(changelog)", "docs(auto)"]
//! author_name = "doctrace"
//! author_email = "doctrace@users.noreply.github.com"
//!
//! [generator]
//! api_base = "https://api.groq.com/openai/v1"
//! model = "llama-3.3-70b-versatile"
//! timeout_secs = 60
//! max_diff_chars = 60000
//!
//! [forge]
//! api_base = "https://api.github.com"
//! owner = "acme"
//! repo = "app"
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<ServerConfig>,
    pub repository: Option<RepositoryConfig>,
    pub automation: Option<AutomationConfig>,
    pub generator: Option<GeneratorConfig>,
    pub forge: Option<ForgeConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            if let Some(bind) = &server.bind {
                bind.parse::<std::net::SocketAddr>().map_err(|e| {
                    ConfigError::InvalidValue(format!("server.bind '{bind}': {e}"))
                })?;
            }
        }
        if let Some(repo) = &self.repository {
            repo.validate()?;
        }
        if let Some(automation) = &self.automation {
            if let Some(markers) = &automation.markers {
                if markers.iter().any(|m| m.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue(
                        "automation.markers cannot contain empty strings".into(),
                    ));
                }
            }
        }
        if let Some(generator) = &self.generator {
            non_zero("generator.timeout_secs", generator.timeout_secs)?;
            if generator.max_diff_chars == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "generator.max_diff_chars must be positive".into(),
                ));
            }
        }
        if let Some(forge) = &self.forge {
            non_zero("forge.timeout_secs", forge.timeout_secs)?;
        }
        Ok(())
    }
}

fn non_zero(key: &str, value: Option<u64>) -> Result<(), ConfigError> {
    if value == Some(0) {
        return Err(ConfigError::InvalidValue(format!("{key} must be positive")));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: Option<String>,
}

/// Which repository to maintain and how.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Local clone used for diffing and committing.
    pub path: Option<String>,
    pub remote: Option<String>,
    /// Branch whose pushes produce changelog entries.
    pub integration_branch: Option<String>,
    /// Changelog location relative to the repository root.
    pub changelog_path: Option<String>,
    /// Namespace of the automation branches.
    pub branch_prefix: Option<String>,
    /// Fetch from the remote before resolving pushed commits.
    pub fetch_before_diff: Option<bool>,
}

impl RepositoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.integration_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("repository.integration_branch: {e}"))
            })?;
        }
        if let Some(prefix) = &self.branch_prefix {
            // The prefix must form a valid branch once a suffix is appended.
            BranchName::new(format!("{prefix}x")).map_err(|e| {
                ConfigError::InvalidValue(format!("repository.branch_prefix: {e}"))
            })?;
        }
        if let Some(remote) = &self.remote {
            if remote.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "repository.remote cannot be empty".into(),
                ));
            }
        }
        if let Some(path) = &self.changelog_path {
            let p = std::path::Path::new(path);
            if path.is_empty() || p.is_absolute() || p.components().any(|c| c.as_os_str() == "..") {
                return Err(ConfigError::InvalidValue(format!(
                    "repository.changelog_path '{path}' must be a relative path inside the repository"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AutomationConfig {
    /// Commit-message prefixes identifying the service's own commits.
    pub markers: Option<Vec<String>>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

/// Chat-completions endpoint used to write entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_diff_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    pub api_base: Option<String>,
    /// Override owner (otherwise parsed from the remote URL).
    pub owner: Option<String>,
    /// Override repository name.
    pub repo: Option<String>,
    pub timeout_secs: Option<u64>,
}
