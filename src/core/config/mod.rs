//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! The first existing file wins:
//! 1. `--config <path>` (must exist)
//! 2. `$DOCTRACE_CONFIG`
//! 3. `./doctrace.toml`
//! 4. `$XDG_CONFIG_HOME/doctrace/config.toml`
//! 5. `~/.doctrace/config.toml`
//!
//! With no file present every setting takes its default.
//!
//! # Secrets
//!
//! Credentials never live in the file. They are read from the environment
//! into [`Secrets`]: `GITHUB_WEBHOOK_SECRET`, `GITHUB_TOKEN`, `GROQ_API_KEY`.
//!
//! # Example
//!
//! ```no_run
//! use doctrace::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("integration branch: {}", config.integration_branch());
//! println!("changelog: {}", config.changelog_path());
//! ```

pub mod schema;

pub use schema::{
    AutomationConfig, FileConfig, ForgeConfig, GeneratorConfig, RepositoryConfig, ServerConfig,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOCTRACE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
    path: Option<PathBuf>,
}

impl Config {
    pub const DEFAULT_BIND: &'static str = "0.0.0.0:8000";
    pub const DEFAULT_MARKERS: [&'static str; 2] = ["chore(changelog)", "docs(auto)"];

    /// Load configuration from `explicit` or the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is missing, or if a found file cannot
    /// be parsed or fails validation. Absent default locations are not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Self { file, path: None })
    }

    /// Candidate locations, highest precedence first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("doctrace.toml"));
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("doctrace/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".doctrace/config.toml"));
        }
        paths
    }

    /// Path of the file this configuration came from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    pub fn bind(&self) -> &str {
        self.file
            .server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(Self::DEFAULT_BIND)
    }

    fn repository(&self) -> Option<&RepositoryConfig> {
        self.file.repository.as_ref()
    }

    /// Local repository path; `None` means the working directory.
    pub fn repository_path(&self) -> Option<&Path> {
        self.repository()
            .and_then(|r| r.path.as_deref())
            .map(Path::new)
    }

    /// Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.repository()
            .and_then(|r| r.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Defaults to "main".
    pub fn integration_branch(&self) -> &str {
        self.repository()
            .and_then(|r| r.integration_branch.as_deref())
            .unwrap_or("main")
    }

    /// Defaults to "CHANGELOG.md".
    pub fn changelog_path(&self) -> &str {
        self.repository()
            .and_then(|r| r.changelog_path.as_deref())
            .unwrap_or("CHANGELOG.md")
    }

    /// Defaults to "changelog/".
    pub fn branch_prefix(&self) -> &str {
        self.repository()
            .and_then(|r| r.branch_prefix.as_deref())
            .unwrap_or("changelog/")
    }

    /// Defaults to `true`.
    pub fn fetch_before_diff(&self) -> bool {
        self.repository()
            .and_then(|r| r.fetch_before_diff)
            .unwrap_or(true)
    }

    /// Commit-message prefixes of automation commits.
    pub fn markers(&self) -> Vec<String> {
        self.file
            .automation
            .as_ref()
            .and_then(|a| a.markers.clone())
            .unwrap_or_else(|| Self::DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect())
    }

    pub fn author_name(&self) -> &str {
        self.file
            .automation
            .as_ref()
            .and_then(|a| a.author_name.as_deref())
            .unwrap_or("doctrace")
    }

    pub fn author_email(&self) -> &str {
        self.file
            .automation
            .as_ref()
            .and_then(|a| a.author_email.as_deref())
            .unwrap_or("doctrace@users.noreply.github.com")
    }

    pub fn generator_api_base(&self) -> &str {
        self.file
            .generator
            .as_ref()
            .and_then(|g| g.api_base.as_deref())
            .unwrap_or("https://api.groq.com/openai/v1")
    }

    pub fn generator_model(&self) -> &str {
        self.file
            .generator
            .as_ref()
            .and_then(|g| g.model.as_deref())
            .unwrap_or("llama-3.3-70b-versatile")
    }

    /// Defaults to 60 seconds.
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(
            self.file
                .generator
                .as_ref()
                .and_then(|g| g.timeout_secs)
                .unwrap_or(60),
        )
    }

    /// Defaults to 60 000 characters.
    pub fn max_diff_chars(&self) -> usize {
        self.file
            .generator
            .as_ref()
            .and_then(|g| g.max_diff_chars)
            .unwrap_or(60_000)
    }

    pub fn forge_api_base(&self) -> &str {
        self.file
            .forge
            .as_ref()
            .and_then(|f| f.api_base.as_deref())
            .unwrap_or("https://api.github.com")
    }

    /// Configured `(owner, repo)`, when both are set.
    pub fn forge_repo(&self) -> Option<(&str, &str)> {
        let forge = self.file.forge.as_ref()?;
        Some((forge.owner.as_deref()?, forge.repo.as_deref()?))
    }

    /// Defaults to 30 seconds.
    pub fn forge_timeout(&self) -> Duration {
        Duration::from_secs(
            self.file
                .forge
                .as_ref()
                .and_then(|f| f.timeout_secs)
                .unwrap_or(30),
        )
    }
}

/// Credentials taken from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub webhook_secret: Option<String>,
    pub github_token: Option<String>,
    pub generator_api_key: Option<String>,
}

impl Secrets {
    pub const WEBHOOK_SECRET_ENV: &'static str = "GITHUB_WEBHOOK_SECRET";
    pub const GITHUB_TOKEN_ENV: &'static str = "GITHUB_TOKEN";
    pub const GENERATOR_KEY_ENV: &'static str = "GROQ_API_KEY";

    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            webhook_secret: read(Self::WEBHOOK_SECRET_ENV),
            github_token: read(Self::GITHUB_TOKEN_ENV),
            generator_api_key: read(Self::GENERATOR_KEY_ENV),
        }
    }

    /// The webhook secret, or an error naming the variable.
    pub fn require_webhook_secret(&self) -> Result<&str, ConfigError> {
        self.webhook_secret
            .as_deref()
            .ok_or(ConfigError::Missing(Self::WEBHOOK_SECRET_ENV))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("webhook_secret", &mask(&self.webhook_secret))
            .field("github_token", &mask(&self.github_token))
            .field("generator_api_key", &mask(&self.generator_api_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.bind(), "0.0.0.0:8000");
        assert_eq!(config.remote(), "origin");
        assert_eq!(config.integration_branch(), "main");
        assert_eq!(config.changelog_path(), "CHANGELOG.md");
        assert_eq!(config.branch_prefix(), "changelog/");
        assert!(config.fetch_before_diff());
        assert_eq!(config.markers(), vec!["chore(changelog)", "docs(auto)"]);
        assert_eq!(config.generator_model(), "llama-3.3-70b-versatile");
        assert_eq!(config.generator_timeout(), Duration::from_secs(60));
        assert_eq!(config.forge_timeout(), Duration::from_secs(30));
        assert!(config.forge_repo().is_none());
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doctrace.toml");
        fs::write(
            &path,
            r#"
            [repository]
            integration_branch = "develop"
            fetch_before_diff = false

            [forge]
            owner = "acme"
            repo = "app"
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.integration_branch(), "develop");
        assert!(!config.fetch_before_diff());
        assert_eq!(config.forge_repo(), Some(("acme", "app")));
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[repository\n").unwrap();

        match Config::load_from(&path) {
            Err(ConfigError::ParseError { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_values_rejected() {
        let result = Config::from_toml("[repository]\nintegration_branch = \"a..b\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn env_path_takes_precedence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env.toml");
        std::env::set_var(CONFIG_ENV, &path);
        let paths = Config::search_paths();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(paths[0], path);
        assert_eq!(paths[1], PathBuf::from("doctrace.toml"));
    }

    #[test]
    fn secrets_debug_is_masked() {
        let secrets = Secrets {
            webhook_secret: Some("hunter2".into()),
            ..Default::default()
        };
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<set>"));
        assert!(secrets.require_webhook_secret().is_ok());
        assert!(matches!(
            Secrets::default().require_webhook_secret(),
            Err(ConfigError::Missing(_))
        ));
    }
}
