//! Resolver configuration (TOML)
//!
//! ```toml
//! local_repository = "/var/cache/artifacts"
//! classpath_separator = "unix"
//! ignore_missing_descriptors = true
//!
//! [http]
//! timeout_secs = 60
//!
//! [[repositories]]
//! id = "central"
//! url = "https://repo.maven.apache.org/maven2/"
//! ```

use crate::connector::is_supported_layout;
use crate::local::{InvalidLocalRepositoryError, LocalRepositoryManager};
use crate::repository::RemoteRepository;
use crate::result::ClasspathSeparator;
use crate::session::SessionOptions;
use crate::transport::HttpSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Classpath separator selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorSetting {
    /// Follow the platform the resolver runs on
    #[default]
    Host,
    Unix,
    Windows,
}

impl SeparatorSetting {
    pub fn separator(self) -> ClasspathSeparator {
        match self {
            Self::Host => ClasspathSeparator::host(),
            Self::Unix => ClasspathSeparator::Unix,
            Self::Windows => ClasspathSeparator::Windows,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Local repository root (defaults to `~/.m2/repository`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<PathBuf>,

    /// Remote repositories, consulted in order
    #[serde(default)]
    pub repositories: Vec<RemoteRepository>,

    #[serde(default)]
    pub classpath_separator: SeparatorSetting,

    #[serde(default = "default_true")]
    pub ignore_missing_descriptors: bool,

    #[serde(default)]
    pub http: HttpSettings,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            local_repository: None,
            repositories: Vec::new(),
            classpath_separator: SeparatorSetting::default(),
            ignore_missing_descriptors: true,
            http: HttpSettings::default(),
        }
    }
}

impl ResolverConfig {
    /// Parse a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ResolverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();

        for repository in &self.repositories {
            if repository.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Repository id cannot be empty".to_string(),
                ));
            }
            if repository.url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Repository {} has an empty url",
                    repository.id
                )));
            }
            if url::Url::parse(&repository.url).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "Repository {} has an invalid url: {}",
                    repository.id, repository.url
                )));
            }
            if !is_supported_layout(&repository.layout) {
                return Err(ConfigError::ValidationError(format!(
                    "Repository {} uses unsupported layout: {}",
                    repository.id, repository.layout
                )));
            }
            if !ids.insert(repository.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate repository id: {}",
                    repository.id
                )));
            }
        }

        if self.http.timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "HTTP timeouts must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured local repository, or the default location
    pub fn local_repository(&self) -> Result<PathBuf, InvalidLocalRepositoryError> {
        match &self.local_repository {
            Some(path) => Ok(path.clone()),
            None => LocalRepositoryManager::default_location(),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            http: self.http,
            ignore_missing_descriptors: self.ignore_missing_descriptors,
        }
    }

    /// Write config to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
