//! Metadata sidecars for locally installed artifacts
//!
//! Records where an artifact came from and what it hashed to when it was
//! installed into the local repository.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Suffix appended to an artifact path to locate its metadata sidecar
pub const METADATA_SUFFIX: &str = ".meta.json";

/// Errors that can occur during metadata operations
#[derive(Debug, Error)]
pub enum MetadataError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Metadata for an installed artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Coordinate string of the artifact
    pub coordinate: String,

    /// Id of the repository the artifact was fetched from
    pub repository: String,

    /// SHA-256 checksum (hex-encoded)
    pub checksum: String,

    /// Timestamp when installed (Unix timestamp)
    pub fetched_at: u64,
}

impl ArtifactMetadata {
    pub fn new(coordinate: String, repository: String, checksum: String) -> Self {
        Self {
            coordinate,
            repository,
            checksum,
            fetched_at: Self::current_timestamp(),
        }
    }

    /// Load metadata from a JSON file
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let contents = fs::read_to_string(path)?;
        let metadata = serde_json::from_str(&contents)?;
        Ok(metadata)
    }

    /// Save metadata to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), MetadataError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn current_timestamp() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}
