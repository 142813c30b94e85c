//! Transports for reading resources out of remote repositories
//!
//! A [`TransporterFactory`] claims repositories by URL scheme and hands out
//! [`Transporter`]s that fetch raw resource bytes by repository-relative path.

mod file;
mod http;

pub use file::{FileTransporter, FileTransporterFactory};
pub use http::{HttpSettings, HttpTransporter, HttpTransporterFactory};

use crate::repository::RemoteRepository;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur while talking to a remote repository
#[derive(Debug, Error)]
pub enum TransportError {
    /// The repository could not be contacted at all
    #[error("Repository {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// Non-success, non-404 HTTP status
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid repository URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No registered factory understands the repository URL
    #[error("No transporter available for repository {repository} ({url})")]
    NoTransporter { repository: String, url: String },

    /// Downloaded bytes do not match the published checksum
    #[error("Checksum mismatch for {resource}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        resource: String,
        expected: String,
        actual: String,
    },
}

/// Reads resources from one remote repository
pub trait Transporter: Send + Sync {
    /// Fetch a resource by repository-relative path
    ///
    /// Returns `Ok(None)` when the repository answered but does not hold the
    /// resource.
    fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Creates transporters for the repositories it supports
pub trait TransporterFactory: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    fn supports(&self, repository: &RemoteRepository) -> bool;

    fn new_transporter(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Box<dyn Transporter>, TransportError>;
}

/// Compute SHA-256 checksum of bytes (hex-encoded)
pub fn compute_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Scheme of a repository URL, lowercased
pub(crate) fn scheme_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .map(|parsed| parsed.scheme().to_ascii_lowercase())
}
