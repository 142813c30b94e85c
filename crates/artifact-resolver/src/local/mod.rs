//! Local repository (on-disk artifact cache)
//!
//! Artifacts are stored under the local root using the same maven2 layout as
//! remote repositories:
//!
//! ```text
//! <root>/
//! ├── org/example/lib/1.0/
//! │   ├── lib-1.0.pom
//! │   ├── lib-1.0.jar
//! │   └── lib-1.0.jar.meta.json
//! └── .tmp/
//! ```

mod metadata;

pub use metadata::{ArtifactMetadata, MetadataError, METADATA_SUFFIX};

use crate::connector::layout_path;
use crate::coordinate::ArtifactCoordinate;
use crate::transport::compute_checksum;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Directory (under the local root) used for in-progress writes
const TMP_DIR: &str = ".tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The path cannot be used as a local repository root
#[derive(Debug, Error)]
pub enum InvalidLocalRepositoryError {
    /// Empty path
    #[error("Local repository path is empty")]
    EmptyPath,

    /// Path exists but is not a directory
    #[error("Local repository path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Path could not be inspected
    #[error("Cannot access local repository {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No path was given and no home directory could be determined
    #[error("Could not determine home directory for the default local repository")]
    NoHomeDirectory,
}

/// Errors that can occur while writing to the local repository
#[derive(Debug, Error)]
pub enum LocalRepositoryError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Metadata sidecar error
    #[error("Metadata error: {0}")]
    MetadataError(#[from] MetadataError),
}

/// Addresses artifacts in a local repository directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepositoryManager {
    root: PathBuf,
}

impl LocalRepositoryManager {
    /// Bind a manager to `root`
    ///
    /// The directory does not need to exist yet; it is created on the first
    /// install. An existing path that is not a directory is rejected.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, InvalidLocalRepositoryError> {
        let root = root.into();

        if root.as_os_str().is_empty() {
            return Err(InvalidLocalRepositoryError::EmptyPath);
        }

        match fs::metadata(&root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(InvalidLocalRepositoryError::NotADirectory(root));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(InvalidLocalRepositoryError::Inaccessible { path: root, source });
            }
        }

        Ok(Self { root })
    }

    /// `~/.m2/repository`
    pub fn default_location() -> Result<PathBuf, InvalidLocalRepositoryError> {
        let home = dirs::home_dir().ok_or(InvalidLocalRepositoryError::NoHomeDirectory)?;
        Ok(home.join(".m2").join("repository"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an artifact occupies (whether or not it is present)
    pub fn path_of(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root.join(layout_path(coordinate))
    }

    /// Path of an artifact if it is installed
    pub fn find(&self, coordinate: &ArtifactCoordinate) -> Option<PathBuf> {
        let path = self.path_of(coordinate);
        path.is_file().then_some(path)
    }

    /// Path of an installed artifact whose contents still match its sidecar
    ///
    /// A file that no longer hashes to the recorded checksum is reported as
    /// absent so it gets fetched again. A file without a sidecar is trusted;
    /// an unreadable or unparseable sidecar is logged and the file is kept.
    pub fn find_verified(&self, coordinate: &ArtifactCoordinate) -> Option<PathBuf> {
        let path = self.find(coordinate)?;

        let metadata = match ArtifactMetadata::load(&Self::metadata_path(&path)) {
            Ok(metadata) => metadata,
            Err(MetadataError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Some(path);
            }
            Err(e) => {
                warn!(artifact = %coordinate, error = %e, "ignoring unreadable metadata sidecar");
                return Some(path);
            }
        };

        match fs::read(&path) {
            Ok(bytes) if compute_checksum(&bytes) == metadata.checksum => Some(path),
            Ok(_) => {
                warn!(
                    artifact = %coordinate,
                    path = %path.display(),
                    "local file does not match its recorded checksum"
                );
                None
            }
            Err(e) => {
                warn!(artifact = %coordinate, error = %e, "cannot read local file");
                None
            }
        }
    }

    /// Read an installed artifact
    pub fn read(&self, coordinate: &ArtifactCoordinate) -> Result<Option<Vec<u8>>, std::io::Error> {
        match self.find(coordinate) {
            Some(path) => fs::read(path).map(Some),
            None => Ok(None),
        }
    }

    /// Install artifact bytes fetched from `repository_id`
    ///
    /// The file is written to a temporary location and renamed into place so
    /// readers never observe a partial artifact. A metadata sidecar recording
    /// the repository and checksum is written next to it.
    ///
    /// # Arguments
    /// * `coordinate` - Artifact being installed
    /// * `bytes` - Artifact contents
    /// * `repository_id` - Id of the repository the bytes came from
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Final path of the artifact
    /// * `Err(LocalRepositoryError)` - Writing the file or its sidecar failed
    ///
    /// # Example
    /// ```no_run
    /// # use artifact_resolver::{ArtifactCoordinate, LocalRepositoryManager};
    /// let local = LocalRepositoryManager::new("/tmp/m2")?;
    /// let coord = ArtifactCoordinate::new("org.example", "lib", "1.0");
    /// let path = local.install(&coord, b"jar bytes", "central")?;
    /// assert_eq!(local.find(&coord), Some(path));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn install(
        &self,
        coordinate: &ArtifactCoordinate,
        bytes: &[u8],
        repository_id: &str,
    ) -> Result<PathBuf, LocalRepositoryError> {
        let final_path = self.path_of(coordinate);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_dir = self.root.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir)?;
        let tmp_path = tmp_dir.join(format!(
            "{}.{}-{}.tmp",
            coordinate.file_name(),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let mut tmp_file = fs::File::create(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        fs::rename(&tmp_path, &final_path)?;

        let metadata = ArtifactMetadata::new(
            coordinate.to_string(),
            repository_id.to_string(),
            compute_checksum(bytes),
        );
        metadata.save(&Self::metadata_path(&final_path))?;

        debug!(artifact = %coordinate, path = %final_path.display(), "installed");
        Ok(final_path)
    }

    /// Load the metadata sidecar of an installed artifact
    pub fn load_metadata(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<ArtifactMetadata, MetadataError> {
        ArtifactMetadata::load(&Self::metadata_path(&self.path_of(coordinate)))
    }

    fn metadata_path(artifact_path: &Path) -> PathBuf {
        let mut name = artifact_path.as_os_str().to_owned();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }
}
