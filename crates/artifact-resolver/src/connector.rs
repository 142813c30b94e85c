//! Repository connectors
//!
//! A connector maps artifact coordinates onto the maven2 "default" layout and
//! fetches them through a transporter, verifying published checksums.

use crate::coordinate::ArtifactCoordinate;
use crate::repository::{RemoteRepository, DEFAULT_LAYOUT};
use crate::transport::{compute_checksum, TransportError, Transporter};
use tracing::debug;

/// Suffix of the checksum sidecar published next to an artifact
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Relative path of an artifact in the maven2 layout
///
/// `org.example:lib:1.0` maps to `org/example/lib/1.0/lib-1.0.jar`.
pub fn layout_path(coordinate: &ArtifactCoordinate) -> String {
    format!(
        "{}/{}/{}/{}",
        coordinate.group_id().replace('.', "/"),
        coordinate.artifact_id(),
        coordinate.version(),
        coordinate.file_name()
    )
}

/// Whether a layout identifier is understood by this crate
pub fn is_supported_layout(layout: &str) -> bool {
    layout == DEFAULT_LAYOUT
}

/// Fetches artifacts from one remote repository
pub struct RepositoryConnector {
    repository: RemoteRepository,
    transporter: Box<dyn Transporter>,
}

impl RepositoryConnector {
    pub fn new(repository: RemoteRepository, transporter: Box<dyn Transporter>) -> Self {
        Self {
            repository,
            transporter,
        }
    }

    pub fn repository(&self) -> &RemoteRepository {
        &self.repository
    }

    /// Fetch an artifact's bytes
    ///
    /// Returns `Ok(None)` if the repository does not hold the artifact.
    pub fn fetch(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let path = layout_path(coordinate);
        debug!(repository = %self.repository.id, %path, "fetching");

        let Some(bytes) = self.transporter.get(&path)? else {
            return Ok(None);
        };

        let checksum_path = format!("{}{}", path, CHECKSUM_SUFFIX);
        if let Some(published) = self.transporter.get(&checksum_path)? {
            verify_checksum(&path, &bytes, &published)?;
        }

        Ok(Some(bytes))
    }
}

/// Compare bytes against a published sidecar (`<hex> [filename]`)
fn verify_checksum(resource: &str, bytes: &[u8], published: &[u8]) -> Result<(), TransportError> {
    let published = String::from_utf8_lossy(published);
    let expected = published
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let actual = compute_checksum(bytes);

    if expected != actual {
        return Err(TransportError::ChecksumMismatch {
            resource: resource.to_string(),
            expected,
            actual,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapTransporter(HashMap<String, Vec<u8>>);

    impl Transporter for MapTransporter {
        fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(self.0.get(resource).cloned())
        }
    }

    fn connector(entries: &[(&str, &[u8])]) -> RepositoryConnector {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect();
        RepositoryConnector::new(
            RemoteRepository::with_default_layout("test", "file:///unused"),
            Box::new(MapTransporter(map)),
        )
    }

    #[test]
    fn test_layout_path() {
        let coord = ArtifactCoordinate::new("org.example.sub", "lib", "1.0");
        assert_eq!(layout_path(&coord), "org/example/sub/lib/1.0/lib-1.0.jar");
        assert_eq!(
            layout_path(&coord.with_classifier("sources")),
            "org/example/sub/lib/1.0/lib-1.0-sources.jar"
        );
    }

    #[test]
    fn test_fetch_verifies_checksum() {
        let coord = ArtifactCoordinate::new("g", "a", "1");
        let good = format!("{}  a-1.jar", compute_checksum(b"jar"));
        let conn = connector(&[("g/a/1/a-1.jar", b"jar"), ("g/a/1/a-1.jar.sha256", good.as_bytes())]);
        assert_eq!(conn.fetch(&coord).unwrap(), Some(b"jar".to_vec()));

        let conn = connector(&[("g/a/1/a-1.jar", b"jar"), ("g/a/1/a-1.jar.sha256", b"deadbeef")]);
        assert!(matches!(
            conn.fetch(&coord),
            Err(TransportError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_fetch_missing() {
        let conn = connector(&[]);
        assert_eq!(conn.fetch(&ArtifactCoordinate::new("g", "a", "1")).unwrap(), None);
    }
}
