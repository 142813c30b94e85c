//! `file://` repositories

use super::{scheme_of, TransportError, Transporter, TransporterFactory};
use crate::repository::RemoteRepository;
use std::fs;
use std::path::PathBuf;

/// Reads resources from a repository on the local filesystem
#[derive(Debug, Clone)]
pub struct FileTransporter {
    base: PathBuf,
}

impl FileTransporter {
    pub fn new(repository: &RemoteRepository) -> Result<Self, TransportError> {
        let url = url::Url::parse(&repository.url)
            .map_err(|_| TransportError::InvalidUrl(repository.url.clone()))?;
        let base = url
            .to_file_path()
            .map_err(|_| TransportError::InvalidUrl(repository.url.clone()))?;

        Ok(Self { base })
    }
}

impl Transporter for FileTransporter {
    fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.base.is_dir() {
            return Err(TransportError::Unreachable {
                url: self.base.display().to_string(),
                reason: "repository directory does not exist".to_string(),
            });
        }

        let path = self.base.join(resource);
        if !path.is_file() {
            return Ok(None);
        }

        Ok(Some(fs::read(&path)?))
    }
}

/// Factory for `file://` repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransporterFactory;

impl TransporterFactory for FileTransporterFactory {
    fn name(&self) -> &'static str {
        "file"
    }

    fn supports(&self, repository: &RemoteRepository) -> bool {
        scheme_of(&repository.url).as_deref() == Some("file")
    }

    fn new_transporter(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Box<dyn Transporter>, TransportError> {
        Ok(Box::new(FileTransporter::new(repository)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repository_at(dir: &TempDir) -> RemoteRepository {
        let url = url::Url::from_directory_path(dir.path()).unwrap();
        RemoteRepository::with_default_layout("local-test", url.as_str())
    }

    #[test]
    fn test_get_existing_and_missing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("org/example")).unwrap();
        fs::write(dir.path().join("org/example/a.txt"), b"content").unwrap();

        let transporter = FileTransporter::new(&repository_at(&dir)).unwrap();
        assert_eq!(
            transporter.get("org/example/a.txt").unwrap(),
            Some(b"content".to_vec())
        );
        assert_eq!(transporter.get("org/example/b.txt").unwrap(), None);
    }

    #[test]
    fn test_missing_base_is_unreachable() {
        let dir = TempDir::new().unwrap();
        let repository = repository_at(&dir);
        drop(dir);

        let transporter = FileTransporter::new(&repository).unwrap();
        assert!(matches!(
            transporter.get("anything"),
            Err(TransportError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_factory_supports_file_scheme_only() {
        let factory = FileTransporterFactory;
        assert!(factory.supports(&RemoteRepository::with_default_layout("a", "file:///tmp/repo")));
        assert!(!factory.supports(&RemoteRepository::with_default_layout(
            "b",
            "https://repo.example.org"
        )));
    }
}
