//! Resolution sessions
//!
//! A session binds one local repository to the fixed set of transports used
//! to reach remote repositories. Sessions are immutable; changing the local
//! repository means building a new session.

use crate::connector::{is_supported_layout, RepositoryConnector};
use crate::local::{InvalidLocalRepositoryError, LocalRepositoryManager};
use crate::repository::RemoteRepository;
use crate::transport::{
    FileTransporterFactory, HttpSettings, HttpTransporterFactory, TransportError,
    TransporterFactory,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Engine settings carried by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// HTTP timeouts
    pub http: HttpSettings,

    /// Treat a missing descriptor of a transitive dependency as "no
    /// dependencies" instead of failing collection
    pub ignore_missing_descriptors: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            ignore_missing_descriptors: true,
        }
    }
}

/// Local repository plus transport configuration for one resolution context
pub struct ResolutionSession {
    local: LocalRepositoryManager,
    factories: Vec<Box<dyn TransporterFactory>>,
    options: SessionOptions,
}

impl ResolutionSession {
    /// Build a session bound to `local_repository`
    pub fn new(
        local_repository: impl Into<PathBuf>,
        options: SessionOptions,
    ) -> Result<Self, InvalidLocalRepositoryError> {
        let local = LocalRepositoryManager::new(local_repository)?;

        let factories: Vec<Box<dyn TransporterFactory>> = vec![
            Box::new(FileTransporterFactory),
            Box::new(HttpTransporterFactory::new(options.http)),
        ];

        debug!(
            local_repository = %local.root().display(),
            transports = ?factories.iter().map(|f| f.name()).collect::<Vec<_>>(),
            "session created"
        );

        Ok(Self {
            local,
            factories,
            options,
        })
    }

    pub fn local_repository(&self) -> &LocalRepositoryManager {
        &self.local
    }

    pub fn local_repository_location(&self) -> &Path {
        self.local.root()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Open a connector to `repository` using the first transport that
    /// supports its URL
    pub fn connector_for(
        &self,
        repository: &RemoteRepository,
    ) -> Result<RepositoryConnector, TransportError> {
        let no_transporter = || TransportError::NoTransporter {
            repository: repository.id.clone(),
            url: repository.url.clone(),
        };

        if !is_supported_layout(&repository.layout) {
            return Err(no_transporter());
        }

        let factory = self
            .factories
            .iter()
            .find(|f| f.supports(repository))
            .ok_or_else(no_transporter)?;

        let transporter = factory.new_transporter(repository)?;
        Ok(RepositoryConnector::new(repository.clone(), transporter))
    }
}

impl fmt::Debug for ResolutionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("local", &self.local)
            .field(
                "factories",
                &self.factories.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_connector_selection() {
        let dir = TempDir::new().unwrap();
        let session = ResolutionSession::new(dir.path(), SessionOptions::default()).unwrap();

        let file_repo = RemoteRepository::with_default_layout(
            "local",
            url::Url::from_directory_path(dir.path()).unwrap().as_str(),
        );
        assert!(session.connector_for(&file_repo).is_ok());

        let ftp = RemoteRepository::with_default_layout("ftp", "ftp://repo.example.org");
        assert!(matches!(
            session.connector_for(&ftp),
            Err(TransportError::NoTransporter { .. })
        ));

        let legacy = RemoteRepository::new("legacy", "legacy", "https://repo.example.org");
        assert!(matches!(
            session.connector_for(&legacy),
            Err(TransportError::NoTransporter { .. })
        ));
    }

    #[test]
    fn test_invalid_location() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();

        assert!(ResolutionSession::new(&file, SessionOptions::default()).is_err());
    }
}
