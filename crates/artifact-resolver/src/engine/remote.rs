//! Lookup of artifacts across the local repository and an ordered list of
//! remote repositories.

use super::ArtifactFailureCause;
use crate::connector::RepositoryConnector;
use crate::coordinate::ArtifactCoordinate;
use crate::descriptor::DescriptorSource;
use crate::repository::RemoteRepository;
use crate::session::ResolutionSession;
use crate::transport::TransportError;
use std::path::PathBuf;
use tracing::{debug, warn};

pub(crate) struct RemoteAccess<'s> {
    session: &'s ResolutionSession,
    connectors: Vec<RepositoryConnector>,
}

impl<'s> RemoteAccess<'s> {
    /// Open connectors for every repository, in order
    pub(crate) fn open(
        session: &'s ResolutionSession,
        repositories: &[RemoteRepository],
    ) -> Result<Self, TransportError> {
        let connectors = repositories
            .iter()
            .map(|repository| session.connector_for(repository))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            session,
            connectors,
        })
    }

    pub(crate) fn repository_ids(&self) -> Vec<String> {
        self.connectors
            .iter()
            .map(|c| c.repository().id.clone())
            .collect()
    }

    /// Fetch bytes from the first repository holding the artifact
    ///
    /// Repository failures are skipped while later repositories are tried;
    /// the last failure is reported only if no repository had the artifact.
    fn fetch_remote(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Option<(String, Vec<u8>)>, TransportError> {
        let mut last_error = None;

        for connector in &self.connectors {
            match connector.fetch(coordinate) {
                Ok(Some(bytes)) => return Ok(Some((connector.repository().id.clone(), bytes))),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        artifact = %coordinate,
                        repository = %connector.repository().id,
                        error = %e,
                        "repository lookup failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Local path of the artifact, downloading and installing it if needed
    pub(crate) fn materialize(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<PathBuf, ArtifactFailureCause> {
        let local = self.session.local_repository();
        if let Some(path) = local.find_verified(coordinate) {
            debug!(artifact = %coordinate, "found in local repository");
            return Ok(path);
        }

        let (repository, bytes) =
            self.fetch_remote(coordinate)?
                .ok_or_else(|| ArtifactFailureCause::NotFound {
                    repositories: self.repository_ids(),
                })?;

        Ok(local.install(coordinate, &bytes, &repository)?)
    }
}

impl DescriptorSource for RemoteAccess<'_> {
    fn fetch_descriptor(
        &self,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let local = self.session.local_repository();
        if let Some(bytes) = local.read(coordinate)? {
            return Ok(Some(bytes));
        }

        let Some((repository, bytes)) = self.fetch_remote(coordinate)? else {
            return Ok(None);
        };

        // Caching the descriptor locally is best effort
        if let Err(e) = local.install(coordinate, &bytes, &repository) {
            warn!(artifact = %coordinate, error = %e, "could not cache descriptor");
        }

        Ok(Some(bytes))
    }
}
