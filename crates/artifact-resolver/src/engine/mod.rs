//! Resolution engine
//!
//! Collection (building the dependency tree from descriptors) and artifact
//! resolution (materializing every node's file locally) sit behind the
//! [`GraphCollector`] and [`ArtifactResolver`] traits so alternative
//! strategies or test doubles can be plugged into a
//! [`DependencyResolver`](crate::DependencyResolver).

mod collect;
mod remote;
mod resolve;

pub use collect::{derive_scope, DefaultGraphCollector};
pub use resolve::DefaultArtifactResolver;

use crate::coordinate::{ArtifactCoordinate, Dependency};
use crate::descriptor::DescriptorError;
use crate::graph::DependencyNode;
use crate::local::LocalRepositoryError;
use crate::repository::RemoteRepository;
use crate::session::ResolutionSession;
use crate::transport::TransportError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Request to collect the dependency tree below `root`
#[derive(Debug, Clone, PartialEq)]
pub struct CollectRequest {
    pub root: Dependency,
    pub repositories: Vec<RemoteRepository>,
}

/// Request to materialize every artifact of a collected tree
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRequest {
    pub root: DependencyNode,
    pub repositories: Vec<RemoteRepository>,
}

/// Errors that can occur while collecting a dependency graph
#[derive(Debug, Error)]
pub enum CollectionError {
    /// No repository (nor the local repository) holds the artifact
    #[error("Artifact {artifact} not found in local repository or {repositories:?}")]
    ArtifactNotFound {
        artifact: String,
        repositories: Vec<String>,
    },

    /// A repository could not be reached while looking up the artifact
    #[error("Failed to collect {artifact}: {source}")]
    RepositoryUnreachable {
        artifact: String,
        #[source]
        source: TransportError,
    },

    /// The artifact's descriptor could not be interpreted
    #[error("Invalid descriptor for {artifact}: {source}")]
    InvalidDescriptor {
        artifact: String,
        #[source]
        source: DescriptorError,
    },

    /// Version ranges are not supported
    #[error("Cannot satisfy version range {range} of {artifact}")]
    UnsupportedVersionRange { artifact: String, range: String },
}

impl CollectionError {
    /// Coordinate string of the artifact that failed
    pub fn artifact(&self) -> &str {
        match self {
            Self::ArtifactNotFound { artifact, .. }
            | Self::RepositoryUnreachable { artifact, .. }
            | Self::InvalidDescriptor { artifact, .. }
            | Self::UnsupportedVersionRange { artifact, .. } => artifact,
        }
    }
}

/// Why a single artifact could not be materialized
#[derive(Debug, Error)]
pub enum ArtifactFailureCause {
    #[error("not found in local repository or {repositories:?}")]
    NotFound { repositories: Vec<String> },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Install(#[from] LocalRepositoryError),
}

/// One artifact that could not be materialized
#[derive(Debug)]
pub struct ArtifactFailure {
    pub artifact: ArtifactCoordinate,
    pub cause: ArtifactFailureCause,
}

impl fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artifact, self.cause)
    }
}

/// One or more artifacts of a collected graph could not be materialized
#[derive(Debug, Error)]
#[error("Could not resolve {} artifact(s): {}", .failures.len(), summarize(.failures))]
pub struct ResolutionError {
    pub failures: Vec<ArtifactFailure>,
}

impl ResolutionError {
    /// Coordinates of every failed node, in tree order
    pub fn failed_artifacts(&self) -> impl Iterator<Item = &ArtifactCoordinate> {
        self.failures.iter().map(|f| &f.artifact)
    }
}

fn summarize(failures: &[ArtifactFailure]) -> String {
    failures
        .iter()
        .map(ArtifactFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builds the conflict-resolved dependency tree of a root dependency
pub trait GraphCollector: Send + Sync {
    fn collect_dependencies(
        &self,
        session: &ResolutionSession,
        request: &CollectRequest,
    ) -> Result<DependencyNode, CollectionError>;
}

/// Ensures every node of a collected tree has a local file
pub trait ArtifactResolver: Send + Sync {
    fn resolve_dependencies(
        &self,
        session: &ResolutionSession,
        request: DependencyRequest,
    ) -> Result<DependencyNode, ResolutionError>;
}

/// A collector/resolver pair
#[derive(Clone)]
pub struct Engine {
    pub collector: Arc<dyn GraphCollector>,
    pub resolver: Arc<dyn ArtifactResolver>,
}

impl Engine {
    pub fn new(collector: Arc<dyn GraphCollector>, resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            collector,
            resolver,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultGraphCollector),
            Arc::new(DefaultArtifactResolver),
        )
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
