//! Artifact Resolver Library
//!
//! Resolves an artifact coordinate (`group:name:version`) into its complete
//! transitive dependency set against maven2-layout repositories and a local
//! on-disk repository, including:
//! - Coordinate parsing
//! - Ordered, deduplicated remote repository registration
//! - Resolution sessions bound to a local repository
//! - POM descriptor reading (parents, properties, dependency management)
//! - Nearest-wins graph collection and artifact download
//! - Pre-order artifact listing and classpath generation

pub mod config;
pub mod connector;
pub mod coordinate;
pub mod descriptor;
pub mod engine;
pub mod graph;
pub mod local;
pub mod repository;
pub mod resolver;
pub mod result;
pub mod session;
pub mod transport;

pub use config::{ConfigError, ResolverConfig, SeparatorSetting};
pub use coordinate::{ArtifactCoordinate, CoordinateParseError, Dependency, Exclusion};
pub use descriptor::{ArtifactDescriptor, DescriptorError, ManagedDependency};
pub use engine::{
    ArtifactFailure, ArtifactFailureCause, ArtifactResolver, CollectRequest, CollectionError,
    DefaultArtifactResolver, DefaultGraphCollector, DependencyRequest, Engine, GraphCollector,
    ResolutionError,
};
pub use graph::DependencyNode;
pub use local::{InvalidLocalRepositoryError, LocalRepositoryError, LocalRepositoryManager};
pub use repository::{RemoteRepository, RepositoryRegistry};
pub use resolver::{DependencyResolver, ResolveError};
pub use result::{ClasspathSeparator, ResolutionResult, ResolvedArtifact};
pub use session::{ResolutionSession, SessionOptions};
pub use transport::{HttpSettings, TransportError};
