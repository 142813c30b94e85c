//! Dependency resolution
//!
//! Drives collection and artifact resolution for a root dependency against
//! the registered repositories and the current local repository.

use crate::config::ResolverConfig;
use crate::coordinate::{ArtifactCoordinate, CoordinateParseError, Dependency};
use crate::engine::{
    ArtifactFailure, ArtifactFailureCause, CollectRequest, CollectionError, DependencyRequest,
    Engine, ResolutionError,
};
use crate::local::InvalidLocalRepositoryError;
use crate::repository::{RemoteRepository, RepositoryRegistry};
use crate::result::{ClasspathSeparator, ResolutionResult, ResolvedArtifact};
use crate::session::{ResolutionSession, SessionOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during dependency resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed coordinate string
    #[error(transparent)]
    CoordinateParse(#[from] CoordinateParseError),

    /// Unusable local repository
    #[error(transparent)]
    InvalidLocalRepository(#[from] InvalidLocalRepositoryError),

    /// Dependency graph could not be collected
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// Artifacts of the collected graph could not be materialized
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Dependency resolver
///
/// Owns the repository registry and the current session. Every `resolve`
/// call collects and resolves from scratch; nothing is cached in memory
/// between calls.
#[derive(Debug)]
pub struct DependencyResolver {
    /// Remote repositories
    registry: RepositoryRegistry,

    /// Current session; replaced whenever the local repository changes
    session: Arc<ResolutionSession>,

    /// Options every rebuilt session starts from
    options: SessionOptions,

    /// Collector and artifact resolver
    engine: Engine,

    /// Separator handed to every result
    separator: ClasspathSeparator,
}

impl DependencyResolver {
    /// Create a resolver bound to a local repository
    pub fn new(local_repository: impl Into<PathBuf>) -> Result<Self, InvalidLocalRepositoryError> {
        Self::with_options(local_repository, SessionOptions::default())
    }

    /// Create a resolver with explicit session options
    pub fn with_options(
        local_repository: impl Into<PathBuf>,
        options: SessionOptions,
    ) -> Result<Self, InvalidLocalRepositoryError> {
        let session = ResolutionSession::new(local_repository, options)?;

        Ok(Self {
            registry: RepositoryRegistry::new(),
            session: Arc::new(session),
            options,
            engine: Engine::default(),
            separator: ClasspathSeparator::host(),
        })
    }

    /// Create a resolver and register `repositories`
    pub fn with_repositories<I>(
        local_repository: impl Into<PathBuf>,
        repositories: I,
    ) -> Result<Self, InvalidLocalRepositoryError>
    where
        I: IntoIterator<Item = RemoteRepository>,
    {
        let mut resolver = Self::new(local_repository)?;
        resolver.add_repositories(repositories);
        Ok(resolver)
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self, InvalidLocalRepositoryError> {
        let mut resolver =
            Self::with_options(config.local_repository()?, config.session_options())?
                .with_separator(config.classpath_separator.separator());
        resolver.add_repositories(config.repositories.iter().cloned());
        Ok(resolver)
    }

    /// Substitute the collector/resolver pair
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Set the classpath separator used by results
    pub fn with_separator(mut self, separator: ClasspathSeparator) -> Self {
        self.separator = separator;
        self
    }

    /// Register a repository; duplicates are ignored
    pub fn add_repository(&mut self, repository: RemoteRepository) {
        if !self.registry.add(repository) {
            debug!("repository already registered");
        }
    }

    /// Register repositories in order; duplicates are ignored
    pub fn add_repositories<I>(&mut self, repositories: I)
    where
        I: IntoIterator<Item = RemoteRepository>,
    {
        self.registry.add_all(repositories);
    }

    pub fn remove_repository(&mut self, repository: &RemoteRepository) {
        self.registry.remove(repository);
    }

    pub fn remove_repositories<'a, I>(&mut self, repositories: I)
    where
        I: IntoIterator<Item = &'a RemoteRepository>,
    {
        self.registry.remove_all(repositories);
    }

    pub fn clear_repositories(&mut self) {
        self.registry.clear();
    }

    pub fn repositories(&self) -> &RepositoryRegistry {
        &self.registry
    }

    /// Switch to another local repository
    ///
    /// A fresh session is built and swapped in only if the path is usable;
    /// on error the current session stays in place.
    pub fn set_local_repository_location(
        &mut self,
        local_repository: impl Into<PathBuf>,
    ) -> Result<(), InvalidLocalRepositoryError> {
        let session = ResolutionSession::new(local_repository, self.options)?;
        self.session = Arc::new(session);
        Ok(())
    }

    pub fn local_repository_location(&self) -> &Path {
        self.session.local_repository_location()
    }

    /// Current session
    pub fn session(&self) -> Arc<ResolutionSession> {
        Arc::clone(&self.session)
    }

    /// Collect and resolve the full dependency tree of `dependency`
    ///
    /// # Arguments
    /// * `dependency` - Root artifact and the scope it is requested in
    ///
    /// # Returns
    /// * `Ok(ResolutionResult)` - Every node of the tree has a local file
    /// * `Err(ResolveError)` - The root coordinate is unusable, or collection
    ///   or artifact resolution failed
    ///
    /// # Example
    /// ```no_run
    /// # use artifact_resolver::{ArtifactCoordinate, Dependency, DependencyResolver, RemoteRepository};
    /// let mut resolver = DependencyResolver::new("/tmp/m2")?;
    /// resolver.add_repository(RemoteRepository::with_default_layout(
    ///     "central",
    ///     "https://repo.maven.apache.org/maven2/",
    /// ));
    /// let root = Dependency::new(ArtifactCoordinate::new("org.example", "app", "1.0"), "runtime");
    /// let result = resolver.resolve(&root)?;
    /// println!("{}", result.class_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn resolve(&self, dependency: &Dependency) -> Result<ResolutionResult, ResolveError> {
        dependency.coordinate().validate()?;
        let session = Arc::clone(&self.session);
        let repositories = self.registry.snapshot();

        info!(
            root = %dependency.coordinate(),
            scope = dependency.scope(),
            repositories = repositories.len(),
            "resolving"
        );

        let collect_request = CollectRequest {
            root: dependency.clone(),
            repositories: repositories.clone(),
        };
        let root = self
            .engine
            .collector
            .collect_dependencies(&session, &collect_request)?;

        let resolved = self.engine.resolver.resolve_dependencies(
            &session,
            DependencyRequest { root, repositories },
        )?;
        ensure_resolved(&resolved)?;

        Ok(ResolutionResult::new(resolved).with_separator(self.separator))
    }

    /// Resolve an artifact with the given scope
    pub fn resolve_artifact(
        &self,
        coordinate: ArtifactCoordinate,
        scope: &str,
    ) -> Result<ResolutionResult, ResolveError> {
        self.resolve(&Dependency::new(coordinate, scope))
    }

    /// Parse `coordinate` and resolve it with the given scope
    ///
    /// # Arguments
    /// * `coordinate` - `group:name[:extension[:classifier]]:version`
    /// * `scope` - Scope of the root dependency
    ///
    /// # Returns
    /// * `Ok(ResolutionResult)` - Resolved tree
    /// * `Err(ResolveError::CoordinateParse)` - Malformed coordinate; nothing
    ///   is collected
    /// * `Err(ResolveError)` - Collection or resolution failed
    ///
    /// # Example
    /// ```no_run
    /// # use artifact_resolver::DependencyResolver;
    /// let resolver = DependencyResolver::new("/tmp/m2")?;
    /// let result = resolver.resolve_coordinate("org.example:app:1.0", "runtime")?;
    /// for artifact in result.artifacts(true) {
    ///     println!("{} {}", artifact.coordinate, artifact.path.display());
    /// }
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn resolve_coordinate(
        &self,
        coordinate: &str,
        scope: &str,
    ) -> Result<ResolutionResult, ResolveError> {
        let coordinate = ArtifactCoordinate::parse(coordinate)?;
        self.resolve_artifact(coordinate, scope)
    }

    /// Transitive dependencies of an artifact, in pre-order
    ///
    /// # Arguments
    /// * `coordinate` - Root artifact
    /// * `scope` - Scope of the root dependency
    ///
    /// # Returns
    /// * `Ok(Vec<ResolvedArtifact>)` - Same as `artifacts(false)` of the
    ///   full result; the root itself is not listed
    /// * `Err(ResolveError)` - Resolution failed
    ///
    /// # Example
    /// ```no_run
    /// # use artifact_resolver::{ArtifactCoordinate, DependencyResolver};
    /// let resolver = DependencyResolver::new("/tmp/m2")?;
    /// let deps = resolver.resolve_artifacts(ArtifactCoordinate::new("org.example", "app", "1.0"), "compile")?;
    /// assert!(deps.iter().all(|a| a.path.is_file()));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn resolve_artifacts(
        &self,
        coordinate: ArtifactCoordinate,
        scope: &str,
    ) -> Result<Vec<ResolvedArtifact>, ResolveError> {
        Ok(self.resolve_artifact(coordinate, scope)?.artifacts(false).to_vec())
    }

    /// Transitive dependencies of a coordinate string, in pre-order
    pub fn resolve_coordinate_artifacts(
        &self,
        coordinate: &str,
        scope: &str,
    ) -> Result<Vec<ResolvedArtifact>, ResolveError> {
        Ok(self.resolve_coordinate(coordinate, scope)?.artifacts(false).to_vec())
    }
}

/// Reject trees in which some node still lacks a local file
fn ensure_resolved(root: &crate::graph::DependencyNode) -> Result<(), ResolutionError> {
    if root.is_resolved() {
        return Ok(());
    }

    let mut failures = Vec::new();
    root.visit_preorder(&mut |node| {
        if node.file().is_none() {
            failures.push(ArtifactFailure {
                artifact: node.coordinate().clone(),
                cause: ArtifactFailureCause::NotFound {
                    repositories: Vec::new(),
                },
            });
        }
    });

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ResolutionError { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ArtifactResolver, GraphCollector};
    use crate::graph::DependencyNode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Returns the root alone and records every request it sees
    #[derive(Default)]
    struct RecordingCollector {
        requests: Mutex<Vec<CollectRequest>>,
    }

    impl GraphCollector for RecordingCollector {
        fn collect_dependencies(
            &self,
            _session: &ResolutionSession,
            request: &CollectRequest,
        ) -> Result<DependencyNode, CollectionError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(DependencyNode::new(request.root.clone()))
        }
    }

    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
        leave_unresolved: bool,
    }

    impl ArtifactResolver for CountingResolver {
        fn resolve_dependencies(
            &self,
            _session: &ResolutionSession,
            request: DependencyRequest,
        ) -> Result<DependencyNode, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut root = request.root;
            if !self.leave_unresolved {
                root.visit_preorder_mut(&mut |n| n.set_file(PathBuf::from("/repo/root.jar")));
            }
            Ok(root)
        }
    }

    fn resolver_with(
        dir: &TempDir,
        collector: Arc<RecordingCollector>,
        resolver: Arc<CountingResolver>,
    ) -> DependencyResolver {
        DependencyResolver::new(dir.path())
            .unwrap()
            .with_engine(Engine::new(collector, resolver))
    }

    #[test]
    fn test_bad_coordinate_skips_engine() {
        let dir = TempDir::new().unwrap();
        let collector = Arc::new(RecordingCollector::default());
        let artifacts = Arc::new(CountingResolver::default());
        let resolver = resolver_with(&dir, collector.clone(), artifacts.clone());

        let result = resolver.resolve_coordinate("bad::coordinate", "runtime");
        assert!(matches!(result, Err(ResolveError::CoordinateParse(_))));
        assert!(collector.requests.lock().unwrap().is_empty());
        assert_eq!(artifacts.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_collect_request_snapshots_registry() {
        let dir = TempDir::new().unwrap();
        let collector = Arc::new(RecordingCollector::default());
        let artifacts = Arc::new(CountingResolver::default());
        let mut resolver = resolver_with(&dir, collector.clone(), artifacts);

        let central = RemoteRepository::with_default_layout("central", "https://a.example.org");
        let other = RemoteRepository::with_default_layout("other", "https://b.example.org");
        resolver.add_repository(central.clone());
        resolver.add_repository(other.clone());
        resolver.add_repository(central.clone());

        resolver.resolve_coordinate("g:a:1", "compile").unwrap();
        resolver.clear_repositories();

        let requests = collector.requests.lock().unwrap();
        assert_eq!(requests[0].repositories, vec![central, other]);
        assert_eq!(requests[0].root.scope(), "compile");
    }

    #[test]
    fn test_unresolved_nodes_fail() {
        let dir = TempDir::new().unwrap();
        let collector = Arc::new(RecordingCollector::default());
        let artifacts = Arc::new(CountingResolver {
            leave_unresolved: true,
            ..Default::default()
        });
        let resolver = resolver_with(&dir, collector, artifacts);

        assert!(matches!(
            resolver.resolve_coordinate("g:a:1", "compile"),
            Err(ResolveError::Resolution(_))
        ));
    }

    #[test]
    fn test_set_local_repository_replaces_session() {
        let dir = TempDir::new().unwrap();
        let mut resolver = DependencyResolver::new(dir.path().join("one")).unwrap();
        let before = resolver.session();

        resolver.set_local_repository_location(dir.path().join("two")).unwrap();
        assert_eq!(resolver.local_repository_location(), dir.path().join("two"));
        assert!(!Arc::ptr_eq(&before, &resolver.session()));
        assert_eq!(before.local_repository_location(), dir.path().join("one"));
    }

    #[test]
    fn test_failed_relocation_keeps_session() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();

        let mut resolver = DependencyResolver::new(dir.path()).unwrap();
        assert!(resolver.set_local_repository_location(&file).is_err());
        assert_eq!(resolver.local_repository_location(), dir.path());
    }
}
