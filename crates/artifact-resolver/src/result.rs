//! Resolution results
//!
//! Read-only view over a fully resolved dependency tree. Artifacts are listed
//! in pre-order (root first, then each child subtree left to right), which is
//! the nearest-first order the collector established; nothing is re-sorted or
//! deduplicated here.

use crate::coordinate::{ArtifactCoordinate, Dependency};
use crate::graph::DependencyNode;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Separator placed between classpath entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClasspathSeparator {
    /// `:`
    Unix,
    /// `;`
    Windows,
}

impl ClasspathSeparator {
    /// Separator of the platform this crate was built for
    pub const fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => ":",
            Self::Windows => ";",
        }
    }
}

impl Default for ClasspathSeparator {
    fn default() -> Self {
        Self::host()
    }
}

/// An artifact together with its file in the local repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub path: PathBuf,
}

/// Pre-order view over a resolved dependency tree
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    root: DependencyNode,
    separator: ClasspathSeparator,
    preorder: OnceCell<Vec<ResolvedArtifact>>,
}

impl ResolutionResult {
    /// Wrap a resolved tree
    ///
    /// Nodes without a local file are left out of the artifact list.
    pub fn new(root: DependencyNode) -> Self {
        Self {
            root,
            separator: ClasspathSeparator::host(),
            preorder: OnceCell::new(),
        }
    }

    pub fn with_separator(mut self, separator: ClasspathSeparator) -> Self {
        self.separator = separator;
        self
    }

    pub fn separator(&self) -> ClasspathSeparator {
        self.separator
    }

    pub fn root(&self) -> &DependencyNode {
        &self.root
    }

    /// Resolved artifacts in pre-order
    ///
    /// # Arguments
    /// * `include_root` - List the requested artifact first; otherwise only
    ///   its transitive dependencies are listed
    ///
    /// # Returns
    /// Artifacts root-first, children in the order the collector kept them.
    /// Repeated calls return the same slice.
    ///
    /// # Example
    /// ```no_run
    /// # use artifact_resolver::DependencyResolver;
    /// # let resolver = DependencyResolver::new("/tmp/m2")?;
    /// let result = resolver.resolve_coordinate("org.example:app:1.0", "runtime")?;
    /// let root = &result.artifacts(true)[0];
    /// assert_eq!(root.coordinate.artifact_id(), "app");
    /// assert_eq!(result.artifacts(false).len() + 1, result.artifacts(true).len());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn artifacts(&self, include_root: bool) -> &[ResolvedArtifact] {
        let all = self.preorder.get_or_init(|| self.collect_preorder());
        let root_listed = self.root.file().is_some();

        if include_root || !root_listed {
            all
        } else {
            &all[1..]
        }
    }

    /// Dependencies of every node in pre-order
    pub fn dependencies(&self, include_root: bool) -> Vec<&Dependency> {
        let mut dependencies = Vec::new();
        self.root.visit_preorder(&mut |node| dependencies.push(node.dependency()));
        if !include_root {
            dependencies.remove(0);
        }
        dependencies
    }

    /// Local files of the listed artifacts, in the same order
    pub fn files(&self, include_root: bool) -> Vec<&Path> {
        self.artifacts(include_root)
            .iter()
            .map(|a| a.path.as_path())
            .collect()
    }

    /// Files of every resolved artifact joined by the separator, root first
    pub fn class_path(&self) -> String {
        self.join_paths(self.artifacts(true))
    }

    /// Like [`class_path`](Self::class_path) without the root's own file
    pub fn dependency_class_path(&self) -> String {
        self.join_paths(self.artifacts(false))
    }

    fn join_paths(&self, artifacts: &[ResolvedArtifact]) -> String {
        artifacts
            .iter()
            .map(|a| a.path.to_string_lossy())
            .collect::<Vec<_>>()
            .join(self.separator.as_str())
    }

    fn collect_preorder(&self) -> Vec<ResolvedArtifact> {
        let mut artifacts = Vec::new();
        self.root.visit_preorder(&mut |node| {
            if let Some(path) = node.file() {
                artifacts.push(ResolvedArtifact {
                    coordinate: node.coordinate().clone(),
                    path: path.to_path_buf(),
                });
            }
        });
        artifacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(name: &str, children: Vec<DependencyNode>) -> DependencyNode {
        DependencyNode::new(Dependency::new(
            ArtifactCoordinate::new("g", name, "1"),
            "runtime",
        ))
        .with_file(format!("/repo/{}.jar", name))
        .with_children(children)
    }

    fn sample() -> ResolutionResult {
        ResolutionResult::new(resolved(
            "root",
            vec![
                resolved("a", vec![resolved("c", vec![])]),
                resolved("b", vec![]),
            ],
        ))
    }

    fn names(artifacts: &[ResolvedArtifact]) -> Vec<&str> {
        artifacts
            .iter()
            .map(|a| a.coordinate.artifact_id())
            .collect()
    }

    #[test]
    fn test_artifacts_preorder() {
        let result = sample();
        assert_eq!(names(result.artifacts(true)), vec!["root", "a", "c", "b"]);
        assert_eq!(names(result.artifacts(false)), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_class_path_separators() {
        let result = sample().with_separator(ClasspathSeparator::Unix);
        assert_eq!(
            result.class_path(),
            "/repo/root.jar:/repo/a.jar:/repo/c.jar:/repo/b.jar"
        );
        assert_eq!(result.dependency_class_path(), "/repo/a.jar:/repo/c.jar:/repo/b.jar");

        let result = sample().with_separator(ClasspathSeparator::Windows);
        assert_eq!(result.dependency_class_path(), "/repo/a.jar;/repo/c.jar;/repo/b.jar");
    }

    #[test]
    fn test_leaf_class_path_is_its_own_file() {
        let result = ResolutionResult::new(resolved("leaf", vec![]));
        assert!(result.artifacts(false).is_empty());
        assert_eq!(names(result.artifacts(true)), vec!["leaf"]);
        assert_eq!(result.class_path(), "/repo/leaf.jar");
        assert_eq!(result.dependency_class_path(), "");
    }

    #[test]
    fn test_dependencies_and_files() {
        let result = sample();
        assert_eq!(result.dependencies(true).len(), 4);
        assert_eq!(result.dependencies(false)[0].coordinate().artifact_id(), "a");
        assert_eq!(result.files(false)[2], Path::new("/repo/b.jar"));
    }

    #[test]
    fn test_host_separator() {
        let expected = if cfg!(windows) { ";" } else { ":" };
        assert_eq!(ClasspathSeparator::host().as_str(), expected);
        assert_eq!(ClasspathSeparator::default(), ClasspathSeparator::host());
    }
}
