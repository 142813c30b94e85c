//! Dependency graph nodes
//!
//! After conflict resolution the graph is a tree: every artifact appears at
//! most once and children keep the order in which they were declared.

use crate::coordinate::{ArtifactCoordinate, Dependency};
use std::path::{Path, PathBuf};

/// A node of the collected (and later resolved) dependency tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    dependency: Dependency,
    file: Option<PathBuf>,
    children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn new(dependency: Dependency) -> Self {
        Self {
            dependency,
            file: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<DependencyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn coordinate(&self) -> &ArtifactCoordinate {
        self.dependency.coordinate()
    }

    /// Local file of the artifact, once resolved
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn set_file(&mut self, file: PathBuf) {
        self.file = Some(file);
    }

    pub fn children(&self) -> &[DependencyNode] {
        &self.children
    }

    pub fn push_child(&mut self, child: DependencyNode) {
        self.children.push(child);
    }

    /// Whether this node and all its descendants have a local file
    pub fn is_resolved(&self) -> bool {
        self.file.is_some() && self.children.iter().all(DependencyNode::is_resolved)
    }

    /// Visit every node root-first, children left to right
    pub fn visit_preorder<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a DependencyNode),
    {
        visitor(self);
        for child in &self.children {
            child.visit_preorder(visitor);
        }
    }

    /// Mutable pre-order visit
    pub fn visit_preorder_mut<F>(&mut self, visitor: &mut F)
    where
        F: FnMut(&mut DependencyNode),
    {
        visitor(self);
        for child in &mut self.children {
            child.visit_preorder_mut(visitor);
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DependencyNode::node_count).sum::<usize>()
    }
}
