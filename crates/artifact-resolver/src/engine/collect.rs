//! Dependency graph collection
//!
//! Breadth-first walk over artifact descriptors with nearest-wins conflict
//! resolution: the first occurrence of an artifact (by group, name,
//! extension and classifier) at the shallowest depth wins, and every later
//! occurrence is omitted together with its subtree. The root's dependency
//! management pins versions and scopes of every transitive dependency.

use super::remote::RemoteAccess;
use super::{CollectRequest, CollectionError, GraphCollector};
use crate::coordinate::{ArtifactCoordinate, Dependency, Exclusion};
use crate::descriptor::{read_descriptor, ArtifactDescriptor, DescriptorError, ManagedDependency};
use crate::graph::DependencyNode;
use crate::session::ResolutionSession;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Scopes whose dependencies never propagate to dependents
const NON_TRANSITIVE_SCOPES: &[&str] = &["test", "provided", "system"];

/// Scopes that override the scope of the dependencies below them
const DOMINANT_SCOPES: &[&str] = &["runtime", "test", "provided", "system"];

/// Scope a transitive dependency takes on below a parent
///
/// Returns `None` if the dependency is not transitive.
pub fn derive_scope(parent: &str, child: &str) -> Option<String> {
    if NON_TRANSITIVE_SCOPES.contains(&child) {
        return None;
    }
    if DOMINANT_SCOPES.contains(&parent) {
        Some(parent.to_string())
    } else {
        Some(child.to_string())
    }
}

/// Apply the root's management to a dependency declared below depth 1
pub fn apply_management(
    management: &HashMap<String, ManagedDependency>,
    declared: Dependency,
) -> Dependency {
    let Some(managed) = management.get(&declared.coordinate().conflict_key()) else {
        return declared;
    };

    let mut dependency = declared;
    if let Some(version) = &managed.version {
        if version != dependency.coordinate().version() {
            debug!(artifact = %dependency.coordinate(), managed = %version, "version managed");
            dependency = dependency.with_version(version);
        }
    }
    if let Some(scope) = &managed.scope {
        dependency = dependency.with_scope(scope);
    }
    if !managed.exclusions.is_empty() {
        let mut exclusions = dependency.exclusions().to_vec();
        exclusions.extend(managed.exclusions.iter().cloned());
        dependency = dependency.with_exclusions(exclusions);
    }
    dependency
}

fn is_version_range(version: &str) -> bool {
    version.starts_with('[') || version.starts_with('(')
}

/// Default [`GraphCollector`] reading descriptors from the session's
/// repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGraphCollector;

struct Slot {
    dependency: Dependency,
    depth: usize,
    exclusions: Vec<Exclusion>,
    children: Vec<usize>,
}

impl GraphCollector for DefaultGraphCollector {
    fn collect_dependencies(
        &self,
        session: &ResolutionSession,
        request: &CollectRequest,
    ) -> Result<DependencyNode, CollectionError> {
        let root = &request.root;
        let access = RemoteAccess::open(session, &request.repositories).map_err(|source| {
            CollectionError::RepositoryUnreachable {
                artifact: root.coordinate().to_string(),
                source,
            }
        })?;

        check_version(root.coordinate())?;
        let root_descriptor = descriptor_of(&access, root.coordinate())?.ok_or_else(|| {
            CollectionError::ArtifactNotFound {
                artifact: root.coordinate().to_string(),
                repositories: access.repository_ids(),
            }
        })?;

        let mut slots = vec![Slot {
            dependency: root.clone(),
            depth: 0,
            exclusions: root.exclusions().to_vec(),
            children: Vec::new(),
        }];
        let management: HashMap<String, ManagedDependency> = root_descriptor
            .managed
            .iter()
            .map(|m| (m.conflict_key().to_string(), m.clone()))
            .collect();
        let mut winners = HashSet::from([root.coordinate().conflict_key()]);
        let mut pending = VecDeque::from([(0usize, root_descriptor)]);

        while let Some((parent, descriptor)) = pending.pop_front() {
            for declared in descriptor.dependencies {
                let (depth, scope, exclusions) = {
                    let slot = &slots[parent];
                    (slot.depth, slot.dependency.scope().to_string(), slot.exclusions.clone())
                };
                let declared = if depth > 0 {
                    apply_management(&management, declared)
                } else {
                    declared
                };
                let coordinate = declared.coordinate();

                if exclusions.iter().any(|e| e.matches(coordinate)) {
                    debug!(artifact = %coordinate, "excluded");
                    continue;
                }
                let Some(derived) = derive_scope(&scope, declared.scope()) else {
                    continue;
                };
                if declared.is_optional() && depth > 0 {
                    continue;
                }
                if !winners.insert(coordinate.conflict_key()) {
                    debug!(artifact = %coordinate, "omitted for conflict with nearer declaration");
                    continue;
                }
                check_version(coordinate)?;

                let child = slots.len();
                let mut child_exclusions = exclusions;
                child_exclusions.extend(declared.exclusions().iter().cloned());
                slots.push(Slot {
                    dependency: declared.with_scope(derived),
                    depth: depth + 1,
                    exclusions: child_exclusions,
                    children: Vec::new(),
                });
                slots[parent].children.push(child);

                match descriptor_of(&access, coordinate)? {
                    Some(child_descriptor) => pending.push_back((child, child_descriptor)),
                    None if session.options().ignore_missing_descriptors => {
                        warn!(artifact = %coordinate, "descriptor missing, assuming no dependencies");
                    }
                    None => {
                        return Err(CollectionError::ArtifactNotFound {
                            artifact: coordinate.to_string(),
                            repositories: access.repository_ids(),
                        });
                    }
                }
            }
        }

        let tree = build_tree(&mut slots, 0);
        info!(
            root = %root.coordinate(),
            nodes = tree.node_count(),
            "collected dependency graph"
        );
        Ok(tree)
    }
}

fn check_version(coordinate: &ArtifactCoordinate) -> Result<(), CollectionError> {
    if is_version_range(coordinate.version()) {
        return Err(CollectionError::UnsupportedVersionRange {
            artifact: format!("{}:{}", coordinate.group_id(), coordinate.artifact_id()),
            range: coordinate.version().to_string(),
        });
    }
    Ok(())
}

fn descriptor_of(
    access: &RemoteAccess<'_>,
    coordinate: &ArtifactCoordinate,
) -> Result<Option<ArtifactDescriptor>, CollectionError> {
    read_descriptor(coordinate, access).map_err(|e| match e {
        DescriptorError::Transport(source) => CollectionError::RepositoryUnreachable {
            artifact: coordinate.to_string(),
            source,
        },
        source => CollectionError::InvalidDescriptor {
            artifact: coordinate.to_string(),
            source,
        },
    })
}

fn build_tree(slots: &mut [Slot], index: usize) -> DependencyNode {
    let mut node = DependencyNode::new(slots[index].dependency.clone());
    for child in std::mem::take(&mut slots[index].children) {
        node.push_child(build_tree(slots, child));
    }
    node
}
