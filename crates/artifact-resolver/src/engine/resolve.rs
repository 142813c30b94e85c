//! Artifact resolution
//!
//! Walks a collected tree and makes sure every node has a file in the local
//! repository. Resolution is all-or-nothing: every failing node is reported
//! and no partially resolved tree is returned.

use super::remote::RemoteAccess;
use super::{ArtifactFailure, ArtifactResolver, DependencyRequest, ResolutionError};
use crate::graph::DependencyNode;
use crate::session::ResolutionSession;
use tracing::info;

/// Default [`ArtifactResolver`] downloading into the session's local
/// repository
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultArtifactResolver;

impl ArtifactResolver for DefaultArtifactResolver {
    fn resolve_dependencies(
        &self,
        session: &ResolutionSession,
        request: DependencyRequest,
    ) -> Result<DependencyNode, ResolutionError> {
        let mut root = request.root;

        let access = match RemoteAccess::open(session, &request.repositories) {
            Ok(access) => access,
            Err(e) => {
                return Err(ResolutionError {
                    failures: vec![ArtifactFailure {
                        artifact: root.coordinate().clone(),
                        cause: e.into(),
                    }],
                });
            }
        };

        let mut failures = Vec::new();
        root.visit_preorder_mut(&mut |node| match access.materialize(node.coordinate()) {
            Ok(path) => node.set_file(path),
            Err(cause) => failures.push(ArtifactFailure {
                artifact: node.coordinate().clone(),
                cause,
            }),
        });

        if !failures.is_empty() {
            return Err(ResolutionError { failures });
        }

        info!(
            root = %root.coordinate(),
            artifacts = root.node_count(),
            "resolved dependency graph"
        );
        Ok(root)
    }
}
