//! Remote repository descriptors and the ordered registry consulted during
//! resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Layout identifier of maven2-style repositories
pub const DEFAULT_LAYOUT: &str = "default";

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

/// A remote repository
///
/// Two repositories are equal when their ids are equal; the registry relies
/// on this to drop duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRepository {
    /// Unique repository id (e.g. "central")
    pub id: String,

    /// Layout identifier, typically "default"
    #[serde(default = "default_layout")]
    pub layout: String,

    /// Base URL (`file://`, `http://` or `https://`)
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, layout: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layout: layout.into(),
            url: url.into(),
        }
    }

    /// Repository with the default layout
    pub fn with_default_layout(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(id, DEFAULT_LAYOUT, url)
    }

    /// Base URL without trailing slashes
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl PartialEq for RemoteRepository {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RemoteRepository {}

impl Hash for RemoteRepository {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.url, self.layout)
    }
}

/// Ordered, deduplicated set of remote repositories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryRegistry {
    repositories: Vec<RemoteRepository>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a repository unless an equal one is already registered
    ///
    /// Returns `true` if the repository was added.
    pub fn add(&mut self, repository: RemoteRepository) -> bool {
        if self.contains(&repository) {
            return false;
        }
        self.repositories.push(repository);
        true
    }

    /// Add each repository in order
    pub fn add_all<I>(&mut self, repositories: I)
    where
        I: IntoIterator<Item = RemoteRepository>,
    {
        for repository in repositories {
            self.add(repository);
        }
    }

    /// Remove a repository; no-op if absent
    pub fn remove(&mut self, repository: &RemoteRepository) {
        self.repositories.retain(|r| r != repository);
    }

    /// Remove each repository; absent entries are ignored
    pub fn remove_all<'a, I>(&mut self, repositories: I)
    where
        I: IntoIterator<Item = &'a RemoteRepository>,
    {
        for repository in repositories {
            self.remove(repository);
        }
    }

    pub fn clear(&mut self) {
        self.repositories.clear();
    }

    pub fn contains(&self, repository: &RemoteRepository) -> bool {
        self.repositories.contains(repository)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteRepository> {
        self.repositories.iter()
    }

    /// Registered repositories in insertion order
    pub fn as_slice(&self) -> &[RemoteRepository] {
        &self.repositories
    }

    /// Owned copy of the current contents
    pub fn snapshot(&self) -> Vec<RemoteRepository> {
        self.repositories.clone()
    }
}

impl FromIterator<RemoteRepository> for RepositoryRegistry {
    fn from_iter<I: IntoIterator<Item = RemoteRepository>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.add_all(iter);
        registry
    }
}

impl<'a> IntoIterator for &'a RepositoryRegistry {
    type Item = &'a RemoteRepository;
    type IntoIter = std::slice::Iter<'a, RemoteRepository>;

    fn into_iter(self) -> Self::IntoIter {
        self.repositories.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str) -> RemoteRepository {
        RemoteRepository::with_default_layout(id, format!("https://{}.example.org/maven2/", id))
    }

    #[test]
    fn test_add_ignores_duplicates() {
        let mut registry = RepositoryRegistry::new();
        assert!(registry.add(repo("central")));
        assert!(registry.add(repo("snapshots")));
        assert!(!registry.add(repo("central")));

        let ids: Vec<_> = registry.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["central", "snapshots"]);
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = RemoteRepository::with_default_layout("central", "https://a.example.org");
        let b = RemoteRepository::with_default_layout("central", "https://b.example.org");
        assert_eq!(a, b);

        let mut registry = RepositoryRegistry::new();
        registry.add(a);
        registry.add(b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.as_slice()[0].url, "https://a.example.org");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry: RepositoryRegistry =
            vec![repo("a"), repo("b"), repo("c")].into_iter().collect();

        registry.remove(&repo("b"));
        registry.remove(&repo("missing"));
        assert_eq!(registry.snapshot(), vec![repo("a"), repo("c")]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_base_url_trims_slash() {
        assert_eq!(repo("central").base_url(), "https://central.example.org/maven2");
    }
}
