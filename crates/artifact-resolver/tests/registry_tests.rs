//! Repository registration through the resolver

use artifact_resolver::{DependencyResolver, RemoteRepository};
use tempfile::TempDir;

fn repo(id: &str) -> RemoteRepository {
    RemoteRepository::with_default_layout(id, format!("https://{}.example.org/maven2/", id))
}

fn ids(resolver: &DependencyResolver) -> Vec<String> {
    resolver.repositories().iter().map(|r| r.id.clone()).collect()
}

#[test]
fn test_insertion_order_is_kept() {
    let local = TempDir::new().unwrap();
    let mut resolver = DependencyResolver::new(local.path()).unwrap();

    resolver.add_repository(repo("central"));
    resolver.add_repositories(vec![repo("snapshots"), repo("internal")]);

    assert_eq!(ids(&resolver), vec!["central", "snapshots", "internal"]);
}

#[test]
fn test_duplicates_are_ignored() {
    let local = TempDir::new().unwrap();
    let mut resolver = DependencyResolver::new(local.path()).unwrap();

    resolver.add_repository(repo("central"));
    resolver.add_repository(repo("internal"));
    // same id, different url
    resolver.add_repository(RemoteRepository::with_default_layout(
        "central",
        "https://mirror.example.org/",
    ));

    assert_eq!(ids(&resolver), vec!["central", "internal"]);
    assert!(resolver.repositories().contains(&repo("internal")));
    assert!(!resolver.repositories().contains(&repo("snapshots")));
    assert_eq!(
        resolver.repositories().as_slice()[0].url,
        "https://central.example.org/maven2/"
    );
}

#[test]
fn test_remove_and_clear() {
    let local = TempDir::new().unwrap();
    let mut resolver = DependencyResolver::with_repositories(
        local.path(),
        vec![repo("a"), repo("b"), repo("c")],
    )
    .unwrap();

    resolver.remove_repository(&repo("b"));
    assert_eq!(ids(&resolver), vec!["a", "c"]);

    // removing an absent repository is a no-op
    resolver.remove_repository(&repo("zzz"));
    assert_eq!(ids(&resolver), vec!["a", "c"]);

    resolver.remove_repositories(&[repo("a")]);
    assert_eq!(ids(&resolver), vec!["c"]);

    resolver.clear_repositories();
    assert!(resolver.repositories().is_empty());

    // re-adding after removal appends at the end
    resolver.add_repositories(vec![repo("x"), repo("c")]);
    assert_eq!(ids(&resolver), vec!["x", "c"]);
}

#[test]
fn test_local_repository_location() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let mut resolver = DependencyResolver::new(first.path()).unwrap();
    assert_eq!(resolver.local_repository_location(), first.path());

    let file = second.path().join("file");
    std::fs::write(&file, b"x").unwrap();
    assert!(resolver.set_local_repository_location(&file).is_err());
    assert_eq!(resolver.local_repository_location(), first.path());

    // a missing directory is accepted and created on first install
    let missing = second.path().join("not-yet");
    resolver.set_local_repository_location(&missing).unwrap();
    assert_eq!(resolver.local_repository_location(), missing);
    assert!(!missing.exists());
}
