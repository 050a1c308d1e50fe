//! Integration tests for the namespace projection
//!
//! Tests walk the namespace the way the FUSE bridge does: start at the root,
//! look names up, list directories and read whole files.

mod common;

use std::time::Duration;

use ::common::namespace::{resolve, DirHandle, FsError, Node, NodeKind};

async fn walk_dir(
    ns: &::common::namespace::Namespace<::common::store::MemoryStore>,
    names: &[&str],
) -> DirHandle {
    let mut dir = ns.root();
    for name in names {
        match ns.lookup(&dir, name).await.unwrap() {
            Node::Dir(next) => dir = next,
            Node::File(_) => panic!("{name} is not a directory"),
        }
    }
    dir
}

#[tokio::test]
async fn test_config_scenario() {
    let (ns, _store) = common::setup_test_env();

    let cfg = walk_dir(&ns, &["cfg"]).await;
    let entries = ns.read_dir(&cfg).await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec![".", "..", "port", "tls"]);
    assert_eq!(entries[0].kind, NodeKind::Directory);
    assert_eq!(entries[1].kind, NodeKind::Directory);
    assert_eq!(entries[2].kind, NodeKind::RegularFile);
    assert_eq!(entries[3].kind, NodeKind::Directory);

    let Node::File(port) = ns.lookup(&cfg, "port").await.unwrap() else {
        panic!("port should be a file");
    };
    assert_eq!(ns.read_all(&port).await.unwrap(), b"8080");
    assert_eq!(ns.file_attr(&port).await.unwrap().size, 4);
}

#[tokio::test]
async fn test_missing_key_scenario() {
    let (ns, _store) = common::setup_test_env();
    let root = ns.root();

    let err = ns.lookup(&root, "missing").await.unwrap_err();
    assert!(matches!(err, FsError::NotFound(ref key) if key == "/missing"));

    let listing = ns.read_dir(&root).await.unwrap();
    assert!(listing.iter().all(|e| e.name != "missing"));
}

#[tokio::test]
async fn test_absent_keys_never_resolve() {
    let (ns, _store) = common::setup_test_env();
    let cfg = walk_dir(&ns, &["cfg"]).await;

    for name in ["nope", "port2", "tls/missing", "PORT"] {
        assert!(
            ns.lookup(&cfg, name).await.unwrap_err().is_not_found(),
            "{name} should not exist"
        );
    }
}

#[tokio::test]
async fn test_leaf_values_read_back_exactly() {
    let (ns, store) = common::setup_test_env();
    let values: Vec<(&str, Vec<u8>)> = vec![
        ("empty", Vec::new()),
        ("text", b"hello world".to_vec()),
        ("utf8", "h\u{e9}llo \u{1f600}".as_bytes().to_vec()),
        ("newlines", b"a\nb\n".to_vec()),
    ];
    for (name, value) in &values {
        store.set(&format!("/{name}"), value.clone()).unwrap();
    }

    let root = ns.root();
    for (name, value) in values {
        let Node::File(file) = ns.lookup(&root, name).await.unwrap() else {
            panic!("{name} should be a file");
        };
        assert_eq!(ns.read_all(&file).await.unwrap(), value);
        assert_eq!(ns.file_attr(&file).await.unwrap().size, value.len() as u64);
    }
}

#[tokio::test]
async fn test_nested_walk_matches_direct_resolution() {
    let (ns, store) = common::setup_test_env();
    store.set("/a/b/c/leaf", "x").unwrap();

    let c = walk_dir(&ns, &["a", "b", "c"]).await;
    assert_eq!(c.key(), resolve(None, "a/b/c"));
    assert_eq!(resolve(Some(&c), "leaf"), resolve(None, "a/b/c/leaf"));
}

#[tokio::test]
async fn test_file_timestamps_advance_while_size_holds() {
    let (ns, _store) = common::setup_test_env();
    let cfg = walk_dir(&ns, &["cfg"]).await;
    let Node::File(port) = ns.lookup(&cfg, "port").await.unwrap() else {
        panic!("port should be a file");
    };

    let first = ns.file_attr(&port).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = ns.file_attr(&port).await.unwrap();

    assert!(second.mtime > first.mtime);
    assert_eq!(first.size, second.size);
}

#[tokio::test]
async fn test_directory_timestamps_are_pinned() {
    let (ns, _store) = common::setup_test_env();
    let cfg = walk_dir(&ns, &["cfg"]).await;

    let first = ns.dir_attr(&cfg).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = ns.dir_attr(&cfg).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.perm, 0o555);
    assert_eq!(first.size, 0);
}

#[tokio::test]
async fn test_concurrent_lookups_do_not_interfere() {
    let (ns, store) = common::setup_test_env();
    store.set("/svc/a/port", "1").unwrap();
    store.set("/svc/b/port", "22").unwrap();
    let svc = walk_dir(&ns, &["svc"]).await;

    let read = |name: &'static str| {
        let ns = ns.clone();
        let svc = svc.clone();
        tokio::spawn(async move {
            let Node::Dir(dir) = ns.lookup(&svc, name).await.unwrap() else {
                panic!("{name} should be a directory");
            };
            let Node::File(port) = ns.lookup(&dir, "port").await.unwrap() else {
                panic!("port should be a file");
            };
            ns.read_all(&port).await.unwrap()
        })
    };

    let (a, b) = futures::future::join(read("a"), read("b")).await;
    assert_eq!(a.unwrap(), b"1");
    assert_eq!(b.unwrap(), b"22");
}

#[tokio::test]
async fn test_listing_follows_store_changes() {
    let (ns, store) = common::setup_test_env();
    let root = ns.root();

    store.set("/late", "1").unwrap();
    let names: Vec<_> = ns
        .read_dir(&root)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"late".to_string()));

    store.remove("/late");
    assert!(ns.lookup(&root, "late").await.unwrap_err().is_not_found());
}
