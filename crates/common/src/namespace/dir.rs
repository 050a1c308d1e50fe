use super::path::{last_segment, resolve};
use super::{DirHandle, FileHandle, FsError, Namespace, NodeAttr, NodeKind};
use crate::store::{KeyStore, Lookup};

/// A node produced by looking a name up in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir(DirHandle),
    File(FileHandle),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Dir(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::RegularFile,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Node::Dir(dir) => dir.key(),
            Node::File(file) => file.key(),
        }
    }
}

/// One line of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
}

impl DirEntry {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl<S: KeyStore> Namespace<S> {
    /// Attributes of a directory: fixed mode, size 0, pinned timestamps
    pub async fn dir_attr(&self, dir: &DirHandle) -> Result<NodeAttr, FsError> {
        let key = resolve(Some(dir), "");
        tracing::debug!(key = %key, "dir attr");

        let result = self
            .fetch_existing(&key)
            .await
            .map(|_| NodeAttr::directory(self.dir_time));
        self.settle_attr(&key, NodeKind::Directory, result)
    }

    /// Look `name` up inside `dir`, producing a child handle
    pub async fn lookup(&self, dir: &DirHandle, name: &str) -> Result<Node, FsError> {
        let key = resolve(Some(dir), name);
        tracing::debug!(key = %key, "dir lookup");

        match self.fetch_existing(&key).await? {
            Lookup::Directory { .. } => Ok(Node::Dir(dir.child_dir(name))),
            Lookup::Leaf { .. } => Ok(Node::File(dir.child_file(name))),
            Lookup::NotFound => Err(FsError::NotFound(key)),
        }
    }

    /// List `dir`: `.`, `..`, then the children in store order
    pub async fn read_dir(&self, dir: &DirHandle) -> Result<Vec<DirEntry>, FsError> {
        let key = resolve(Some(dir), "");
        tracing::debug!(key = %key, "dir readdir");

        let children = match self.fetch_existing(&key).await? {
            Lookup::Directory { children } => children,
            Lookup::Leaf { .. } => return Err(FsError::NotADirectory(key)),
            Lookup::NotFound => return Err(FsError::NotFound(key)),
        };

        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(DirEntry::new(".", NodeKind::Directory));
        entries.push(DirEntry::new("..", NodeKind::Directory));
        entries.extend(children.into_iter().map(|child| {
            let kind = if child.is_dir {
                NodeKind::Directory
            } else {
                NodeKind::RegularFile
            };
            DirEntry::new(last_segment(&child.key), kind)
        }));

        tracing::debug!(key = %key, entries = entries.len(), "dir listing");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::namespace::AttrFailurePolicy;
    use crate::store::MemoryStore;

    fn namespace() -> (Namespace<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (Namespace::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_dir_attr() {
        let (ns, store) = namespace();
        store.mkdir("/cfg").unwrap();
        let cfg = DirHandle::root().child_dir("cfg");

        let attr = ns.dir_attr(&cfg).await.unwrap();
        assert_eq!(attr, NodeAttr::directory(ns.dir_time()));
    }

    #[tokio::test]
    async fn test_dir_attr_failure_is_empty_by_default() {
        let (ns, store) = namespace();
        store.set_unavailable(true);

        let attr = ns.dir_attr(&DirHandle::root()).await.unwrap();
        assert!(attr.is_empty());
        assert_eq!(attr.kind, NodeKind::Directory);
    }

    #[tokio::test]
    async fn test_dir_attr_failure_propagates_when_asked() {
        let (ns, _store) = namespace();
        let ns = ns.with_attr_policy(AttrFailurePolicy::Propagate);
        let gone = DirHandle::root().child_dir("gone");

        assert!(ns.dir_attr(&gone).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_lookup_builds_child_handles() {
        let (ns, store) = namespace();
        store.set("/cfg/port", "8080").unwrap();

        let root = ns.root();
        let Node::Dir(cfg) = ns.lookup(&root, "cfg").await.unwrap() else {
            panic!("cfg is a directory");
        };
        assert_eq!(cfg.name(), "cfg");
        assert_eq!(cfg.parent(), Some(root));

        let Node::File(port) = ns.lookup(&cfg, "port").await.unwrap() else {
            panic!("port is a file");
        };
        assert_eq!(port.name(), "port");
        assert_eq!(port.parent(), cfg);
    }

    #[tokio::test]
    async fn test_lookup_store_failure_is_not_not_found() {
        let (ns, store) = namespace();
        store.set("/a", "1").unwrap();
        store.set_unavailable(true);

        let err = ns.lookup(&ns.root(), "a").await.unwrap_err();
        assert!(matches!(err, FsError::Store(_)));
    }

    #[tokio::test]
    async fn test_read_dir_on_leaf() {
        let (ns, store) = namespace();
        store.set("/leaf", "x").unwrap();
        let leaf_as_dir = DirHandle::root().child_dir("leaf");

        assert!(matches!(
            ns.read_dir(&leaf_as_dir).await,
            Err(FsError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_read_dir_empty_directory() {
        let (ns, store) = namespace();
        store.mkdir("/empty").unwrap();

        let entries = ns
            .read_dir(&DirHandle::root().child_dir("empty"))
            .await
            .unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![".", ".."]);
    }

    #[tokio::test]
    async fn test_each_operation_reads_store_once() {
        let (ns, store) = namespace();
        store.set("/a/b", "1").unwrap();
        let root = ns.root();

        ns.dir_attr(&root).await.unwrap();
        ns.lookup(&root, "a").await.unwrap();
        ns.read_dir(&root).await.unwrap();
        ns.read_dir(&root).await.unwrap();
        assert_eq!(store.reads(), 4);
    }
}
