//! Bidirectional inode ↔ key path mapping for the FUSE filesystem
//!
//! FUSE uses 64-bit inode numbers to identify files and directories. The
//! table remembers which key path (and which kind of handle) the kernel was
//! given for each inode so later requests can rebuild the handle. It never
//! holds store data.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use common::namespace::{DirHandle, FileHandle, KeyPath, Node, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
struct InodeEntry {
    path: KeyPath,
    kind: NodeKind,
}

/// Bidirectional mapping between inodes and key paths
#[derive(Debug)]
pub struct InodeTable {
    path_to_inode: HashMap<KeyPath, u64>,
    inode_to_entry: HashMap<u64, InodeEntry>,
    /// Next available inode number (starts at 2, as 1 is reserved for root)
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Root inode number (always 1 in FUSE)
    pub const ROOT_INODE: u64 = 1;

    const UNREGISTERED_BIT: u64 = 1 << 63;

    /// Create a new inode table with root pre-registered
    pub fn new() -> Self {
        let mut table = Self {
            path_to_inode: HashMap::new(),
            inode_to_entry: HashMap::new(),
            next_inode: Self::ROOT_INODE + 1,
        };
        table.path_to_inode.insert(KeyPath::root(), Self::ROOT_INODE);
        table.inode_to_entry.insert(
            Self::ROOT_INODE,
            InodeEntry {
                path: KeyPath::root(),
                kind: NodeKind::Directory,
            },
        );
        table
    }

    /// Get or create an inode for a path. A known path keeps its inode and
    /// takes on the latest kind reported for it.
    pub fn get_or_create(&mut self, path: &KeyPath, kind: NodeKind) -> u64 {
        if let Some(&inode) = self.path_to_inode.get(path) {
            if let Some(entry) = self.inode_to_entry.get_mut(&inode) {
                entry.kind = kind;
            }
            return inode;
        }

        let inode = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(path.clone(), inode);
        self.inode_to_entry.insert(
            inode,
            InodeEntry {
                path: path.clone(),
                kind,
            },
        );
        inode
    }

    /// Register a node returned by a lookup
    pub fn register(&mut self, node: &Node) -> u64 {
        let path = match node {
            Node::Dir(dir) => dir.path(),
            Node::File(file) => file.path(),
        };
        self.get_or_create(path, node.kind())
    }

    pub fn get_inode(&self, path: &KeyPath) -> Option<u64> {
        self.path_to_inode.get(path).copied()
    }

    pub fn get_path(&self, inode: u64) -> Option<&KeyPath> {
        self.inode_to_entry.get(&inode).map(|entry| &entry.path)
    }

    /// Rebuild the handle the kernel knows as `inode`
    pub fn node(&self, inode: u64) -> Option<Node> {
        let entry = self.inode_to_entry.get(&inode)?;
        match entry.kind {
            NodeKind::Directory => Some(Node::Dir(DirHandle::from_path(entry.path.clone()))),
            NodeKind::RegularFile => FileHandle::from_path(entry.path.clone()).map(Node::File),
        }
    }

    /// Rebuild the directory handle for `inode`, if it is one
    pub fn dir(&self, inode: u64) -> Option<DirHandle> {
        match self.node(inode)? {
            Node::Dir(dir) => Some(dir),
            Node::File(_) => None,
        }
    }

    /// Inode to report for a directory entry without registering it.
    ///
    /// Known paths keep their inode. Unknown paths get a number derived from
    /// the path with the high bit set, which never collides with allocated
    /// inodes. The kernel only sends `forget` for inodes handed out by
    /// `lookup`, so listings must not allocate.
    pub fn listing_inode(&self, path: &KeyPath) -> u64 {
        if let Some(inode) = self.get_inode(path) {
            return inode;
        }
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        hasher.finish() | Self::UNREGISTERED_BIT
    }

    /// Drop an inode the kernel has forgotten. The root is never dropped.
    pub fn forget(&mut self, inode: u64) -> Option<KeyPath> {
        if inode == Self::ROOT_INODE {
            return None;
        }
        let entry = self.inode_to_entry.remove(&inode)?;
        self.path_to_inode.remove(&entry.path);
        Some(entry.path)
    }

    pub fn len(&self) -> usize {
        self.inode_to_entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inode_to_entry.is_empty()
    }
}
