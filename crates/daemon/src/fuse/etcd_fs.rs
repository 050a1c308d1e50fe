//! FUSE filesystem implementation for etcdfs
//!
//! Implements the fuser::Filesystem trait on top of the namespace projection.
//! Each kernel request is handed to its own task on the tokio runtime, so
//! slow store reads never hold up other requests.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use parking_lot::RwLock;
use tokio::runtime::Handle;

use common::namespace::{DirEntry, DirHandle, FsError, Namespace, Node, NodeAttr, NodeKind};
use common::store::KeyStore;

use crate::fuse::inode_table::InodeTable;

/// Map a namespace failure to the errno handed back to the kernel
pub fn errno(err: &FsError) -> libc::c_int {
    match err {
        FsError::NotFound(_) => libc::ENOENT,
        FsError::NotADirectory(_) => libc::ENOTDIR,
        FsError::Store(_) => libc::EIO,
    }
}

/// FUSE filesystem over an etcd keyspace
pub struct EtcdFs<S> {
    /// Tokio runtime handle for async operations
    rt: Handle,
    ns: Namespace<S>,
    inodes: Arc<RwLock<InodeTable>>,
    uid: u32,
    gid: u32,
}

impl<S: KeyStore> EtcdFs<S> {
    /// Attributes are never cached by the kernel; every stat asks the store
    const ATTR_TTL: Duration = Duration::ZERO;

    /// Block size for FUSE
    const BLOCK_SIZE: u32 = 512;

    pub fn new(rt: Handle, ns: Namespace<S>) -> Self {
        Self {
            rt,
            ns,
            inodes: Arc::new(RwLock::new(InodeTable::new())),
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }

    /// Create a FileAttr from synthesized attributes
    pub fn make_attr(ino: u64, attr: &NodeAttr, uid: u32, gid: u32) -> FileAttr {
        let kind = file_type(attr.kind);
        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(Self::BLOCK_SIZE as u64),
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: attr.ctime,
            kind,
            perm: attr.perm,
            nlink: if kind == FileType::Directory { 2 } else { 1 },
            uid,
            gid,
            rdev: 0,
            blksize: Self::BLOCK_SIZE,
            flags: 0,
        }
    }

    fn node(&self, ino: u64) -> Option<Node> {
        self.inodes.read().node(ino)
    }
}

fn file_type(kind: NodeKind) -> FileType {
    match kind {
        NodeKind::Directory => FileType::Directory,
        NodeKind::RegularFile => FileType::RegularFile,
    }
}

async fn node_attr<S: KeyStore>(ns: &Namespace<S>, node: &Node) -> Result<NodeAttr, FsError> {
    match node {
        Node::Dir(dir) => ns.dir_attr(dir).await,
        Node::File(file) => ns.file_attr(file).await,
    }
}

/// Assign inodes to a directory listing. Only inodes already handed out by
/// `lookup` are reused; nothing is allocated.
fn listing(
    inodes: &InodeTable,
    ino: u64,
    dir: &DirHandle,
    entries: Vec<DirEntry>,
) -> Vec<(u64, FileType, String)> {
    entries
        .into_iter()
        .map(|entry| {
            let entry_ino = match entry.name.as_str() {
                "." => ino,
                ".." => dir
                    .parent()
                    .map(|parent| inodes.listing_inode(parent.path()))
                    .unwrap_or(ino),
                name => inodes.listing_inode(&dir.path().join(name)),
            };
            (entry_ino, file_type(entry.kind), entry.name)
        })
        .collect()
}

/// Slice whole content for a kernel read at `offset`
fn read_window(data: &[u8], offset: i64, size: u32) -> &[u8] {
    let start = usize::try_from(offset).unwrap_or(0).min(data.len());
    let end = start.saturating_add(size as usize).min(data.len());
    &data[start..end]
}

impl<S: KeyStore> Filesystem for EtcdFs<S> {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        tracing::info!(attr_errors = %self.ns.attr_policy(), "FUSE filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("FUSE filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(name) = name.to_str().map(str::to_string) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(dir) = self.inodes.read().dir(parent) else {
            reply.error(libc::ENOENT);
            return;
        };

        let ns = self.ns.clone();
        let inodes = self.inodes.clone();
        let (uid, gid) = (self.uid, self.gid);
        self.rt.spawn(async move {
            let result = async {
                let node = ns.lookup(&dir, &name).await?;
                let attr = node_attr(&ns, &node).await?;
                Ok::<_, FsError>((node, attr))
            }
            .await;

            match result {
                Ok((node, attr)) => {
                    let ino = inodes.write().register(&node);
                    tracing::debug!(ino, key = %node.key(), "lookup");
                    reply.entry(&Self::ATTR_TTL, &Self::make_attr(ino, &attr, uid, gid), 0);
                }
                Err(e) => {
                    tracing::debug!(parent, name = %name, "lookup failed: {}", e);
                    reply.error(errno(&e));
                }
            }
        });
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, _nlookup: u64) {
        self.inodes.write().forget(ino);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(node) = self.node(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let ns = self.ns.clone();
        let (uid, gid) = (self.uid, self.gid);
        self.rt.spawn(async move {
            match node_attr(&ns, &node).await {
                Ok(attr) => reply.attr(&Self::ATTR_TTL, &Self::make_attr(ino, &attr, uid, gid)),
                Err(e) => reply.error(errno(&e)),
            }
        });
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let dir = match self.node(ino) {
            Some(Node::Dir(dir)) => dir,
            Some(Node::File(_)) => {
                reply.error(libc::ENOTDIR);
                return;
            }
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let ns = self.ns.clone();
        let inodes = self.inodes.clone();
        self.rt.spawn(async move {
            let entries = match ns.read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!(key = %dir.key(), "readdir failed: {}", e);
                    reply.error(errno(&e));
                    return;
                }
            };

            let listing = listing(&inodes.read(), ino, &dir, entries);

            // Skip to offset and add entries
            let skip = usize::try_from(offset).unwrap_or(0);
            for (i, (entry_ino, kind, name)) in listing.into_iter().enumerate().skip(skip) {
                if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
                    break;
                }
            }
            reply.ok();
        });
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            reply.error(libc::EROFS);
            return;
        }
        match self.node(ino) {
            Some(Node::File(_)) => reply.opened(0, fuser::consts::FOPEN_DIRECT_IO),
            Some(Node::Dir(_)) => reply.error(libc::EISDIR),
            None => reply.error(libc::ENOENT),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let file = match self.node(ino) {
            Some(Node::File(file)) => file,
            Some(Node::Dir(_)) => {
                reply.error(libc::EISDIR);
                return;
            }
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let ns = self.ns.clone();
        self.rt.spawn(async move {
            match ns.read_all(&file).await {
                Ok(content) => reply.data(read_window(&content, offset, size)),
                Err(e) => {
                    tracing::error!(key = %file.key(), "read failed: {}", e);
                    reply.error(errno(&e));
                }
            }
        });
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        reply.error(libc::EROFS);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        reply.error(libc::EROFS);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        reply.error(libc::EROFS);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EROFS);
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use common::namespace::KeyPath;
    use common::store::{MemoryStore, StoreError};

    use super::*;

    type Fs = EtcdFs<MemoryStore>;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(errno(&FsError::NotFound("/a".into())), libc::ENOENT);
        assert_eq!(errno(&FsError::NotADirectory("/a".into())), libc::ENOTDIR);
        assert_eq!(
            errno(&FsError::Store(StoreError::Unavailable("down".into()))),
            libc::EIO
        );
    }

    #[test]
    fn test_make_attr_directory() {
        let at = UNIX_EPOCH + Duration::from_secs(42);
        let attr = Fs::make_attr(1, &NodeAttr::directory(at), 1000, 1000);
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.perm, 0o555);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.mtime, at);
        assert_eq!(attr.crtime, at);
    }

    #[test]
    fn test_make_attr_file() {
        let attr = Fs::make_attr(7, &NodeAttr::file(1025, SystemTime::now()), 0, 0);
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.kind, FileType::RegularFile);
        assert_eq!(attr.perm, 0o444);
        assert_eq!(attr.size, 1025);
        assert_eq!(attr.blocks, 3);
    }

    fn entries(names: &[(&str, NodeKind)]) -> Vec<DirEntry> {
        names
            .iter()
            .map(|(name, kind)| DirEntry {
                name: name.to_string(),
                kind: *kind,
            })
            .collect()
    }

    #[test]
    fn test_listing_does_not_grow_inode_table() {
        let mut inodes = InodeTable::new();
        let cfg = DirHandle::from_path(KeyPath::parse("/cfg"));
        let cfg_ino = inodes.get_or_create(cfg.path(), NodeKind::Directory);
        let port_ino = inodes.get_or_create(&KeyPath::parse("/cfg/port"), NodeKind::RegularFile);
        let before = inodes.len();

        let children: Vec<String> = (0..100).map(|i| format!("key{i}")).collect();
        let mut listed = vec![
            (".", NodeKind::Directory),
            ("..", NodeKind::Directory),
            ("port", NodeKind::RegularFile),
        ];
        listed.extend(children.iter().map(|c| (c.as_str(), NodeKind::RegularFile)));

        let listing = listing(&inodes, cfg_ino, &cfg, entries(&listed));
        assert_eq!(inodes.len(), before);
        assert_eq!(listing.len(), 103);
        assert_eq!(listing[0].0, cfg_ino);
        assert_eq!(listing[1].0, InodeTable::ROOT_INODE);
        assert_eq!(listing[2], (port_ino, FileType::RegularFile, "port".to_string()));
        assert!(inodes.get_inode(&KeyPath::parse("/cfg/key0")).is_none());
    }

    #[test]
    fn test_read_window() {
        let data = b"8080";
        assert_eq!(read_window(data, 0, 4096), b"8080");
        assert_eq!(read_window(data, 2, 1), b"8");
        assert_eq!(read_window(data, 4, 10), b"");
        assert_eq!(read_window(data, 100, 10), b"");
        assert_eq!(read_window(data, -1, 2), b"80");
        assert_eq!(read_window(b"", 0, 10), b"");
    }
}
