//! Synthesized filesystem metadata
//!
//! The store has no timestamps or permission model, so every attribute here
//! comes from a fixed policy rather than from the store.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Read and traverse for everyone
pub const DIR_PERM: u16 = 0o555;
/// Read-only for everyone
pub const FILE_PERM: u16 = 0o444;
/// How far in the past directory timestamps are pinned
pub const DIR_TIME_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 180);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Directory,
    RegularFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttr {
    pub kind: NodeKind,
    pub perm: u16,
    pub size: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl NodeAttr {
    /// Zeroed attributes reported when a query failed and the failure is swallowed
    pub fn empty(kind: NodeKind) -> Self {
        Self {
            kind,
            perm: 0,
            size: 0,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
        }
    }

    pub fn directory(at: SystemTime) -> Self {
        Self {
            kind: NodeKind::Directory,
            perm: DIR_PERM,
            size: 0,
            atime: at,
            mtime: at,
            ctime: at,
        }
    }

    pub fn file(size: u64, at: SystemTime) -> Self {
        Self {
            kind: NodeKind::RegularFile,
            perm: FILE_PERM,
            size,
            atime: at,
            mtime: at,
            ctime: at,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty(self.kind)
    }
}

/// Fixed directory timestamp: `DIR_TIME_AGE` before `now`
pub(crate) fn pinned_dir_time(now: SystemTime) -> SystemTime {
    now.checked_sub(DIR_TIME_AGE).unwrap_or(UNIX_EPOCH)
}
