//! FUSE filesystem integration for etcdfs
//!
//! This module mounts the namespace projection as a read-only local
//! directory.
//!
//! # Architecture
//!
//! - `EtcdFs`: FUSE filesystem implementation using fuser
//! - `InodeTable`: Bidirectional inode ↔ key path mapping
//! - `serve`: mount lifecycle, from mount to signal-driven unmount

mod etcd_fs;
mod inode_table;
mod mount;

pub use etcd_fs::{errno, EtcdFs};
pub use inode_table::InodeTable;
pub use mount::{mount_options, serve, MountConfig, MountError};
