//! Core of etcdfs: the key store client and the namespace projection that
//! turns etcd keys into read-only filesystem nodes.

pub mod namespace;
pub mod store;

pub mod prelude {
    pub use crate::namespace::{
        AttrFailurePolicy, DirEntry, DirHandle, FileHandle, FsError, KeyPath, Namespace, Node,
        NodeAttr, NodeKind,
    };
    pub use crate::store::{ChildKey, Consistency, KeyStore, Lookup, StoreError};
}
