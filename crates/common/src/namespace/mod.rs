//! Projection of a key store as a read-only filesystem namespace
//!
//! Every operation reads the store exactly once and keeps nothing afterwards:
//! there is no cache and no background refresh. Handles are cheap values
//! rebuilt on each traversal step.
//!
//! # Error routing
//!
//! - missing key: [`FsError::NotFound`]
//! - listing a leaf: [`FsError::NotADirectory`]
//! - anything the store could not answer: [`FsError::Store`]
//!
//! Attribute queries additionally go through an [`AttrFailurePolicy`].

mod attr;
mod dir;
mod error;
mod file;
mod path;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::store::{KeyStore, Lookup, StoreError};

pub use attr::{NodeAttr, NodeKind, DIR_PERM, DIR_TIME_AGE, FILE_PERM};
pub use dir::{DirEntry, Node};
pub use error::FsError;
pub use path::{last_segment, resolve, DirHandle, FileHandle, KeyPath};

/// What an attribute query reports when the store read fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrFailurePolicy {
    /// Swallow the failure and report zeroed attributes
    #[default]
    Empty,
    /// Return the failure like any other operation
    Propagate,
}

impl fmt::Display for AttrFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrFailurePolicy::Empty => write!(f, "empty"),
            AttrFailurePolicy::Propagate => write!(f, "propagate"),
        }
    }
}

impl FromStr for AttrFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(AttrFailurePolicy::Empty),
            "propagate" => Ok(AttrFailurePolicy::Propagate),
            other => Err(format!("unknown attribute failure policy: {other}")),
        }
    }
}

/// The projected namespace over a store
pub struct Namespace<S> {
    store: Arc<S>,
    attr_policy: AttrFailurePolicy,
    dir_time: SystemTime,
}

impl<S> Clone for Namespace<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            attr_policy: self.attr_policy,
            dir_time: self.dir_time,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Namespace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("store", &self.store)
            .field("attr_policy", &self.attr_policy)
            .field("dir_time", &self.dir_time)
            .finish()
    }
}

impl<S: KeyStore> Namespace<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            attr_policy: AttrFailurePolicy::default(),
            dir_time: attr::pinned_dir_time(SystemTime::now()),
        }
    }

    pub fn with_attr_policy(mut self, policy: AttrFailurePolicy) -> Self {
        self.attr_policy = policy;
        self
    }

    pub fn attr_policy(&self) -> AttrFailurePolicy {
        self.attr_policy
    }

    /// Timestamp reported for every directory
    pub fn dir_time(&self) -> SystemTime {
        self.dir_time
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn root(&self) -> DirHandle {
        DirHandle::root()
    }

    async fn fetch(&self, key: &str) -> Result<Lookup, StoreError> {
        self.store.get(key).await
    }

    /// Read `key`, turning an absent key into `FsError::NotFound`
    async fn fetch_existing(&self, key: &str) -> Result<Lookup, FsError> {
        match self.fetch(key).await {
            Ok(Lookup::NotFound) => Err(FsError::NotFound(key.to_string())),
            Ok(lookup) => Ok(lookup),
            Err(e) => {
                tracing::error!(key, "store read failed: {}", e);
                Err(FsError::Store(e))
            }
        }
    }

    fn settle_attr(
        &self,
        key: &str,
        kind: NodeKind,
        result: Result<NodeAttr, FsError>,
    ) -> Result<NodeAttr, FsError> {
        match (result, self.attr_policy) {
            (Ok(attr), _) => Ok(attr),
            (Err(e), AttrFailurePolicy::Empty) => {
                tracing::warn!(key, "attribute query failed, reporting empty attributes: {}", e);
                Ok(NodeAttr::empty(kind))
            }
            (Err(e), AttrFailurePolicy::Propagate) => Err(e),
        }
    }
}
