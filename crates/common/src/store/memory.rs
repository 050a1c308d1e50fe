//! In-memory key store
//!
//! Behaves like an etcd keyspace for tests and local experiments: setting a
//! key creates its missing ancestors as directories, and directory children
//! are reported in insertion order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ChildKey, KeyStore, Lookup, StoreError};
use crate::namespace::KeyPath;

#[derive(Debug, Clone)]
enum MemoryNode {
    /// Child keys in insertion order
    Dir(Vec<String>),
    Leaf(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("cannot create {0}: an ancestor is a value")]
    AncestorIsLeaf(String),
    #[error("cannot replace directory {0} with a value")]
    IsDirectory(String),
    #[error("cannot replace the root")]
    Root,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    nodes: Arc<RwLock<HashMap<String, MemoryNode>>>,
    unavailable: Arc<AtomicBool>,
    reads: Arc<AtomicU64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(KeyPath::root().to_key(), MemoryNode::Dir(Vec::new()));
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            unavailable: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Set a value, creating missing ancestor directories
    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<(), MemoryStoreError> {
        let path = KeyPath::parse(key);
        let parent = path.parent().ok_or(MemoryStoreError::Root)?;
        let key = path.to_key();

        let mut nodes = self.nodes.write();
        Self::ensure_dir(&mut nodes, &parent)?;
        match nodes.get(&key) {
            Some(MemoryNode::Dir(_)) => return Err(MemoryStoreError::IsDirectory(key)),
            Some(MemoryNode::Leaf(_)) => {}
            None => Self::link_child(&mut nodes, &parent, &key),
        }
        nodes.insert(key, MemoryNode::Leaf(value.into()));
        Ok(())
    }

    /// Create an (empty) directory and its missing ancestors
    pub fn mkdir(&self, key: &str) -> Result<(), MemoryStoreError> {
        let mut nodes = self.nodes.write();
        Self::ensure_dir(&mut nodes, &KeyPath::parse(key))
    }

    /// Remove a key and everything below it. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let path = KeyPath::parse(key);
        let Some(parent) = path.parent() else {
            return false;
        };
        let key = path.to_key();

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&key) {
            return false;
        }
        let prefix = format!("{}/", key);
        nodes.retain(|k, _| k != &key && !k.starts_with(&prefix));
        if let Some(MemoryNode::Dir(children)) = nodes.get_mut(&parent.to_key()) {
            children.retain(|child| child != &key);
        }
        true
    }

    /// Make every subsequent read fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of reads served (or refused) so far
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn ensure_dir(
        nodes: &mut HashMap<String, MemoryNode>,
        path: &KeyPath,
    ) -> Result<(), MemoryStoreError> {
        let mut current = KeyPath::root();
        for segment in path.segments() {
            let next = current.join(segment);
            let key = next.to_key();
            match nodes.get(&key) {
                Some(MemoryNode::Dir(_)) => {}
                Some(MemoryNode::Leaf(_)) => return Err(MemoryStoreError::AncestorIsLeaf(key)),
                None => {
                    Self::link_child(nodes, &current, &key);
                    nodes.insert(key, MemoryNode::Dir(Vec::new()));
                }
            }
            current = next;
        }
        Ok(())
    }

    fn link_child(nodes: &mut HashMap<String, MemoryNode>, parent: &KeyPath, key: &str) {
        if let Some(MemoryNode::Dir(children)) = nodes.get_mut(&parent.to_key()) {
            children.push(key.to_string());
        }
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Lookup, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }

        let key = KeyPath::parse(key).to_key();
        let nodes = self.nodes.read();
        let lookup = match nodes.get(&key) {
            None => Lookup::NotFound,
            Some(MemoryNode::Leaf(value)) => Lookup::Leaf {
                value: value.clone(),
            },
            Some(MemoryNode::Dir(children)) => Lookup::Directory {
                children: children
                    .iter()
                    .map(|child| ChildKey {
                        key: child.clone(),
                        is_dir: matches!(nodes.get(child), Some(MemoryNode::Dir(_))),
                    })
                    .collect(),
            },
        };
        Ok(lookup)
    }
}
