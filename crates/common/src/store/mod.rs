//! Remote key store abstraction
//!
//! The namespace only ever asks the store one question: "what is at this key?"
//! The answer is a typed [`Lookup`], and anything that went wrong on the way
//! is a [`StoreError`]. A missing key is an answer, not an error.

mod error;
pub mod etcd;
pub mod memory;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{is_key_not_found, StoreError, KEY_NOT_FOUND_CODE};
pub use etcd::{EtcdClient, EtcdConfig, DEFAULT_ENDPOINT};
pub use memory::{MemoryStore, MemoryStoreError};

/// One immediate child of a directory key, as reported by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildKey {
    /// Fully qualified key, e.g. `/cfg/port`
    pub key: String,
    pub is_dir: bool,
}

/// Result of reading a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key is a directory; children are kept in store order
    Directory { children: Vec<ChildKey> },
    /// The key holds a value
    Leaf { value: Vec<u8> },
    /// The store says the key does not exist
    NotFound,
}

/// Read consistency requested from the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Any member may answer; reads can be stale
    #[default]
    Weak,
    /// Reads go through quorum
    Strong,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consistency::Weak => write!(f, "weak"),
            Consistency::Strong => write!(f, "strong"),
        }
    }
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weak" => Ok(Consistency::Weak),
            "strong" => Ok(Consistency::Strong),
            other => Err(format!("unknown consistency mode: {other}")),
        }
    }
}

/// A hierarchical key store that can be projected as a filesystem.
///
/// Implementations must be safe to share between concurrently running
/// requests; the namespace holds one behind an `Arc` for the life of the
/// process and never reconfigures it.
#[async_trait]
pub trait KeyStore: Send + Sync + fmt::Debug + 'static {
    /// Read `key` recursively, values included.
    ///
    /// # Returns
    /// * `Ok(Lookup::NotFound)` - the store reports the key as absent
    /// * `Ok(_)` - the directory or leaf found at `key`
    /// * `Err(StoreError)` - the store could not be asked or gave an unusable answer
    async fn get(&self, key: &str) -> Result<Lookup, StoreError>;
}
