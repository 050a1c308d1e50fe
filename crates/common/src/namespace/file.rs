use std::time::SystemTime;

use super::{FileHandle, FsError, Namespace, NodeAttr, NodeKind};
use crate::store::{KeyStore, Lookup};

impl<S: KeyStore> Namespace<S> {
    /// Attributes of a file: read-only mode, size of the value, and the
    /// current time for all timestamps (the store keeps no mtime we use).
    pub async fn file_attr(&self, file: &FileHandle) -> Result<NodeAttr, FsError> {
        let key = file.key();
        tracing::debug!(key = %key, "file attr");

        let result = self.fetch_existing(&key).await.map(|lookup| {
            let size = match &lookup {
                Lookup::Leaf { value } => value.len() as u64,
                _ => 0,
            };
            NodeAttr::file(size, SystemTime::now())
        });
        self.settle_attr(&key, NodeKind::RegularFile, result)
    }

    /// The whole value of a file. There is no ranged read.
    pub async fn read_all(&self, file: &FileHandle) -> Result<Vec<u8>, FsError> {
        let key = file.key();
        tracing::debug!(key = %key, "file read_all");

        match self.fetch_existing(&key).await? {
            Lookup::Leaf { value } => {
                tracing::debug!(key = %key, bytes = value.len(), "file content");
                Ok(value)
            }
            // A directory has no content of its own
            Lookup::Directory { .. } => Ok(Vec::new()),
            Lookup::NotFound => Err(FsError::NotFound(key)),
        }
    }
}
