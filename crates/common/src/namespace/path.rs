//! Key paths and the handles that carry them
//!
//! A handle's parent chain is an owned list of segments built top-down while
//! walking from the root, so walking `parent()` always ends at the root and
//! no handle ever points back at another.

use std::fmt;

/// Owned, normalized sequence of key segments. The root has none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated key, collapsing empty segments
    pub fn parse(key: &str) -> Self {
        Self {
            segments: split(key).map(str::to_string).collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, empty for the root
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn parent(&self) -> Option<KeyPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append `segment` with exactly one separator; empty pieces collapse
    pub fn join(&self, segment: &str) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.extend(split(segment).map(str::to_string));
        Self { segments }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Render as a store key: leading `/`, no trailing `/`
    pub fn to_key(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

fn split(key: &str) -> impl Iterator<Item = &str> {
    key.split('/').filter(|s| !s.is_empty())
}

/// Local name of a child from its fully qualified key (`/cfg/port` -> `port`)
pub fn last_segment(key: &str) -> &str {
    key.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Resolve the store key for an optional directory plus a trailing segment.
///
/// The root contributes the outermost prefix and the innermost directory the
/// segment closest to the leaf. An empty trailing segment resolves the
/// directory itself.
pub fn resolve(dir: Option<&DirHandle>, trailing: &str) -> String {
    match dir {
        Some(dir) => dir.path().join(trailing).to_key(),
        None => KeyPath::parse(trailing).to_key(),
    }
}

/// A directory in the projected namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirHandle {
    path: KeyPath,
}

impl DirHandle {
    pub fn root() -> Self {
        Self {
            path: KeyPath::root(),
        }
    }

    /// Rebuild a handle for a path produced by an earlier lookup
    pub fn from_path(path: KeyPath) -> Self {
        Self { path }
    }

    pub(crate) fn child_dir(&self, name: &str) -> DirHandle {
        DirHandle {
            path: self.path.join(name),
        }
    }

    pub(crate) fn child_file(&self, name: &str) -> FileHandle {
        FileHandle {
            path: self.path.join(name),
        }
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn parent(&self) -> Option<DirHandle> {
        self.path.parent().map(|path| DirHandle { path })
    }

    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    pub fn key(&self) -> String {
        resolve(Some(self), "")
    }
}

/// A leaf in the projected namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: KeyPath,
}

impl FileHandle {
    /// Rebuild a handle for a path produced by an earlier lookup.
    /// Returns `None` for the root, which is never a file.
    pub fn from_path(path: KeyPath) -> Option<Self> {
        (!path.is_root()).then_some(Self { path })
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn parent(&self) -> DirHandle {
        DirHandle {
            path: self.path.parent().unwrap_or_default(),
        }
    }

    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    pub fn key(&self) -> String {
        resolve(Some(&self.parent()), self.name())
    }
}
