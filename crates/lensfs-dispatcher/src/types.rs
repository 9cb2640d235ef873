// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for the LensFS dispatcher

use uuid::Uuid;

/// Opaque enumeration-session identifier supplied by the host
/// virtualization service. One live session exists per id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumerationId(pub Uuid);

impl EnumerationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EnumerationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EnumerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque data-stream identifier correlating the writes of one
/// file-data request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DataStreamId(pub Uuid);

impl DataStreamId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DataStreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DataStreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One directory entry as reported to the host: either a leaf name
/// (directory enumeration) or a canonical relative path (placeholder
/// resolution). Immutable value semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, is_directory: bool, size: u64) -> Self {
        Self {
            name: name.into(),
            is_directory,
            size,
        }
    }
}

/// A normalized, slash-separated path relative to the projection
/// root. The empty path names the root itself; in change
/// notifications it also marks movement across the projection
/// boundary. Conversion from the host's own path spelling happens
/// before the dispatcher is reached.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().trim_matches('/').to_string())
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn join(&self, name: &str) -> RelPath {
        if self.0.is_empty() {
            RelPath::new(name)
        } else {
            RelPath(format!("{}/{}", self.0, name.trim_matches('/')))
        }
    }

    /// Split into the parent directory and the leaf name. `None` for
    /// the root path, which has neither.
    pub fn parent_and_name(&self) -> Option<(RelPath, &str)> {
        if self.0.is_empty() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some((parent, name)) => Some((RelPath(parent.to_string()), name)),
            None => Some((RelPath::root(), self.0.as_str())),
        }
    }

    /// The leaf name, or the empty string for the root path.
    pub fn name(&self) -> &str {
        self.parent_and_name().map(|(_, name)| name).unwrap_or("")
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
