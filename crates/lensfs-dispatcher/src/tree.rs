// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Inode-tree collaborator contract
//!
//! The dispatcher never owns the working-copy tree; it drives an
//! implementation of [`InodeTree`] provided by the mount layer.
//! Lookup and mutation are asynchronous (the tree may fault content
//! in from the backing store); the dispatcher awaits them before the
//! host callback returns. Child enumeration is a synchronous sink
//! fill because the session snapshot is taken inside the callback.

use async_trait::async_trait;
use std::io;

use crate::types::{FileMetadata, RelPath};

/// A resolved tree node. Carries the canonical spelling of the path
/// so callers can correct case-differing lookups before talking to
/// the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeHandle {
    canonical_path: RelPath,
}

impl NodeHandle {
    pub fn new(canonical_path: RelPath) -> Self {
        Self { canonical_path }
    }

    pub fn canonical_path(&self) -> &RelPath {
        &self.canonical_path
    }
}

/// Stat results for a resolved node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStat {
    pub size: u64,
    pub is_directory: bool,
}

/// Tree-level error type. `NotFound` is distinguished from every
/// other kind because the resolver's virtual-file fallback applies
/// only to it; all other kinds pass through the dispatcher as
/// generic failures.
#[derive(thiserror::Error, Debug)]
pub enum TreeError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("access denied")]
    AccessDenied,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type TreeResult<T> = Result<T, TreeError>;

/// The in-memory hierarchical representation of the working copy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InodeTree: Send + Sync {
    /// Resolve a path to a node, faulting it in if necessary.
    async fn lookup(&self, path: &RelPath) -> TreeResult<NodeHandle>;

    /// Size and kind of a resolved node.
    async fn stat(&self, node: &NodeHandle) -> TreeResult<NodeStat>;

    /// Fill `sink` with the ordered child entries of the directory
    /// at `path`. The order is tree-defined and stable.
    fn enumerate_children(&self, path: &RelPath, sink: &mut Vec<FileMetadata>) -> TreeResult<()>;

    /// Full content of the file at `path`.
    async fn read_whole_file(&self, path: &RelPath) -> TreeResult<Vec<u8>>;

    /// Create a file or directory entry under `parent`.
    async fn create_entry(&self, parent: &RelPath, name: &str, is_directory: bool)
        -> TreeResult<()>;

    /// Remove the entry `name` under `parent`.
    async fn remove_entry(&self, parent: &RelPath, name: &str, is_directory: bool)
        -> TreeResult<()>;

    /// Move `src_name` from `src_parent` to `dst_name` under
    /// `dst_parent`.
    async fn rename_entry(
        &self,
        src_parent: &RelPath,
        src_name: &str,
        dst_parent: &RelPath,
        dst_name: &str,
    ) -> TreeResult<()>;

    /// Force full local realization of the file at `path`.
    async fn materialize(&self, path: &RelPath) -> TreeResult<()>;
}
