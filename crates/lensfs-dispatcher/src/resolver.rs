// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path-to-metadata resolution
//!
//! Decides what a path "is" without materializing its content. The
//! one synthesized file, `.lensfs/config`, resolves here even though
//! it is absent from the inode tree.

use std::sync::Arc;
use tracing::debug;

use crate::error::DispatchResult;
use crate::tree::{InodeTree, TreeError};
use crate::types::{FileMetadata, RelPath};

pub(crate) struct MetadataResolver {
    tree: Arc<dyn InodeTree>,
    virtual_path: RelPath,
    virtual_payload_len: u64,
}

impl MetadataResolver {
    pub fn new(tree: Arc<dyn InodeTree>, virtual_path: RelPath, virtual_payload_len: u64) -> Self {
        Self {
            tree,
            virtual_path,
            virtual_payload_len,
        }
    }

    /// Resolve `path` to placeholder metadata, or `None` when the
    /// path exists neither in the tree nor as the virtual config
    /// file. The metadata name is the canonical spelling re-derived
    /// from the tree, not the caller's spelling, so the host's name
    /// cache stays correct for case-differing lookups.
    pub async fn resolve(&self, path: &RelPath) -> DispatchResult<Option<FileMetadata>> {
        match self.tree.lookup(path).await {
            Ok(node) => {
                let stat = self.tree.stat(&node).await?;
                Ok(Some(FileMetadata::new(
                    node.canonical_path().as_str(),
                    stat.is_directory,
                    stat.size,
                )))
            }
            Err(TreeError::NotFound) => {
                if *path == self.virtual_path {
                    Ok(Some(FileMetadata::new(
                        path.as_str(),
                        false,
                        self.virtual_payload_len,
                    )))
                } else {
                    debug!(target: "lensfs::resolve", %path, "not found");
                    Ok(None)
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Existence-only resolution, used by the host to validate a
    /// name before deeper operations.
    pub async fn query_file_name(&self, path: &RelPath) -> DispatchResult<bool> {
        match self.tree.lookup(path).await {
            Ok(_) => Ok(true),
            Err(TreeError::NotFound) => Ok(*path == self.virtual_path),
            Err(err) => Err(err.into()),
        }
    }
}
