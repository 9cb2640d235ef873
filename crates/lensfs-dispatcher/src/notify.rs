// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Change-notification routing
//!
//! The host reports out-of-band edits made directly against the
//! projected files; each notification kind maps to one tree
//! mutation. Dispatch is a closed enum match so adding or removing a
//! kind is checked at compile time; the raw host code is decoded up
//! front so unrecognized codes still fail with invalid-parameter.

use futures::try_join;
use std::sync::Arc;
use tracing::debug;

use crate::error::{DispatchError, DispatchResult};
use crate::tree::InodeTree;
use crate::types::RelPath;

/// The closed set of notification kinds the host can deliver.
/// Raw values are the host's notification bitmask codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    NewFileCreated,
    FileOverwritten,
    FileRenamed,
    PreSetHardlink,
    HandleClosedFileModified,
    HandleClosedFileDeleted,
}

impl NotificationKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x004 => Some(Self::NewFileCreated),
            0x008 => Some(Self::FileOverwritten),
            0x040 => Some(Self::PreSetHardlink),
            0x080 => Some(Self::FileRenamed),
            0x400 => Some(Self::HandleClosedFileModified),
            0x800 => Some(Self::HandleClosedFileDeleted),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::NewFileCreated => 0x004,
            Self::FileOverwritten => 0x008,
            Self::PreSetHardlink => 0x040,
            Self::FileRenamed => 0x080,
            Self::HandleClosedFileModified => 0x400,
            Self::HandleClosedFileDeleted => 0x800,
        }
    }
}

pub(crate) struct NotificationRouter {
    tree: Arc<dyn InodeTree>,
}

impl NotificationRouter {
    pub fn new(tree: Arc<dyn InodeTree>) -> Self {
        Self { tree }
    }

    /// Apply the tree mutation for one notification. The mutation is
    /// awaited before returning, so the caller never observes
    /// partial completion.
    pub async fn route(
        &self,
        kind: NotificationKind,
        source: &RelPath,
        dest: &RelPath,
        is_directory: bool,
    ) -> DispatchResult<()> {
        match kind {
            NotificationKind::NewFileCreated => {
                debug!(target: "lensfs::notify", path = %source, "new file created");
                self.create(source, is_directory).await
            }
            NotificationKind::FileOverwritten => {
                debug!(target: "lensfs::notify", path = %source, "file overwritten");
                self.materialize(source).await
            }
            NotificationKind::HandleClosedFileModified => {
                debug!(target: "lensfs::notify", path = %source, "handle closed, file modified");
                self.materialize(source).await
            }
            NotificationKind::FileRenamed => {
                debug!(target: "lensfs::notify", from = %source, to = %dest, "file renamed");
                self.rename(source, dest, is_directory).await
            }
            NotificationKind::HandleClosedFileDeleted => {
                debug!(target: "lensfs::notify", path = %source, "handle closed, file deleted");
                self.remove(source, is_directory).await
            }
            NotificationKind::PreSetHardlink => {
                debug!(target: "lensfs::notify", path = %source, "hard link refused");
                Err(DispatchError::HardLinksUnsupported(source.clone()))
            }
        }
    }

    async fn create(&self, path: &RelPath, is_directory: bool) -> DispatchResult<()> {
        let (parent, name) =
            path.parent_and_name().ok_or_else(|| DispatchError::NoParent(path.clone()))?;
        self.tree.create_entry(&parent, name, is_directory).await?;
        Ok(())
    }

    async fn materialize(&self, path: &RelPath) -> DispatchResult<()> {
        self.tree.materialize(path).await?;
        Ok(())
    }

    async fn remove(&self, path: &RelPath, is_directory: bool) -> DispatchResult<()> {
        let (parent, name) =
            path.parent_and_name().ok_or_else(|| DispatchError::NoParent(path.clone()))?;
        self.tree.remove_entry(&parent, name, is_directory).await?;
        Ok(())
    }

    /// An empty source or destination marks movement across the
    /// projection boundary: treat it as plain creation or removal.
    /// For a true rename both parent directories are resolved
    /// concurrently before the tree-level rename runs. If the rename
    /// itself then fails there is no rollback; partial-failure
    /// recovery is explicitly not guaranteed.
    async fn rename(&self, source: &RelPath, dest: &RelPath, is_directory: bool) -> DispatchResult<()> {
        if source.is_empty() {
            return self.create(dest, is_directory).await;
        }
        if dest.is_empty() {
            return self.remove(source, is_directory).await;
        }

        let (src_parent, src_name) =
            source.parent_and_name().ok_or_else(|| DispatchError::NoParent(source.clone()))?;
        let (dst_parent, dst_name) =
            dest.parent_and_name().ok_or_else(|| DispatchError::NoParent(dest.clone()))?;

        try_join!(self.tree.lookup(&src_parent), self.tree.lookup(&dst_parent))?;
        self.tree.rename_entry(&src_parent, src_name, &dst_parent, dst_name).await?;
        Ok(())
    }
}
