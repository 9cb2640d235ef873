// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! LensFS projection dispatcher
//!
//! LensFS presents a version-controlled working copy as a directory
//! that appears to exist on disk but is materialized on demand from
//! a versioned tree store. This crate is the dispatcher layer: it
//! receives the synchronous callbacks of the OS filesystem
//! virtualization service (directory enumeration, metadata lookup,
//! file-data reads, change notifications) and translates them into
//! operations against an asynchronous inode-tree collaborator.
//!
//! The tree itself, the backing store, and the mount lifecycle live
//! elsewhere; they reach this crate through the [`tree::InodeTree`]
//! and [`host::VirtualizationHost`] contracts.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod notify;
pub mod tree;
pub mod types;

mod enumeration;
mod resolver;
mod transfer;

pub mod testing;

#[cfg(test)]
mod test_dispatcher;

// Re-export key types
pub use config::{MountLocations, VIRTUAL_CONFIG_PATH};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult, HostStatus};
pub use host::{EntrySink, TransferBuffer, VirtualizationHost};
pub use notify::NotificationKind;
pub use transfer::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use tree::{InodeTree, NodeHandle, NodeStat, TreeError, TreeResult};
pub use types::{DataStreamId, EnumerationId, FileMetadata, RelPath};
