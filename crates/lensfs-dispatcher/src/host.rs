// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Host virtualization-service contract
//!
//! The OS-side shim implements these traits over the real
//! virtualization API. Host calls are synchronous and may fail with
//! a [`HostStatus`], which the dispatcher propagates unchanged.

use crate::error::HostStatus;
use crate::types::{DataStreamId, FileMetadata};

/// A transfer buffer allocated by the host, conforming to the
/// storage device's alignment requirements. Exclusively owned by one
/// data-transfer call; never cached or shared.
pub trait TransferBuffer: Send {
    fn as_slice(&self) -> &[u8];
    fn as_mut_slice(&mut self) -> &mut [u8];
}

impl TransferBuffer for Vec<u8> {
    fn as_slice(&self) -> &[u8] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

/// The bounded directory-entry buffer the host supplies to a
/// get-enumeration-data call. `try_fill` reports `false` when the
/// buffer is out of space; the entry that did not fit must be
/// offered again on the next call.
pub trait EntrySink {
    fn try_fill(&mut self, entry: &FileMetadata) -> bool;
}

/// Host-side operations the dispatcher depends on.
#[cfg_attr(test, mockall::automock)]
pub trait VirtualizationHost: Send + Sync {
    /// Register a placeholder for `metadata.name` (the canonical
    /// relative path) with the host's name cache.
    fn write_placeholder(&self, metadata: &FileMetadata) -> Result<(), HostStatus>;

    /// The write alignment required by the virtualization instance's
    /// storage device. Always a power of two.
    fn write_alignment(&self) -> Result<u32, HostStatus>;

    /// Allocate an alignment-conforming transfer buffer. `None`
    /// means the host is out of memory.
    fn allocate_aligned_buffer(&self, len: usize) -> Option<Box<dyn TransferBuffer>>;

    /// Write `buf` into host-owned storage at `offset` for the given
    /// data stream. `buf` must point into a buffer obtained from
    /// [`Self::allocate_aligned_buffer`].
    fn write_data(&self, stream: DataStreamId, buf: &[u8], offset: u64) -> Result<(), HostStatus>;
}
