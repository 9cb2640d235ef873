// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Chunked file-data delivery
//!
//! The host's storage device requires writes aligned to its reported
//! block size, and transfer buffers must come from the host so they
//! meet the same constraint. Small files are sent whole, mid-size
//! requests as-is, and only oversized requests pay for alignment
//! math and multi-chunk copying.

use std::sync::Arc;
use tracing::error;

use crate::error::{DispatchError, DispatchResult};
use crate::host::VirtualizationHost;
use crate::types::DataStreamId;

/// Files at or below this size are transferred whole, ignoring the
/// requested range.
pub const MIN_CHUNK_SIZE: u64 = 512 * 1024;

/// Requests above this size are split into alignment-sized chunks.
pub const MAX_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Round `offset` down to a multiple of `alignment` (a power of
/// two).
fn block_align_truncate(offset: u64, alignment: u32) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    offset & !(u64::from(alignment) - 1)
}

pub(crate) struct TransferEngine {
    host: Arc<dyn VirtualizationHost>,
}

impl TransferEngine {
    pub fn new(host: Arc<dyn VirtualizationHost>) -> Self {
        Self { host }
    }

    /// Deliver `content[byte_offset..byte_offset + length]` to the
    /// host in one or more alignment-compliant writes. The requested
    /// range is clamped to the content so a host read past EOF never
    /// indexes out of bounds.
    pub fn deliver(
        &self,
        stream: DataStreamId,
        content: &[u8],
        byte_offset: u64,
        length: u32,
    ) -> DispatchResult<()> {
        let content_len = content.len() as u64;
        let length = u64::from(length).min(content_len.saturating_sub(byte_offset));

        if content_len <= MIN_CHUNK_SIZE {
            // Small file: send the whole thing from offset 0, no
            // range math.
            self.write_chunks(stream, content, 0, content_len, content_len as usize)
        } else if length <= MAX_CHUNK_SIZE {
            self.write_chunks(stream, content, byte_offset, length, length as usize)
        } else {
            let alignment = self.host.write_alignment().map_err(DispatchError::Host)?;
            let end_offset = block_align_truncate(byte_offset + MAX_CHUNK_SIZE, alignment);
            debug_assert!(end_offset > byte_offset);
            let chunk_size = (end_offset - byte_offset) as usize;
            self.write_chunks(stream, content, byte_offset, length, chunk_size)
        }
    }

    /// Copy `length` bytes of `content` starting at `start_offset`
    /// through one host-allocated buffer, `chunk_size` bytes per
    /// write. The buffer is dropped when this call returns.
    fn write_chunks(
        &self,
        stream: DataStreamId,
        content: &[u8],
        start_offset: u64,
        length: u64,
        chunk_size: usize,
    ) -> DispatchResult<()> {
        if length == 0 {
            return Ok(());
        }

        let mut buffer = self
            .host
            .allocate_aligned_buffer(chunk_size)
            .ok_or(DispatchError::OutOfMemory)?;

        let mut offset = start_offset;
        let mut remaining = length;
        while remaining > 0 {
            let copy_size = remaining.min(chunk_size as u64) as usize;
            let source = &content[offset as usize..offset as usize + copy_size];
            buffer.as_mut_slice()[..copy_size].copy_from_slice(source);

            if let Err(status) = self.host.write_data(stream, &buffer.as_slice()[..copy_size], offset)
            {
                error!(
                    target: "lensfs::transfer",
                    %stream,
                    offset,
                    copy_size,
                    ?status,
                    "host data write failed"
                );
                return Err(DispatchError::Host(status));
            }

            remaining -= copy_size as u64;
            offset += copy_size as u64;
        }

        Ok(())
    }
}
