// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Dispatcher façade
//!
//! The single entry point the host virtualization service calls
//! into. The host contract is synchronous request/response with no
//! pending results, so every asynchronous inode-tree operation is
//! awaited on the calling thread before the entry point returns.
//! Nothing but a [`HostStatus`] ever crosses this boundary.

use std::borrow::Cow;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::config::{self, MountLocations};
use crate::enumeration::{Enumerator, SessionTable};
use crate::error::{DispatchError, DispatchResult, HostStatus};
use crate::host::{EntrySink, VirtualizationHost};
use crate::notify::{NotificationKind, NotificationRouter};
use crate::resolver::MetadataResolver;
use crate::transfer::TransferEngine;
use crate::tree::{InodeTree, TreeError};
use crate::types::{DataStreamId, EnumerationId, RelPath};

pub struct Dispatcher {
    tree: Arc<dyn InodeTree>,
    host: Arc<dyn VirtualizationHost>,
    sessions: SessionTable,
    resolver: MetadataResolver,
    transfer: TransferEngine,
    router: NotificationRouter,
    virtual_config: Arc<Vec<u8>>,
    virtual_path: RelPath,
    runtime: Handle,
}

impl Dispatcher {
    /// Wire up a dispatcher for one mount. The virtual config
    /// payload is rendered here, once, and is immutable for the
    /// dispatcher's lifetime.
    pub fn new(
        tree: Arc<dyn InodeTree>,
        host: Arc<dyn VirtualizationHost>,
        locations: &MountLocations,
        runtime: Handle,
    ) -> DispatchResult<Self> {
        let virtual_config = Arc::new(config::render_virtual_config(locations)?);
        let virtual_path = config::virtual_config_path();

        info!(
            target: "lensfs::dispatch",
            root = %locations.root.display(),
            "creating projection dispatcher"
        );

        Ok(Self {
            resolver: MetadataResolver::new(
                Arc::clone(&tree),
                virtual_path.clone(),
                virtual_config.len() as u64,
            ),
            transfer: TransferEngine::new(Arc::clone(&host)),
            router: NotificationRouter::new(Arc::clone(&tree)),
            sessions: SessionTable::new(),
            tree,
            host,
            virtual_config,
            virtual_path,
            runtime,
        })
    }

    /// Begin a directory enumeration: snapshot the child entries of
    /// `path` and register the session under `id`.
    pub fn start_enumeration(&self, id: EnumerationId, path: &RelPath) -> HostStatus {
        debug!(target: "lensfs::enum", %id, %path, "start enumeration");
        let result = (|| {
            let mut entries = Vec::new();
            self.tree.enumerate_children(path, &mut entries)?;
            self.sessions.insert(id, Enumerator::new(path.clone(), entries))
        })();
        self.reply("start_enumeration", result)
    }

    /// Stream snapshot entries into the host's bounded sink,
    /// resuming at the cursor left by the previous call. A restart
    /// rewinds the cursor and opens a new expression generation.
    /// An unknown session id is expected here (the host may probe
    /// before start) and is not escalated.
    pub fn get_enumeration_data(
        &self,
        id: EnumerationId,
        search_expression: Option<&str>,
        restart: bool,
        sink: &mut dyn EntrySink,
    ) -> HostStatus {
        let served = self.sessions.with_session(id, |session| {
            debug!(
                target: "lensfs::enum",
                %id,
                path = %session.path(),
                restart,
                "continue enumeration"
            );
            if session.is_search_expression_empty() || restart {
                session.save_expression(search_expression);
            }
            if restart {
                session.restart();
            }

            while let Some(entry) = session.current() {
                debug!(
                    target: "lensfs::enum",
                    %id,
                    name = %entry.name,
                    is_directory = entry.is_directory,
                    size = entry.size,
                    "fill entry"
                );
                if !sink.try_fill(entry) {
                    // Out of buffer space; this entry did not make
                    // it. Leave the cursor so the next call resumes
                    // here.
                    break;
                }
                session.advance();
            }
        });

        match served {
            Some(()) => HostStatus::Ok,
            None => {
                debug!(target: "lensfs::enum", %id, "enumeration session not found");
                HostStatus::InvalidParameter
            }
        }
    }

    /// Tear down the session for `id`.
    pub fn end_enumeration(&self, id: EnumerationId) -> HostStatus {
        debug!(target: "lensfs::enum", %id, "end enumeration");
        self.reply("end_enumeration", self.sessions.remove(id))
    }

    /// Resolve `path` and register a placeholder with the host. The
    /// placeholder carries the canonical spelling of the path.
    pub fn get_file_info(&self, path: &RelPath) -> HostStatus {
        let resolved = self.runtime.block_on(self.resolver.resolve(path));
        match resolved {
            Ok(Some(metadata)) => {
                debug!(
                    target: "lensfs::resolve",
                    name = %metadata.name,
                    is_directory = metadata.is_directory,
                    size = metadata.size,
                    "placeholder"
                );
                if let Err(status) = self.host.write_placeholder(&metadata) {
                    warn!(
                        target: "lensfs::resolve",
                        %path,
                        ?status,
                        "host placeholder write failed"
                    );
                    return status;
                }
                HostStatus::Ok
            }
            Ok(None) => HostStatus::NotFound,
            Err(err) => self.reply("get_file_info", Err(err)),
        }
    }

    /// Existence check for `path`, honoring the virtual config file.
    pub fn query_file_name(&self, path: &RelPath) -> HostStatus {
        match self.runtime.block_on(self.resolver.query_file_name(path)) {
            Ok(true) => HostStatus::Ok,
            Ok(false) => HostStatus::NotFound,
            Err(err) => self.reply("query_file_name", Err(err)),
        }
    }

    /// Deliver file content for `path` to host-owned storage in
    /// alignment-compliant writes.
    pub fn get_file_data(
        &self,
        path: &RelPath,
        stream: DataStreamId,
        byte_offset: u64,
        length: u32,
    ) -> HostStatus {
        let content: Cow<'_, [u8]> = match self.runtime.block_on(self.tree.read_whole_file(path)) {
            Ok(bytes) => Cow::Owned(bytes),
            Err(TreeError::NotFound) if *path == self.virtual_path => {
                Cow::Borrowed(self.virtual_config.as_slice())
            }
            Err(err) => return self.reply("get_file_data", Err(err.into())),
        };

        self.reply(
            "get_file_data",
            self.transfer.deliver(stream, &content, byte_offset, length),
        )
    }

    /// Apply the tree mutation for one host change notification.
    /// `raw_kind` is the host's numeric notification code; codes
    /// outside the supported set fail with invalid-parameter and
    /// mutate nothing.
    pub fn notification(
        &self,
        raw_kind: u32,
        source: &RelPath,
        dest: &RelPath,
        is_directory: bool,
    ) -> HostStatus {
        let Some(kind) = NotificationKind::from_raw(raw_kind) else {
            return self.reply("notification", Err(DispatchError::UnknownNotification(raw_kind)));
        };

        let result = self.runtime.block_on(self.router.route(kind, source, dest, is_directory));
        self.reply("notification", result)
    }

    /// The error boundary: translate any internal failure to its
    /// host status. Benign not-found results are logged at debug;
    /// everything else is an error worth surfacing.
    fn reply(&self, op: &'static str, result: DispatchResult<()>) -> HostStatus {
        match result {
            Ok(()) => HostStatus::Ok,
            Err(err) => {
                let status = err.to_status();
                if status == HostStatus::NotFound {
                    debug!(target: "lensfs::dispatch", op, %err, "not found");
                } else {
                    error!(target: "lensfs::dispatch", op, %err, ?status, "request failed");
                }
                status
            }
        }
    }
}
