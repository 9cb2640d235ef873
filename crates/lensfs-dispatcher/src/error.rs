// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the LensFS dispatcher

use crate::tree::TreeError;
use crate::types::{EnumerationId, RelPath};

/// Status codes returned to the host virtualization service. Every
/// entry point of the dispatcher resolves to exactly one of these;
/// nothing else crosses the callback boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostStatus {
    Ok,
    NotFound,
    InvalidParameter,
    AccessDenied,
    OutOfMemory,
    Io,
    Internal,
}

impl HostStatus {
    pub fn is_ok(self) -> bool {
        self == HostStatus::Ok
    }
}

/// Dispatcher-internal error type
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("not found")]
    NotFound,
    #[error("enumeration session already exists: {0}")]
    SessionExists(EnumerationId),
    #[error("no such enumeration session: {0}")]
    SessionMissing(EnumerationId),
    #[error("hard links are not supported: {0}")]
    HardLinksUnsupported(RelPath),
    #[error("unrecognized notification code: {0:#x}")]
    UnknownNotification(u32),
    #[error("path has no parent component: \"{0}\"")]
    NoParent(RelPath),
    #[error("host transfer buffer allocation failed")]
    OutOfMemory,
    #[error("host call failed with {0:?}")]
    Host(HostStatus),
    #[error("config serialization failed: {0}")]
    Config(#[from] toml::ser::Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl DispatchError {
    /// The single translation rule from internal failures to the
    /// host status boundary.
    pub fn to_status(&self) -> HostStatus {
        match self {
            DispatchError::NotFound => HostStatus::NotFound,
            // Duplicate start and unpaired end/continue are protocol
            // violations on the host's side, reported distinctly
            // from not-found.
            DispatchError::SessionExists(_) | DispatchError::SessionMissing(_) => {
                HostStatus::InvalidParameter
            }
            DispatchError::HardLinksUnsupported(_) => HostStatus::AccessDenied,
            DispatchError::UnknownNotification(_) | DispatchError::NoParent(_) => {
                HostStatus::InvalidParameter
            }
            DispatchError::OutOfMemory => HostStatus::OutOfMemory,
            // Host API failures propagate unchanged, no retry.
            DispatchError::Host(status) => *status,
            DispatchError::Config(_) => HostStatus::Internal,
            DispatchError::Tree(TreeError::NotFound) => HostStatus::NotFound,
            DispatchError::Tree(TreeError::AccessDenied) => HostStatus::AccessDenied,
            DispatchError::Tree(TreeError::Io(_)) => HostStatus::Io,
            DispatchError::Tree(_) => HostStatus::Internal,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
