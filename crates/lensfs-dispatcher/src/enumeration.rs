// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Resumable directory-enumeration sessions
//!
//! The host enumerates a directory with a start/continue/end triple
//! of calls correlated by an opaque id. The entry list is snapshotted
//! at start time; continue calls drain it through a bounded sink and
//! may restart or refine the search expression. Concurrent tree
//! mutations after start are deliberately not reflected.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::error::{DispatchError, DispatchResult};
use crate::types::{EnumerationId, FileMetadata, RelPath};

const MATCH_ALL_EXPRESSION: &str = "*";

/// One in-progress directory listing.
#[derive(Debug)]
pub(crate) struct Enumerator {
    path: RelPath,
    entries: Vec<FileMetadata>,
    cursor: usize,
    search_expression: Option<String>,
}

impl Enumerator {
    pub fn new(path: RelPath, entries: Vec<FileMetadata>) -> Self {
        Self {
            path,
            entries,
            cursor: 0,
            search_expression: None,
        }
    }

    pub fn path(&self) -> &RelPath {
        &self.path
    }

    pub fn is_search_expression_empty(&self) -> bool {
        self.search_expression.is_none()
    }

    /// Set once per generation; a restart opens a new generation.
    pub fn save_expression(&mut self, expression: Option<&str>) {
        self.search_expression = Some(expression.unwrap_or(MATCH_ALL_EXPRESSION).to_string());
    }

    #[cfg(test)]
    pub fn search_expression(&self) -> Option<&str> {
        self.search_expression.as_deref()
    }

    /// The entry at the cursor, or `None` once the snapshot is
    /// drained.
    pub fn current(&self) -> Option<&FileMetadata> {
        self.entries.get(self.cursor)
    }

    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
    }

    /// Rewind to the first entry. The snapshot itself is not
    /// re-fetched.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

/// Registry of live enumeration sessions, scoped to the mount.
///
/// Lookups take the table read lock so independent sessions proceed
/// concurrently; insert and erase are exclusive. Each session sits
/// behind its own mutex: the host serializes calls per id, but a
/// torn cursor must be impossible even if it does not.
pub(crate) struct SessionTable {
    sessions: RwLock<HashMap<EnumerationId, Mutex<Enumerator>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session. A duplicate id means the host broke
    /// the start/end pairing contract.
    pub fn insert(&self, id: EnumerationId, enumerator: Enumerator) -> DispatchResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.entry(id) {
            Entry::Occupied(_) => Err(DispatchError::SessionExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(Mutex::new(enumerator));
                Ok(())
            }
        }
    }

    /// Remove a session at end-enumeration. An unknown id is a
    /// contract violation; the host must pair start and end.
    pub fn remove(&self, id: EnumerationId) -> DispatchResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DispatchError::SessionMissing(id)),
        }
    }

    /// Run `f` against the session for `id`, or `None` if no such
    /// session exists (a benign condition on the continue path).
    pub fn with_session<R>(
        &self,
        id: EnumerationId,
        f: impl FnOnce(&mut Enumerator) -> R,
    ) -> Option<R> {
        let sessions = self.sessions.read().unwrap();
        let session = sessions.get(&id)?;
        let mut session = session.lock().unwrap();
        Some(f(&mut session))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}
