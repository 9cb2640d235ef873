// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test-only collaborator doubles for the dispatcher
//!
//! Provides an in-memory inode tree with mutation counting, a
//! recording virtualization host with failure injection, and a
//! capacity-limited entry sink, so dispatcher behavior can be tested
//! without a real mount.
