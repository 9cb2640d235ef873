// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The synthesized `.lensfs/config` virtual file
//!
//! Every mount exposes one dotfile describing its own locations so
//! tools inside the projected tree can find the control socket. The
//! file never exists in the inode tree; the dispatcher serves it
//! from a payload rendered once at construction time.

use serde::Serialize;
use std::path::PathBuf;

use crate::types::RelPath;

/// Fixed relative path of the synthesized config file.
pub const VIRTUAL_CONFIG_PATH: &str = ".lensfs/config";

pub fn virtual_config_path() -> RelPath {
    RelPath::new(VIRTUAL_CONFIG_PATH)
}

/// Locations describing one mount, supplied by the mount layer.
#[derive(Clone, Debug)]
pub struct MountLocations {
    /// Where the projected tree appears on disk.
    pub root: PathBuf,
    /// The mount's control socket.
    pub socket: PathBuf,
    /// The client state directory backing the working copy.
    pub client: PathBuf,
}

#[derive(Serialize)]
struct ConfigDocument<'a> {
    #[serde(rename = "Config")]
    config: ConfigTable<'a>,
}

#[derive(Serialize)]
struct ConfigTable<'a> {
    root: &'a str,
    socket: &'a str,
    client: &'a str,
}

/// Render the virtual config payload. Called once per mount; the
/// result is immutable for the dispatcher's lifetime.
pub fn render_virtual_config(locations: &MountLocations) -> Result<Vec<u8>, toml::ser::Error> {
    let root = locations.root.to_string_lossy();
    let socket = locations.socket.to_string_lossy();
    let client = locations.client.to_string_lossy();
    let document = ConfigDocument {
        config: ConfigTable {
            root: &root,
            socket: &socket,
            client: &client,
        },
    };
    toml::to_string(&document).map(String::into_bytes)
}
