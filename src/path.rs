// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations for the files and directories the pipeline
//! needs to interact with.

use std::path::PathBuf;

/// Name of the directory the working copy is cloned into by default.
pub const DEFAULT_WORK_DIR: &str = "content";

/// Determine default path to the working copy of the source repository.
///
/// The working copy lives at a fixed path relative to the current directory,
/// so repeated runs from the same place reuse the same checkout.
pub fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

/// Determine default absolute path to the pipeline configuration file.
///
/// Uses XDG Base Directory path
/// `$XDG_CONFIG_HOME/inventory-snapshot/config.toml`. Does not check if the
/// path returned actually exists.
///
/// # Errors
///
/// - Return [`NoConfigHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("inventory-snapshot").join("config.toml"))
        .ok_or(NoConfigHome)
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoConfigHome;

/// Friendly result alias :3
pub type Result<T, E = NoConfigHome> = std::result::Result<T, E>;
