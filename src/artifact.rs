// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Inventory artifact layout.
//!
//! The artifact is the only thing a pipeline run persists. It is a single
//! JSON document:
//!
//! ```json
//! {
//!   "metadata": {
//!     "commit": "3f1c...",
//!     "commitShort": "3f1c2ab",
//!     "authorDate": "2024-01-14T18:03:27Z"
//!   },
//!   "inventory": { "...": "whatever the inventory tool printed" },
//!   "redirects": { "/en-US/docs/Old": "/en-US/docs/New" }
//! }
//! ```
//!
//! Published packages ship it as `index.json`.

use crate::{extract::redirects::RedirectTable, snapshot::ResolvedCommit};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs::write,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

/// File name used when the artifact is written into a directory.
pub const ARTIFACT_FILE_NAME: &str = "index.json";

/// Snapshot inventory with its provenance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InventoryArtifact {
    /// Commit the inventory was computed from.
    pub metadata: Metadata,

    /// Inventory exactly as the inventory tool printed it.
    pub inventory: Value,

    /// Redirect table at the same commit.
    pub redirects: RedirectTable,
}

impl InventoryArtifact {
    /// Combine extracted parts into one artifact.
    pub fn assemble(provenance: &ResolvedCommit, inventory: Value, redirects: RedirectTable) -> Self {
        Self {
            metadata: Metadata::from(provenance),
            inventory,
            redirects,
        }
    }

    /// Render artifact as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// - Return [`ArtifactError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write artifact to target path.
    ///
    /// If target path is an existing directory, the artifact is written to
    /// `index.json` inside of it. Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// - Return [`ArtifactError::Serialize`] if serialization fails.
    /// - Return [`ArtifactError::Write`] if artifact cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn write_to(&self, path: &Path) -> Result<PathBuf> {
        let path = if path.is_dir() {
            path.join(ARTIFACT_FILE_NAME)
        } else {
            path.to_path_buf()
        };

        let write_error = |source| ArtifactError::Write {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            mkdirp::mkdirp(parent).map_err(write_error)?;
        }
        write(&path, self.to_json()?).map_err(write_error)?;
        info!("wrote inventory artifact to {:?}", path.display());

        Ok(path)
    }
}

/// Provenance of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Full commit identifier.
    pub commit: String,

    /// Abbreviated commit identifier.
    pub commit_short: String,

    /// Author time of the commit as an RFC 3339 UTC timestamp.
    pub author_date: String,
}

impl From<&ResolvedCommit> for Metadata {
    fn from(commit: &ResolvedCommit) -> Self {
        Self {
            commit: commit.id.clone(),
            commit_short: commit.short_id.clone(),
            author_date: commit.author_date_rfc3339(),
        }
    }
}

/// All possible error types for artifact output.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Artifact could not be rendered as JSON.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Artifact could not be written to disk.
    #[error("cannot write artifact to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Friendly result alias :3
type Result<T, E = ArtifactError> = std::result::Result<T, E>;
