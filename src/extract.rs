// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Inventory extraction.
//!
//! Once a working copy sits at the resolved commit, three independent pieces
//! of data are pulled out of it:
//!
//! 1. The __inventory__, computed by an external tool that prints one JSON
//!    document on stdout.
//! 2. The __redirect table__, parsed from a flat text file. See
//!    [`redirects`].
//! 3. The __provenance__ of the checked-out commit.
//!
//! None of them depends on another, and none modifies the working copy. Any
//! failure aborts extraction, so there is never a partial artifact.

pub mod redirects;
pub mod tool;

use crate::{
    artifact::InventoryArtifact,
    config::{RedirectSettings, ToolSettings},
    extract::{redirects::RedirectTable, tool::InventoryToolRunner},
    snapshot::{
        client::{ClientError, RepositoryClient},
        ResolvedCommit,
    },
};

use serde_json::Value;
use std::{io::ErrorKind, path::PathBuf};
use tracing::{debug, info, instrument, warn};

/// Extract inventory artifacts from a resolved working copy.
#[derive(Debug)]
pub struct InventoryExtractor<C, R>
where
    C: RepositoryClient,
    R: InventoryToolRunner,
{
    client: C,
    runner: R,
    work_dir: PathBuf,
    redirects: RedirectSettings,
    tool: ToolSettings,
}

impl<C, R> InventoryExtractor<C, R>
where
    C: RepositoryClient,
    R: InventoryToolRunner,
{
    /// Construct new inventory extractor for working copy.
    pub fn new(
        client: C,
        runner: R,
        work_dir: impl Into<PathBuf>,
        redirects: RedirectSettings,
        tool: ToolSettings,
    ) -> Self {
        Self {
            client,
            runner,
            work_dir: work_dir.into(),
            redirects,
            tool,
        }
    }

    /// Install dependencies of inventory tool.
    ///
    /// Does nothing if no install command is configured.
    ///
    /// # Errors
    ///
    /// - Return [`ExtractError::DependencyInstall`] if install command fails.
    #[instrument(skip(self), level = "debug")]
    pub fn install_dependencies(&self) -> Result<()> {
        let Some((program, args)) = self
            .tool
            .install
            .as_deref()
            .and_then(|command| command.split_first())
        else {
            debug!("no install command configured");
            return Ok(());
        };

        info!("install inventory tool dependencies with {program}");
        let failure = |reason: String, stderr: String| ExtractError::DependencyInstall {
            program: program.clone(),
            reason,
            stderr,
        };
        let output = self
            .runner
            .run(program, args, &self.work_dir)
            .map_err(|error| failure(error.to_string(), String::new()))?;
        if !output.success {
            return Err(failure(output.describe_exit(), output.stderr));
        }

        Ok(())
    }

    /// Run inventory tool over working copy and parse its output.
    ///
    /// # Errors
    ///
    /// - Return [`ExtractError::InventoryComputation`] if the tool cannot be
    ///   run, exits with non-zero status, or prints something that is not
    ///   JSON.
    #[instrument(skip(self), level = "debug")]
    pub fn run_inventory_tool(&self) -> Result<Value> {
        let program = &self.tool.program;
        info!("compute inventory with {program}");
        let failure = |reason: String, stderr: String| ExtractError::InventoryComputation {
            program: program.clone(),
            reason,
            stderr,
        };

        let output = self
            .runner
            .run(program, &self.tool.args, &self.work_dir)
            .map_err(|error| failure(error.to_string(), String::new()))?;
        if !output.success {
            return Err(failure(output.describe_exit(), output.stderr));
        }

        if !output.stderr.is_empty() {
            debug!("{program} stderr:\n{}", output.stderr.trim_end());
        }

        // INVARIANT: Parse the whole of stdout, a partial document is a failure.
        serde_json::from_slice(&output.stdout)
            .map_err(|error| failure(error.to_string(), output.stderr))
    }

    /// Read redirect table from working copy.
    ///
    /// Returns an empty table without touching the file system when redirect
    /// capture is disabled.
    ///
    /// # Errors
    ///
    /// - Return [`ExtractError::RedirectFileMissing`] if redirect file does
    ///   not exist.
    /// - Return [`ExtractError::RedirectRead`] if redirect file cannot be read.
    #[instrument(skip(self), level = "debug")]
    pub fn read_redirects(&self) -> Result<RedirectTable> {
        if !self.redirects.capture {
            warn!("redirect capture disabled, artifact will carry no redirects");
            return Ok(RedirectTable::new());
        }

        let path = self.work_dir.join(&self.redirects.path);
        let table = RedirectTable::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ExtractError::RedirectFileMissing { path: path.clone() },
            _ => ExtractError::RedirectRead {
                path: path.clone(),
                source,
            },
        })?;
        info!("read {} redirects from {:?}", table.len(), path.display());

        Ok(table)
    }

    /// Read provenance of checked-out commit.
    ///
    /// # Errors
    ///
    /// - Return [`ExtractError::ProvenanceUnavailable`] if the commit cannot
    ///   be read.
    #[instrument(skip(self), level = "debug")]
    pub fn read_provenance(&self) -> Result<ResolvedCommit> {
        let commit = self
            .client
            .head_commit(&self.work_dir)
            .map_err(|source| ExtractError::ProvenanceUnavailable {
                path: self.work_dir.clone(),
                source,
            })?;
        info!(
            "snapshot at {} authored {}",
            commit.short_id,
            commit.author_date_rfc3339()
        );

        Ok(commit)
    }

    /// Gather inventory, redirects, and provenance into one artifact.
    ///
    /// # Errors
    ///
    /// - Return [`ExtractError`] from whichever part fails first.
    pub fn assemble(&self) -> Result<InventoryArtifact> {
        let provenance = self.read_provenance()?;
        let redirects = self.read_redirects()?;
        let inventory = self.run_inventory_tool()?;

        Ok(InventoryArtifact::assemble(&provenance, inventory, redirects))
    }
}

/// All possible error types for inventory extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Inventory tool dependencies could not be installed.
    #[error("cannot install inventory tool dependencies with {program}: {reason}\n{stderr}")]
    DependencyInstall {
        program: String,
        reason: String,
        stderr: String,
    },

    /// Inventory tool failed or printed something unusable.
    #[error("inventory tool {program} failed: {reason}\n{stderr}")]
    InventoryComputation {
        program: String,
        reason: String,
        stderr: String,
    },

    /// Redirect file does not exist.
    #[error("redirect file {path:?} does not exist")]
    RedirectFileMissing { path: PathBuf },

    /// Redirect file exists but cannot be read.
    #[error("cannot read redirect file {path:?}")]
    RedirectRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Checked-out commit cannot be read.
    #[error("cannot read commit checked out at {path:?}")]
    ProvenanceUnavailable {
        path: PathBuf,
        #[source]
        source: ClientError,
    },
}

/// Friendly result alias :3
type Result<T, E = ExtractError> = std::result::Result<T, E>;
