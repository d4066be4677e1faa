// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Snapshot resolution.
//!
//! Materialize a working copy of the source repository checked out at the one
//! commit implied by a ref, and optionally a target day.
//!
//! # Resolution Steps
//!
//! Resolution always runs in the same order, each step relying on the one
//! before it:
//!
//! 1. __Acquire__: clone the repository unless the working copy already
//!    exists. An existing working copy is reused as is.
//! 2. __Sync__: fetch the remote, always. Date resolution on stale history
//!    could pick the wrong commit.
//! 3. __Resolve__: turn the ref, and target day if any, into one commit
//!    identifier. See [`date`] for how a day selects a commit.
//! 4. __Checkout__: detach the working copy at that commit.
//!
//! Cleanup is never part of resolution. Callers decide whether the working
//! copy survives a run, so failed runs can be inspected.

pub mod client;
pub mod date;

use crate::{
    config::CloneStrategy,
    snapshot::{
        client::{ClientError, RepositoryClient},
        date::{select_before, TargetDate},
    },
};

use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    fs::remove_dir_all,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Source repository and the local path of its working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    /// Remote URL of the repository.
    pub url: String,

    /// Local working copy path.
    pub path: PathBuf,

    /// Name of the remote to fetch from.
    pub remote: String,

    /// How much of the repository to transfer on clone.
    pub clone: CloneStrategy,
}

impl RepositoryHandle {
    /// Construct new repository handle with default remote and clone strategy.
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            remote: "origin".into(),
            clone: CloneStrategy::default(),
        }
    }
}

/// Ref to snapshot, optionally as of a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    /// Branch, tag, or commit identifier.
    pub name: String,

    /// Target day.
    pub date: Option<TargetDate>,
}

impl RefSpec {
    pub fn new(name: impl Into<String>, date: Option<TargetDate>) -> Self {
        Self {
            name: name.into(),
            date,
        }
    }
}

/// Commit a working copy is checked out at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    /// Full commit identifier.
    pub id: String,

    /// Abbreviated commit identifier.
    pub short_id: String,

    /// Author time of the commit.
    pub author_date: DateTime<Utc>,
}

impl ResolvedCommit {
    /// Author time as an RFC 3339 UTC timestamp, e.g., `2024-01-14T18:03:27Z`.
    pub fn author_date_rfc3339(&self) -> String {
        self.author_date.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Resolve snapshots of one repository.
#[derive(Debug)]
pub struct SnapshotResolver<C>
where
    C: RepositoryClient,
{
    client: C,
    handle: RepositoryHandle,
}

impl<C> SnapshotResolver<C>
where
    C: RepositoryClient,
{
    /// Construct new snapshot resolver.
    pub fn new(client: C, handle: RepositoryHandle) -> Self {
        Self { client, handle }
    }

    /// Repository this resolver works on.
    pub fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }

    /// Run every resolution step in order, returning the commit checked out.
    ///
    /// # Errors
    ///
    /// - Return [`SnapshotError`] from whichever step fails first.
    pub fn resolve(&self, spec: &RefSpec) -> Result<String> {
        self.acquire()?;
        self.sync()?;
        let commit = self.resolve_commit(spec)?;
        self.checkout(&commit)?;

        Ok(commit)
    }

    /// Make sure a working copy exists.
    ///
    /// Clones the repository if the working copy path is missing, or does not
    /// hold a valid repository. Otherwise the existing working copy is reused.
    ///
    /// An empty directory at the path is cloned into. A non-empty directory
    /// without a repository is left untouched, and the clone into it fails.
    ///
    /// # Errors
    ///
    /// - Return [`SnapshotError::Acquisition`] if clone fails, including when
    ///   the path is a non-empty directory that holds no repository.
    #[instrument(skip(self), level = "debug")]
    pub fn acquire(&self) -> Result<()> {
        let path = self.handle.path.as_path();
        if self.client.is_repository(path) {
            info!("reuse working copy at {:?}", path.display());
            return Ok(());
        }

        info!("clone {} into {:?}", self.handle.url, path.display());
        self.client
            .clone_repository(&self.handle.url, path, self.handle.clone)
            .map_err(|source| SnapshotError::Acquisition {
                url: self.handle.url.clone(),
                path: path.to_path_buf(),
                source,
            })
    }

    /// Fetch latest history from remote.
    ///
    /// # Errors
    ///
    /// - Return [`SnapshotError::Sync`] if fetch fails.
    #[instrument(skip(self), level = "debug")]
    pub fn sync(&self) -> Result<()> {
        info!("fetch {}", self.handle.remote);
        self.client
            .fetch(&self.handle.path, &self.handle.remote)
            .map_err(|source| SnapshotError::Sync {
                remote: self.handle.remote.clone(),
                source,
            })
    }

    /// Resolve ref and optional target day to a full commit identifier.
    ///
    /// Without a target day the ref itself is resolved. With a target day the
    /// latest commit reachable from the ref strictly before one second past
    /// midnight UTC of that day is selected.
    ///
    /// # Errors
    ///
    /// - Return [`SnapshotError::UnknownRef`] if ref cannot be resolved.
    /// - Return [`SnapshotError::NoCommitBeforeDate`] if no commit qualifies.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve_commit(&self, spec: &RefSpec) -> Result<String> {
        let path = self.handle.path.as_path();
        let rev = self.tracking_ref(&spec.name);
        let unknown_ref = |source| SnapshotError::UnknownRef {
            name: spec.name.clone(),
            source,
        };

        let Some(date) = spec.date else {
            let commit = self.client.rev_parse(path, &rev).map_err(unknown_ref)?;
            info!("resolved {} to {commit}", spec.name);
            return Ok(commit);
        };

        let instant = date.normalize();
        let history = self.client.history(path, &rev).map_err(unknown_ref)?;
        let stamp = select_before(&history, instant).ok_or_else(|| {
            SnapshotError::NoCommitBeforeDate {
                name: spec.name.clone(),
                instant,
            }
        })?;
        info!(
            "resolved {} as of {} to {} authored at {}",
            spec.name,
            instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            stamp.id,
            stamp.time.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        Ok(stamp.id.clone())
    }

    /// Revision to resolve for a ref name.
    ///
    /// Sync only moves remote-tracking branches. A bare branch name like
    /// `main` is resolved through `refs/remotes/<remote>/main` whenever that
    /// exists, so a local branch left behind by an earlier clone is never
    /// used. Anything else, e.g., tags, commit identifiers, or names already
    /// qualified with the remote, is resolved as given.
    fn tracking_ref(&self, name: &str) -> String {
        let remote = self.handle.remote.as_str();
        let qualified = name
            .strip_prefix(remote)
            .is_some_and(|rest| rest.starts_with('/'));
        if qualified || name.starts_with("refs/") {
            return name.to_string();
        }

        let tracking = format!("refs/remotes/{remote}/{name}");
        if self.client.rev_parse(&self.handle.path, &tracking).is_err() {
            return name.to_string();
        }
        debug!("resolve {name} through {tracking}");

        tracking
    }

    /// Detach working copy at target commit.
    ///
    /// # Errors
    ///
    /// - Return [`SnapshotError::Checkout`] if checkout fails.
    #[instrument(skip(self), level = "debug")]
    pub fn checkout(&self, commit: &str) -> Result<()> {
        debug!("checkout {commit}");
        self.client
            .checkout_detached(&self.handle.path, commit)
            .map_err(|source| SnapshotError::Checkout {
                commit: commit.to_string(),
                source,
            })
    }

    /// Remove working copy from disk.
    pub fn cleanup(&self) {
        cleanup(&self.handle.path)
    }
}

/// Remove working copy at path from disk.
///
/// Best-effort. A missing path is fine, and any other failure is only
/// logged.
#[instrument(level = "debug")]
pub fn cleanup(path: &Path) {
    match remove_dir_all(path) {
        Ok(()) => info!("removed working copy at {:?}", path.display()),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!("no working copy at {:?}", path.display())
        }
        Err(error) => warn!("cannot remove working copy at {:?}: {error}", path.display()),
    }
}

/// All possible error types for snapshot resolution.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Repository could not be cloned.
    #[error("cannot clone {url} into {path:?}")]
    Acquisition {
        url: String,
        path: PathBuf,
        #[source]
        source: ClientError,
    },

    /// Latest history could not be fetched.
    #[error("cannot fetch latest history from remote {remote}")]
    Sync {
        remote: String,
        #[source]
        source: ClientError,
    },

    /// Ref does not name a commit.
    #[error("cannot resolve ref {name}")]
    UnknownRef {
        name: String,
        #[source]
        source: ClientError,
    },

    /// No commit on ref precedes target instant.
    #[error("no commit on {name} before {instant}")]
    NoCommitBeforeDate {
        name: String,
        instant: DateTime<Utc>,
    },

    /// Working copy could not be switched to commit.
    #[error("cannot checkout commit {commit}")]
    Checkout {
        commit: String,
        #[source]
        source: ClientError,
    },
}

/// Friendly result alias :3
type Result<T, E = SnapshotError> = std::result::Result<T, E>;
