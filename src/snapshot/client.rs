// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Source repository access.
//!
//! Everything the snapshot resolver and the provenance reader need from the
//! source repository goes through [`RepositoryClient`]. The one real
//! implementation, [`GitCli`], shells out to the Git binary. libgit2 cannot
//! perform partial clones, nor open a repository created by one.

use crate::{
    config::CloneStrategy,
    snapshot::{date::CommitStamp, ResolvedCommit},
};

use chrono::{DateTime, Utc};
use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Command,
};
use tracing::{debug, instrument};

/// Layer of indirection for source repository access.
pub trait RepositoryClient {
    /// Check if path holds a usable working copy.
    fn is_repository(&self, path: &Path) -> bool;

    /// Clone repository at `url` into `path`.
    fn clone_repository(&self, url: &str, path: &Path, strategy: CloneStrategy) -> Result<()>;

    /// Fetch latest history of target remote.
    fn fetch(&self, path: &Path, remote: &str) -> Result<()>;

    /// Resolve revision to a full commit identifier.
    fn rev_parse(&self, path: &Path, rev: &str) -> Result<String>;

    /// List every commit reachable from revision with its author time,
    /// newest first.
    fn history(&self, path: &Path, rev: &str) -> Result<Vec<CommitStamp>>;

    /// Detach working copy at target commit.
    fn checkout_detached(&self, path: &Path, commit: &str) -> Result<()>;

    /// Read identity and author time of the checked-out commit.
    fn head_commit(&self, path: &Path) -> Result<ResolvedCommit>;
}

impl<T> RepositoryClient for &T
where
    T: RepositoryClient + ?Sized,
{
    fn is_repository(&self, path: &Path) -> bool {
        (**self).is_repository(path)
    }

    fn clone_repository(&self, url: &str, path: &Path, strategy: CloneStrategy) -> Result<()> {
        (**self).clone_repository(url, path, strategy)
    }

    fn fetch(&self, path: &Path, remote: &str) -> Result<()> {
        (**self).fetch(path, remote)
    }

    fn rev_parse(&self, path: &Path, rev: &str) -> Result<String> {
        (**self).rev_parse(path, rev)
    }

    fn history(&self, path: &Path, rev: &str) -> Result<Vec<CommitStamp>> {
        (**self).history(path, rev)
    }

    fn checkout_detached(&self, path: &Path, commit: &str) -> Result<()> {
        (**self).checkout_detached(path, commit)
    }

    fn head_commit(&self, path: &Path) -> Result<ResolvedCommit> {
        (**self).head_commit(path)
    }
}

/// Repository access through the Git binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl GitCli {
    /// Construct new Git client using target binary.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn gitcall(
        &self,
        path: Option<&Path>,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<String> {
        let mut bin_args: Vec<OsString> = Vec::new();
        if let Some(path) = path {
            bin_args.extend(["-C".into(), path.as_os_str().to_owned()]);
        }
        bin_args.extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));

        syscall_non_interactive(&self.program, bin_args)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl RepositoryClient for GitCli {
    fn is_repository(&self, path: &Path) -> bool {
        // INVARIANT: Only accept a working copy rooted at path itself, not
        // some parent repository that happens to contain it.
        if !path.join(".git").exists() {
            return false;
        }

        self.gitcall(Some(path), ["rev-parse", "--git-dir"]).is_ok()
    }

    #[instrument(skip(self), level = "debug")]
    fn clone_repository(&self, url: &str, path: &Path, strategy: CloneStrategy) -> Result<()> {
        let mut args: Vec<OsString> = vec!["clone".into()];
        if let Some(filter) = strategy.filter() {
            args.push(format!("--filter={filter}").into());
        }
        args.extend(["--".into(), url.into(), path.as_os_str().to_owned()]);

        self.gitcall(None, args)?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn fetch(&self, path: &Path, remote: &str) -> Result<()> {
        self.gitcall(Some(path), ["fetch", "--prune", remote])?;
        Ok(())
    }

    fn rev_parse(&self, path: &Path, rev: &str) -> Result<String> {
        self.gitcall(
            Some(path),
            ["rev-parse", "--verify", format!("{rev}^{{commit}}").as_str()],
        )
    }

    #[instrument(skip(self), level = "debug")]
    fn history(&self, path: &Path, rev: &str) -> Result<Vec<CommitStamp>> {
        let output = self.gitcall(Some(path), ["log", "--format=%at %H", rev, "--"])?;
        let history = output
            .lines()
            .map(|line| parse_stamp(line).ok_or_else(|| malformed("git log", line)))
            .collect::<Result<Vec<_>>>()?;
        debug!("{} commits reachable from {rev}", history.len());

        Ok(history)
    }

    #[instrument(skip(self), level = "debug")]
    fn checkout_detached(&self, path: &Path, commit: &str) -> Result<()> {
        self.gitcall(
            Some(path),
            [
                "-c",
                "advice.detachedHead=false",
                "checkout",
                "--quiet",
                "--detach",
                commit,
            ],
        )?;
        Ok(())
    }

    fn head_commit(&self, path: &Path) -> Result<ResolvedCommit> {
        let output = self.gitcall(
            Some(path),
            ["log", "-1", "--format=%H%x00%h%x00%at", "HEAD"],
        )?;

        let mut fields = output.split('\0');
        let (Some(id), Some(short_id), Some(author_time), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed("git log", &output));
        };
        let author_date =
            parse_epoch(author_time).ok_or_else(|| malformed("git log", &output))?;

        Ok(ResolvedCommit {
            id: id.to_string(),
            short_id: short_id.to_string(),
            author_date,
        })
    }
}

fn parse_stamp(line: &str) -> Option<CommitStamp> {
    let (time, id) = line.split_once(' ')?;
    Some(CommitStamp::new(id.trim(), parse_epoch(time)?))
}

fn parse_epoch(seconds: &str) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds.trim().parse().ok()?, 0)
}

fn malformed(command: &str, output: &str) -> ClientError {
    ClientError::MalformedOutput {
        command: command.to_string(),
        output: output.to_string(),
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let args = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect::<Vec<_>>();
    debug!("run {:?} {:?}", cmd.as_ref(), args);

    // INVARIANT: Never block on credential prompts.
    let output = Command::new(cmd.as_ref())
        .args(&args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

    if !output.status.success() {
        return Err(ClientError::Failed {
            command: format!("{} {}", cmd.as_ref().to_string_lossy(), join_args(&args)),
            stderr: stderr.trim_end().to_string(),
        });
    }

    // INVARIANT: Chomp trailing newlines.
    Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
}

fn join_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// All possible error types for source repository access.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Git binary could not be run at all.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Git ran but reported failure.
    #[error("command {command:?} failed:\n{stderr}")]
    Failed { command: String, stderr: String },

    /// Git output did not have the expected shape.
    #[error("unexpected output from {command}: {output:?}")]
    MalformedOutput { command: String, output: String },
}

/// Friendly result alias :3
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
