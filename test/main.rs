// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use chrono::DateTime;
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions, Signature, Time};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Upstream repository whose commits carry fixed timestamps.
pub(crate) struct RepoFixture {
    dir: TempDir,
    repo: Repository,
}

impl RepoFixture {
    pub(crate) fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path().join("upstream"), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { dir, repo })
    }

    /// URL to clone the fixture from.
    pub(crate) fn url(&self) -> String {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .to_string_lossy()
            .into_owned()
    }

    /// Scratch directory that is removed along with the fixture.
    pub(crate) fn scratch(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Stage file and commit it with author and committer time set to `when`.
    ///
    /// Returns the full identifier of the new commit.
    pub(crate) fn stage_and_commit(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
        when: &str,
    ) -> Result<String> {
        self.stage_and_commit_at(filename, contents, when, when)
    }

    /// Stage file and commit it with separate author and committer times.
    ///
    /// Returns the full identifier of the new commit.
    pub(crate) fn stage_and_commit_at(
        &self,
        filename: impl AsRef<Path>,
        contents: impl AsRef<str>,
        authored: &str,
        committed: &str,
    ) -> Result<String> {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.as_ref().len() as u32,
            id: self.repo.blob(contents.as_ref().as_bytes())?,
            flags: 0,
            flags_extended: 0,
            path: filename
                .as_ref()
                .as_os_str()
                .to_string_lossy()
                .into_owned()
                .into_bytes(),
        };

        // INVARIANT: Always use new tree produced by index after staging new entry.
        let mut index = self.repo.index()?;
        index.add_frombuffer(&entry, contents.as_ref().as_bytes())?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let author = signature(authored)?;
        let committer = signature(committed)?;

        let mut parents = Vec::new();
        if let Some(parent) = self.repo.head().ok().and_then(|head| head.target()) {
            parents.push(self.repo.find_commit(parent)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        let oid = self.repo.commit(
            Some("HEAD"),
            &author,
            &committer,
            format!("chore: update {:?}", filename.as_ref()).as_ref(),
            &tree,
            &parents,
        )?;

        Ok(oid.to_string())
    }
}

fn signature(when: &str) -> Result<Signature<'static>> {
    let when = DateTime::parse_from_rfc3339(when)?;
    let time = Time::new(when.timestamp(), when.offset().local_minus_utc() / 60);
    Ok(Signature::new("John Doe", "john@doe.com", &time)?)
}
