// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Snapshot pipeline.
//!
//! Tie snapshot resolution and inventory extraction together into one run:
//! resolve the working copy first, then extract the artifact from it. Every
//! failure aborts the run. The working copy is only removed after a
//! successful run, and only if the configuration asks for it, so a failed
//! run can be inspected afterwards.

use crate::{
    artifact::InventoryArtifact,
    config::PipelineConfig,
    extract::{
        tool::{CommandRunner, InventoryToolRunner},
        ExtractError, InventoryExtractor,
    },
    snapshot::{
        client::{GitCli, RepositoryClient},
        RefSpec, RepositoryHandle, SnapshotError, SnapshotResolver,
    },
};

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{info, instrument};

/// Step of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Sync,
    Resolve,
    Checkout,
    Install,
    Extract,
    Cleanup,
}

impl Display for Stage {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Acquire => "acquire working copy",
            Self::Sync => "fetch latest history",
            Self::Resolve => "resolve commit",
            Self::Checkout => "checkout commit",
            Self::Install => "install inventory tool dependencies",
            Self::Extract => "extract inventory",
            Self::Cleanup => "remove working copy",
        })
    }
}

/// Sink for pipeline progress.
pub trait Reporter {
    /// Pipeline entered a new stage.
    fn stage(&self, stage: Stage);

    /// Pipeline produced its artifact.
    fn finish(&self, _artifact: &InventoryArtifact) {}
}

/// Report pipeline progress through tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage(&self, stage: Stage) {
        info!("{stage}");
    }

    fn finish(&self, artifact: &InventoryArtifact) {
        info!(
            "snapshot of {} complete with {} redirects",
            artifact.metadata.commit_short,
            artifact.redirects.len()
        );
    }
}

/// One configured snapshot pipeline.
#[derive(Debug)]
pub struct Pipeline<C = GitCli, R = CommandRunner>
where
    C: RepositoryClient,
    R: InventoryToolRunner,
{
    config: PipelineConfig,
    client: C,
    runner: R,
    install: bool,
}

impl Pipeline {
    /// Construct new pipeline that shells out to Git and the inventory tool.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_clients(config, GitCli::default(), CommandRunner)
    }
}

impl<C, R> Pipeline<C, R>
where
    C: RepositoryClient,
    R: InventoryToolRunner,
{
    /// Construct new pipeline with custom repository client and tool runner.
    pub fn with_clients(config: PipelineConfig, client: C, runner: R) -> Self {
        Self {
            config,
            client,
            runner,
            install: true,
        }
    }

    /// Skip the dependency install step, e.g., when the caller already ran it.
    pub fn skip_install(mut self) -> Self {
        self.install = false;
        self
    }

    /// Run the pipeline once.
    ///
    /// # Errors
    ///
    /// - Return [`PipelineError::Snapshot`] if the working copy cannot be
    ///   brought to the target commit.
    /// - Return [`PipelineError::Extract`] if the artifact cannot be
    ///   extracted from the working copy.
    #[instrument(skip(self, reporter), level = "debug")]
    pub fn run(&self, reporter: &dyn Reporter) -> Result<InventoryArtifact> {
        let settings = &self.config.repository;
        let handle = RepositoryHandle {
            url: settings.url.clone(),
            path: settings.path.clone(),
            remote: settings.remote.clone(),
            clone: settings.clone,
        };
        let spec = RefSpec::new(
            self.config.snapshot.git_ref.clone(),
            self.config.snapshot.date,
        );

        let resolver = SnapshotResolver::new(&self.client, handle);
        reporter.stage(Stage::Acquire);
        resolver.acquire()?;
        reporter.stage(Stage::Sync);
        resolver.sync()?;
        reporter.stage(Stage::Resolve);
        let commit = resolver.resolve_commit(&spec)?;
        reporter.stage(Stage::Checkout);
        resolver.checkout(&commit)?;

        let extractor = InventoryExtractor::new(
            &self.client,
            &self.runner,
            &settings.path,
            self.config.redirects.clone(),
            self.config.tool.clone(),
        );
        if self.install {
            reporter.stage(Stage::Install);
            extractor.install_dependencies()?;
        }
        reporter.stage(Stage::Extract);
        let artifact = extractor.assemble()?;

        if self.config.snapshot.cleanup {
            reporter.stage(Stage::Cleanup);
            resolver.cleanup();
        }
        reporter.finish(&artifact);

        Ok(artifact)
    }
}

/// All possible error types for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Snapshot resolution fails.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Inventory extraction fails.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Friendly result alias :3
type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{RedirectSettings, RepositorySettings, SnapshotSettings, ToolSettings},
        extract::tests::{fail, head, succeed, FakeRunner},
        snapshot::{date::CommitStamp, tests::FakeRepository},
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::{cell::RefCell, path::Path};

    #[derive(Debug, Default)]
    struct RecordingReporter {
        stages: RefCell<Vec<Stage>>,
        finished: RefCell<bool>,
    }

    impl Reporter for RecordingReporter {
        fn stage(&self, stage: Stage) {
            self.stages.borrow_mut().push(stage);
        }

        fn finish(&self, _artifact: &InventoryArtifact) {
            *self.finished.borrow_mut() = true;
        }
    }

    fn repository() -> FakeRepository {
        FakeRepository {
            history: vec![CommitStamp::new(head().id, head().author_date)],
            head: Some(head()),
            ..FakeRepository::default()
        }
    }

    fn config(work_dir: &Path, cleanup: bool) -> PipelineConfig {
        PipelineConfig {
            repository: RepositorySettings {
                path: work_dir.to_path_buf(),
                ..RepositorySettings::default()
            },
            snapshot: SnapshotSettings {
                cleanup,
                ..SnapshotSettings::default()
            },
            redirects: RedirectSettings::default(),
            tool: ToolSettings {
                program: "inventory".into(),
                args: Vec::new(),
                install: Some(vec!["yarn".into(), "install".into()]),
            },
        }
    }

    fn work_dir(root: &Path) -> anyhow::Result<std::path::PathBuf> {
        let work_dir = root.join("content");
        let redirects = work_dir.join(RedirectSettings::default().path);
        mkdirp::mkdirp(redirects.parent().unwrap())?;
        std::fs::write(redirects, "/a\t/b\n")?;
        Ok(work_dir)
    }

    #[test]
    fn run_produces_artifact_through_every_stage() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let work_dir = work_dir(root.path())?;
        let repo = repository();
        let runner = FakeRunner::default()
            .with("yarn", succeed(""))
            .with("inventory", succeed(r#"[{"path": "files/en-us/web/index.md"}]"#));
        let reporter = RecordingReporter::default();

        let artifact = Pipeline::with_clients(config(&work_dir, false), &repo, &runner)
            .run(&reporter)?;

        assert_eq!(artifact.metadata.commit, head().id);
        assert_eq!(artifact.inventory, json!([{ "path": "files/en-us/web/index.md" }]));
        assert_eq!(artifact.redirects.get("/a"), Some("/b"));
        assert_eq!(
            reporter.stages.borrow().clone(),
            vec![
                Stage::Acquire,
                Stage::Sync,
                Stage::Resolve,
                Stage::Checkout,
                Stage::Install,
                Stage::Extract,
            ]
        );
        assert!(*reporter.finished.borrow());
        assert!(work_dir.exists());
        Ok(())
    }

    #[test]
    fn run_without_install_skips_install_command() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let work_dir = work_dir(root.path())?;
        let repo = repository();
        let runner = FakeRunner::default().with("inventory", succeed("{}"));

        Pipeline::with_clients(config(&work_dir, false), &repo, &runner)
            .skip_install()
            .run(&TracingReporter)?;

        assert_eq!(runner.runs.borrow().clone(), vec!["inventory"]);
        Ok(())
    }

    #[test]
    fn cleanup_after_successful_run() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let work_dir = work_dir(root.path())?;
        let repo = repository();
        let runner = FakeRunner::default()
            .with("yarn", succeed(""))
            .with("inventory", succeed("{}"));

        Pipeline::with_clients(config(&work_dir, true), &repo, &runner).run(&TracingReporter)?;

        assert!(!work_dir.exists());
        Ok(())
    }

    #[test]
    fn failed_run_keeps_working_copy() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let work_dir = work_dir(root.path())?;
        let repo = repository();
        let runner = FakeRunner::default()
            .with("yarn", succeed(""))
            .with("inventory", fail(1, "boom"));

        let result =
            Pipeline::with_clients(config(&work_dir, true), &repo, &runner).run(&TracingReporter);

        assert!(matches!(
            result,
            Err(PipelineError::Extract(ExtractError::InventoryComputation { .. }))
        ));
        assert!(work_dir.exists());
        Ok(())
    }

    #[test]
    fn snapshot_failure_stops_before_extraction() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let repo = FakeRepository {
            fail_fetch: true,
            ..repository()
        };
        let runner = FakeRunner::default();

        let result = Pipeline::with_clients(config(root.path(), false), &repo, &runner)
            .run(&TracingReporter);

        assert!(matches!(result, Err(PipelineError::Snapshot(SnapshotError::Sync { .. }))));
        assert!(runner.runs.borrow().is_empty());
        Ok(())
    }
}
