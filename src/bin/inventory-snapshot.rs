// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use inventory_snapshot::{
    config::PipelineConfig,
    path::default_config_path,
    snapshot::{cleanup, date::TargetDate},
    InventoryArtifact, Pipeline, Reporter, Stage,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::{fs::read_to_string, path::PathBuf, process::exit, time::Duration};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  inventory-snapshot [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = load_config(self.config)?;
        match self.command {
            Command::Snapshot(opts) => run_snapshot(config, opts),
            Command::Clean(opts) => run_clean(config, opts),
            Command::Config(opts) => run_config(config, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Snapshot repository and write inventory artifact.
    #[command(override_usage = "inventory-snapshot snapshot [options]")]
    Snapshot(SnapshotOptions),

    /// Remove working copy.
    #[command(override_usage = "inventory-snapshot clean [options]")]
    Clean(CleanOptions),

    /// Show effective configuration.
    #[command(override_usage = "inventory-snapshot config [options]")]
    Config(ConfigOptions),
}

#[derive(Args, Clone, Debug)]
struct SnapshotOptions {
    /// Branch, tag, or commit to snapshot.
    #[arg(short, long = "ref", value_name = "ref")]
    pub git_ref: Option<String>,

    /// Snapshot the state of the ref as of the start of this day.
    #[arg(short, long, value_name = "YYYY-MM-DD")]
    pub date: Option<TargetDate>,

    /// Path to working copy.
    #[arg(short, long, value_name = "path")]
    pub path: Option<PathBuf>,

    /// Write artifact to file or directory instead of stdout.
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,

    /// Remove working copy after a successful run.
    #[arg(long, conflicts_with = "no_cleanup")]
    pub cleanup: bool,

    /// Keep working copy even if configuration asks for cleanup.
    #[arg(long)]
    pub no_cleanup: bool,

    /// Do not install inventory tool dependencies before running it.
    #[arg(long)]
    pub skip_install: bool,
}

#[derive(Args, Clone, Debug)]
struct CleanOptions {
    /// Path to working copy.
    #[arg(short, long, value_name = "path")]
    pub path: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct ConfigOptions {
    /// Snapshot day to show in effective configuration.
    #[arg(short, long, value_name = "YYYY-MM-DD")]
    pub date: Option<TargetDate>,
}

/// Report pipeline stages on a spinner.
struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.yellow} {elapsed_precise:.green}  {msg}",
        )?);
        bar.enable_steady_tick(Duration::from_millis(100));

        Ok(Self { bar })
    }
}

impl Reporter for SpinnerReporter {
    fn stage(&self, stage: Stage) {
        self.bar.suspend(|| info!("{stage}"));
        self.bar.set_message(stage.to_string());
    }

    fn finish(&self, artifact: &InventoryArtifact) {
        self.bar.finish_and_clear();
        info!(
            "snapshot of {} authored {} complete with {} redirects",
            artifact.metadata.commit_short,
            artifact.metadata.author_date,
            artifact.redirects.len()
        );
    }
}

impl Drop for SpinnerReporter {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let path = match path {
        Some(path) => path,
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                info!("no configuration at {:?}, using defaults", path.display());
                return Ok(PipelineConfig::default());
            }
            path
        }
    };

    let data = read_to_string(&path)
        .with_context(|| format!("cannot read configuration {:?}", path.display()))?;
    data.parse()
        .with_context(|| format!("cannot parse configuration {:?}", path.display()))
}

impl SnapshotOptions {
    /// Override configuration with whatever was given on the command line.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(git_ref) = &self.git_ref {
            config.snapshot.git_ref = git_ref.clone();
        }
        if let Some(date) = self.date {
            config.snapshot.date = Some(date);
        }
        if let Some(path) = &self.path {
            config.repository.path = path.clone();
        }
        if self.cleanup {
            config.snapshot.cleanup = true;
        }
        if self.no_cleanup {
            config.snapshot.cleanup = false;
        }
    }
}

fn run_snapshot(mut config: PipelineConfig, opts: SnapshotOptions) -> Result<()> {
    opts.apply(&mut config);

    let mut pipeline = Pipeline::new(config);
    if opts.skip_install {
        pipeline = pipeline.skip_install();
    }

    let reporter = SpinnerReporter::new()?;
    let artifact = pipeline.run(&reporter)?;

    match opts.output {
        Some(output) => {
            artifact.write_to(&output)?;
        }
        None => println!("{}", artifact.to_json()?),
    }

    Ok(())
}

fn run_clean(config: PipelineConfig, opts: CleanOptions) -> Result<()> {
    cleanup(&opts.path.unwrap_or(config.repository.path));
    Ok(())
}

fn run_config(mut config: PipelineConfig, opts: ConfigOptions) -> Result<()> {
    if let Some(date) = opts.date {
        config.snapshot.date = Some(date);
        info!("{date} resolves against {}", date.normalize());
    }
    print!("{config}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot_options(args: &[&str]) -> anyhow::Result<SnapshotOptions> {
        let argv = ["inventory-snapshot", "snapshot"].into_iter().chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv)?;
        match cli.command {
            Command::Snapshot(opts) => Ok(opts),
            other => anyhow::bail!("unexpected command {other:?}"),
        }
    }

    fn configured_cleanup(cleanup: bool) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.snapshot.cleanup = cleanup;
        config
    }

    #[test]
    fn cleanup_flags_override_configuration() -> anyhow::Result<()> {
        let mut config = configured_cleanup(true);
        snapshot_options(&["--no-cleanup"])?.apply(&mut config);
        assert!(!config.snapshot.cleanup);

        let mut config = configured_cleanup(false);
        snapshot_options(&["--cleanup"])?.apply(&mut config);
        assert!(config.snapshot.cleanup);

        let mut config = configured_cleanup(true);
        snapshot_options(&[])?.apply(&mut config);
        assert!(config.snapshot.cleanup);

        Ok(())
    }

    #[test]
    fn cleanup_flags_conflict() {
        let result = snapshot_options(&["--cleanup", "--no-cleanup"]);
        assert!(result.is_err());
    }

    #[test]
    fn options_override_ref_and_date() -> anyhow::Result<()> {
        let mut config = PipelineConfig::default();
        snapshot_options(&["--ref", "main", "--date", "2024-01-15"])?.apply(&mut config);

        assert_eq!(config.snapshot.git_ref, "main");
        assert_eq!(config.snapshot.date, Some("2024-01-15".parse::<TargetDate>()?));
        Ok(())
    }
}
