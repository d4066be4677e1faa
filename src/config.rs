// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that drives the snapshot
//! pipeline to simplify the process of serialization and deserialization.
//! File I/O is left to the caller to figure out.
//!
//! # General Layout
//!
//! ```toml
//! [repository]
//! url = "https://github.com/mdn/content.git"
//! path = "content"
//! remote = "origin"
//! clone = "blobless"
//!
//! [snapshot]
//! ref = "origin/main"
//! date = "2024-01-15"
//! cleanup = false
//!
//! [redirects]
//! path = "files/en-us/_redirects.txt"
//! capture = true
//!
//! [tool]
//! program = "yarn"
//! args = ["-s", "content", "inventory"]
//! install = ["yarn", "install", "--frozen-lockfile"]
//! ```
//!
//! Every section and every field is optional. Missing values fall back to
//! their defaults.

use crate::{path::default_work_dir, snapshot::date::TargetDate};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Full pipeline configuration.
///
/// Passed explicitly into [`Pipeline`](crate::pipeline::Pipeline). There is
/// no global configuration state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source repository and its working copy.
    pub repository: RepositorySettings,

    /// Which state of the repository to snapshot.
    pub snapshot: SnapshotSettings,

    /// Where the redirect table lives inside the working copy.
    pub redirects: RedirectSettings,

    /// External inventory tool invocation.
    pub tool: ToolSettings,
}

impl FromStr for PipelineConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: PipelineConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on working copy path.
        config.repository.path = PathBuf::from(
            shellexpand::full(config.repository.path.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        Ok(config)
    }
}

impl Display for PipelineConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Source repository settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Remote URL to clone the repository from. SSH and HTTPS both work.
    pub url: String,

    /// Local path of the working copy.
    pub path: PathBuf,

    /// Name of the remote fetched before resolving commits.
    pub remote: String,

    /// How much of the repository to transfer on clone.
    pub clone: CloneStrategy,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            url: "https://github.com/mdn/content.git".into(),
            path: default_work_dir(),
            remote: "origin".into(),
            clone: CloneStrategy::default(),
        }
    }
}

/// Snapshot target settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SnapshotSettings {
    /// Branch, tag, or commit to snapshot.
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Snapshot the state of the ref as of the start of this day.
    pub date: Option<TargetDate>,

    /// Remove the working copy after a successful run.
    pub cleanup: bool,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            git_ref: "origin/main".into(),
            date: None,
            cleanup: false,
        }
    }
}

/// Redirect table settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectSettings {
    /// Path of the redirect file relative to the working copy.
    pub path: PathBuf,

    /// Read the redirect file at all. When disabled the artifact carries an
    /// empty redirect table.
    pub capture: bool,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("files/en-us/_redirects.txt"),
            capture: true,
        }
    }
}

/// External inventory tool settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Program that prints the inventory as JSON on stdout.
    pub program: String,

    /// Arguments passed to the program.
    pub args: Vec<String>,

    /// Command that installs the tool's dependencies, run before the tool.
    pub install: Option<Vec<String>>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: "yarn".into(),
            args: vec!["-s".into(), "content".into(), "inventory".into()],
            install: Some(vec![
                "yarn".into(),
                "install".into(),
                "--frozen-lockfile".into(),
            ]),
        }
    }
}

/// Clone filter strategy.
///
/// Partial clones skip object content up front, and let Git fetch it on
/// demand during checkout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneStrategy {
    /// Transfer everything.
    Full,

    /// Skip file content, i.e., `--filter=blob:none`.
    #[default]
    Blobless,

    /// Skip trees and file content, i.e., `--filter=tree:0`.
    Treeless,
}

impl CloneStrategy {
    /// Object filter passed to git-clone, if any.
    pub fn filter(&self) -> Option<&'static str> {
        match self {
            Self::Full => None,
            Self::Blobless => Some("blob:none"),
            Self::Treeless => Some("tree:0"),
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("SNAPSHOT_HOME", "/var/cache/snapshot")])]
    fn deserialize_pipeline_config() -> anyhow::Result<()> {
        let result: PipelineConfig = r#"
            [repository]
            url = "git@github.com:mdn/content.git"
            path = "$SNAPSHOT_HOME/content"
            remote = "upstream"
            clone = "treeless"

            [snapshot]
            ref = "upstream/main"
            date = "2024-01-15"
            cleanup = true

            [redirects]
            path = "files/_redirects.txt"
            capture = false

            [tool]
            program = "node"
            args = ["scripts/inventory.js", "--json"]
            install = ["npm", "ci"]
        "#
        .parse()?;

        let expect = PipelineConfig {
            repository: RepositorySettings {
                url: "git@github.com:mdn/content.git".into(),
                path: PathBuf::from("/var/cache/snapshot/content"),
                remote: "upstream".into(),
                clone: CloneStrategy::Treeless,
            },
            snapshot: SnapshotSettings {
                git_ref: "upstream/main".into(),
                date: Some("2024-01-15".parse()?),
                cleanup: true,
            },
            redirects: RedirectSettings {
                path: PathBuf::from("files/_redirects.txt"),
                capture: false,
            },
            tool: ToolSettings {
                program: "node".into(),
                args: vec!["scripts/inventory.js".into(), "--json".into()],
                install: Some(vec!["npm".into(), "ci".into()]),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_partial_config_fills_defaults() -> anyhow::Result<()> {
        let result: PipelineConfig = r#"
            [snapshot]
            date = "2023-06-01"
        "#
        .parse()?;

        let expect = PipelineConfig {
            snapshot: SnapshotSettings {
                date: Some("2023-06-01".parse()?),
                ..SnapshotSettings::default()
            },
            ..PipelineConfig::default()
        };

        assert_eq!(result, expect);
        assert_eq!(result.repository.path, PathBuf::from("content"));
        assert_eq!(result.snapshot.git_ref, "origin/main");
        assert!(result.redirects.capture);

        Ok(())
    }

    #[test]
    fn deserialize_rejects_malformed_date() {
        let result = r#"
            [snapshot]
            date = "15/01/2024"
        "#
        .parse::<PipelineConfig>();

        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn serialize_pipeline_config() {
        let result = PipelineConfig {
            repository: RepositorySettings {
                url: "https://example.org/content.git".into(),
                path: PathBuf::from("/tmp/content"),
                remote: "origin".into(),
                clone: CloneStrategy::Full,
            },
            snapshot: SnapshotSettings {
                git_ref: "v1.0.0".into(),
                date: None,
                cleanup: false,
            },
            redirects: RedirectSettings::default(),
            tool: ToolSettings {
                program: "node".into(),
                args: vec!["inventory.js".into(), "--json".into()],
                install: None,
            },
        }
        .to_string();

        let expect = indoc! {r#"
            [repository]
            url = "https://example.org/content.git"
            path = "/tmp/content"
            remote = "origin"
            clone = "full"

            [snapshot]
            ref = "v1.0.0"
            cleanup = false

            [redirects]
            path = "files/en-us/_redirects.txt"
            capture = true

            [tool]
            program = "node"
            args = [
                "inventory.js",
                "--json",
            ]
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn clone_strategy_filters() {
        assert_eq!(CloneStrategy::Full.filter(), None);
        assert_eq!(CloneStrategy::Blobless.filter(), Some("blob:none"));
        assert_eq!(CloneStrategy::Treeless.filter(), Some("tree:0"));
    }
}
