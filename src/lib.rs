// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Snapshot a content repository and extract its inventory.
//!
//! Given a ref, and optionally a calendar day, a run of the pipeline:
//!
//! 1. Brings a local working copy of the content repository to the one commit
//!    implied by the ref and day. See [`snapshot`].
//! 2. Extracts the content inventory, the redirect table, and the commit
//!    provenance from that working copy. See [`extract`].
//! 3. Packages all three into an [`InventoryArtifact`] ready to be published.
//!
//! The same ref and day always yield the same commit, so historical
//! snapshots can be regenerated at will.

pub mod artifact;
pub mod config;
pub mod extract;
pub mod path;
pub mod pipeline;
pub mod snapshot;

pub use artifact::{InventoryArtifact, Metadata};
pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineError, Reporter, Stage, TracingReporter};
