// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Redirect table parsing.
//!
//! The redirect file maps retired URL paths to their replacement, one mapping
//! per line:
//!
//! ```text
//! # comments, blank lines, and anything else not starting with "/" are ignored
//! /en-US/docs/Old_page	/en-US/docs/New_page
//! ```
//!
//! Source and target are separated by the first tab on the line. Lines that
//! do not start with "/", have no tab, or leave either side empty are
//! skipped. When the same source shows up more than once, the last line wins.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs::read_to_string, io, path::Path};

/// Mapping of retired URL paths to their replacement.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RedirectTable(BTreeMap<String, String>);

impl RedirectTable {
    /// Construct new empty redirect table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse redirect table from file content.
    pub fn parse(content: &str) -> Self {
        content
            .lines()
            .filter(|line| line.starts_with('/'))
            .filter_map(|line| line.split_once('\t'))
            .filter(|(source, target)| !source.is_empty() && !target.is_empty())
            .collect()
    }

    /// Read and parse redirect file.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if file cannot be read, e.g., it does not exist.
    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        read_to_string(path.as_ref()).map(|content| Self::parse(&content))
    }

    /// Lookup target of source path.
    pub fn get(&self, source: &str) -> Option<&str> {
        self.0.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S, T> FromIterator<(S, T)> for RedirectTable
where
    S: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        // INVARIANT: Later entries overwrite earlier ones on duplicate source.
        Self(
            iter.into_iter()
                .map(|(source, target)| (source.into(), target.into()))
                .collect(),
        )
    }
}
