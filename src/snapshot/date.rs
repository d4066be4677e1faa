// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Date-based commit selection.
//!
//! A snapshot can target "the state of a ref as of day D". The day is turned
//! into one fixed instant, one second past midnight UTC, so that the same day
//! always selects the same commit regardless of where or when the pipeline
//! runs. The selected commit is the latest one reachable from the ref whose
//! author time falls strictly before that instant. Author time is also what
//! the artifact reports, so the reported time always precedes the target day.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Calendar day to snapshot, written as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetDate(NaiveDate);

impl TargetDate {
    /// Construct new target date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Instant that commits must strictly precede to be selected.
    pub fn normalize(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(self.0.and_time(NaiveTime::MIN) + TimeDelta::seconds(1)))
    }
}

impl FromStr for TargetDate {
    type Err = DateError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(data.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|source| DateError {
                input: data.to_string(),
                source,
            })
    }
}

impl TryFrom<String> for TargetDate {
    type Error = DateError;

    fn try_from(data: String) -> Result<Self, Self::Error> {
        data.parse()
    }
}

impl From<TargetDate> for String {
    fn from(date: TargetDate) -> Self {
        date.to_string()
    }
}

impl Display for TargetDate {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Commit identifier paired with its author time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStamp {
    /// Full commit identifier.
    pub id: String,

    /// Author time.
    pub time: DateTime<Utc>,
}

impl CommitStamp {
    pub fn new(id: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            time,
        }
    }
}

/// Select the latest commit strictly before `instant`.
///
/// The history is expected in history order, i.e., newest reachable commit
/// first. Author times are not guaranteed to be monotonic along history, so
/// every entry is considered. When several candidates share the latest time,
/// the one appearing first in history order wins.
pub fn select_before(history: &[CommitStamp], instant: DateTime<Utc>) -> Option<&CommitStamp> {
    let mut selected: Option<&CommitStamp> = None;
    for stamp in history.iter().filter(|stamp| stamp.time < instant) {
        match selected {
            Some(best) if best.time >= stamp.time => continue,
            _ => selected = Some(stamp),
        }
    }

    selected
}

/// Target date could not be parsed.
#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid target date {input:?}, expected YYYY-MM-DD")]
pub struct DateError {
    input: String,
    source: chrono::ParseError,
}
