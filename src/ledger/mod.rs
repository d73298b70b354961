// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The MSB-done ledger.
//!
//! Every time something happens to an MSB (it's fetched, accepted, rejected,
//! commented on, ...) an event row is recorded. [`summarize`] collapses a flat
//! list of those rows into one [`MsbSummary`] per MSB.

mod error;
#[cfg(test)]
mod tests;

pub use error::LedgerError;

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    str::FromStr,
};

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

lazy_static::lazy_static! {
    pub(crate) static ref LEDGER_FILE_TYPES_COMMA_SEPARATED: String = LedgerFileType::iter().join(", ");

    pub(crate) static ref EVENT_KINDS_COMMA_SEPARATED: String = EventKind::iter().join(", ");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// An MSB was retrieved for observing. Only recorded so that the MSB's
    /// details are known even if nothing else ever happens to it.
    Fetch,
    Accept,
    Reject,
    Comment,
    Undo,
    Suspend,
    Abort,
    AllDone,
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// The MSB's checksum.
    pub msb_key: String,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    pub kind: EventKind,

    pub timestamp: NaiveDateTime,

    #[serde(default)]
    pub text: Option<String>,

    /// Who did it.
    #[serde(default)]
    pub actor: Option<String>,
}

/// Everything that happened to one MSB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsbSummary {
    pub msb_key: String,
    pub project_id: Option<String>,
    pub target: Option<String>,
    pub title: Option<String>,

    /// In the order they were recorded.
    pub events: Vec<LedgerEvent>,

    /// The number of times the MSB was accepted.
    pub repeat_count: usize,
}

impl MsbSummary {
    fn new(msb_key: &str) -> MsbSummary {
        MsbSummary {
            msb_key: msb_key.to_string(),
            project_id: None,
            target: None,
            title: None,
            events: vec![],
            repeat_count: 0,
        }
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.events.last().map(|e| e.timestamp)
    }
}

/// Group ledger events by MSB. Each MSB's events stay in the order given;
/// fetch events are dropped from an MSB that has anything else recorded. The
/// summaries are sorted by project, target and the time of their last event.
pub fn summarize(events: Vec<LedgerEvent>) -> Vec<MsbSummary> {
    let num_events = events.len();
    let mut by_key: IndexMap<String, MsbSummary> = IndexMap::new();
    for event in events {
        let summary = by_key
            .entry(event.msb_key.clone())
            .or_insert_with(|| MsbSummary::new(&event.msb_key));

        if summary.project_id.is_none() {
            summary.project_id = event.project_id.clone();
        }
        if summary.target.is_none() {
            summary.target = event.target.clone();
        }
        if summary.title.is_none() {
            summary.title = event.title.clone();
        }
        if event.kind == EventKind::Accept {
            summary.repeat_count += 1;
        }
        summary.events.push(event);
    }

    let mut summaries: Vec<MsbSummary> = by_key
        .into_iter()
        .map(|(_, mut summary)| {
            if summary.events.iter().any(|e| e.kind != EventKind::Fetch) {
                summary.events.retain(|e| e.kind != EventKind::Fetch);
            }
            summary
        })
        .collect();
    summaries.sort_by(|a, b| {
        (&a.project_id, &a.target, a.last_timestamp()).cmp(&(
            &b.project_id,
            &b.target,
            b.last_timestamp(),
        ))
    });

    debug!(
        "{num_events} ledger events summarised into {} MSBs",
        summaries.len()
    );
    summaries
}

/// The file types that ledger events can be read from.
#[derive(Debug, Clone, Copy, Display, EnumIter, EnumString)]
pub(crate) enum LedgerFileType {
    #[strum(serialize = "json")]
    Json,

    #[strum(to_string = "yaml", serialize = "yml")]
    Yaml,
}

pub fn events_from_json<R: Read>(reader: R) -> Result<Vec<LedgerEvent>, LedgerError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn events_from_yaml<R: Read>(reader: R) -> Result<Vec<LedgerEvent>, LedgerError> {
    Ok(serde_yaml::from_reader(reader)?)
}

/// Read ledger events from a json or yaml file, depending on its extension.
pub fn read_events_file<P: AsRef<Path>>(file: P) -> Result<Vec<LedgerEvent>, LedgerError> {
    fn inner(file: &Path) -> Result<Vec<LedgerEvent>, LedgerError> {
        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| LedgerFileType::from_str(&e.to_lowercase()).ok())
            .ok_or_else(|| LedgerError::UnrecognisedExtension(file.to_path_buf()))?;
        trace!("Reading {file_type} ledger events from {}", file.display());

        let reader = BufReader::new(File::open(file)?);
        match file_type {
            LedgerFileType::Json => events_from_json(reader),
            LedgerFileType::Yaml => events_from_yaml(reader),
        }
    }
    inner(file.as_ref())
}
