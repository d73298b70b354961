// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use super::CONFIG_FILE_TYPES_COMMA_SEPARATED;
use crate::range::InvalidRangeError;

/// Errors associated with a query that doesn't make sense. These are never
/// recovered from; the caller must show them to whoever wrote the query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedQueryError {
    #[error("Could not parse the query XML: {0}")]
    Xml(String),

    #[error("Query tag '{key}' was given more than once with different shapes")]
    DuplicateTag { key: String },

    #[error("Only one telescope may be queried at a time, but got: {}", .0.join(", "))]
    MultipleTelescopes(Vec<String>),

    #[error("Unrecognised telescope '{0}'")]
    UnknownTelescope(String),

    #[error("Unrecognised instrument '{0}'")]
    UnknownInstrument(String),

    #[error("Instrument '{instrument}' belongs to {implied}, but the query asked for telescope {explicit}")]
    TelescopeConflict {
        instrument: String,
        implied: String,
        explicit: String,
    },

    #[error("The requested instruments span more than one telescope ({})", .0.join(", "))]
    InstrumentsSpanTelescopes(Vec<String>),

    #[error("Instruments '{first}' and '{second}' cannot be queried together")]
    IncompatibleInstruments { first: String, second: String },

    #[error("A telescope or an instrument must be specified")]
    NoTelescope,

    #[error("No tables specified")]
    NoTables,

    #[error("Table '{0}' is not known to the archive configuration")]
    UnknownTable(String),

    #[error("Query tag '{key}': could not interpret '{value}' as {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Query tag '{key}' only accepts a single value")]
    MultipleValues { key: String },

    #[error("Query tag '{key}': {source}")]
    InvalidRange {
        key: String,
        source: InvalidRangeError,
    },

    #[error("Query tag '{key}': both range bounds must be of the same type")]
    MixedRangeBounds { key: String },

    #[error("Query tag '{key}' has a range without a minimum or a maximum")]
    UnboundedRange { key: String },

    #[error("Query tag '{key}' has no values")]
    EmptyValues { key: String },

    #[error("Query tag '{key}' is an empty group")]
    EmptyGroup { key: String },

    #[error("Query tag '{key}' has a value of the wrong shape")]
    Misshapen { key: String },

    #[error("'{0}' is not a valid column name")]
    InvalidColumn(String),
}

/// Errors associated with reading or checking an archive configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file '{}' doesn't have a recognised file extension! Valid extensions are: {}", .0.display(), *CONFIG_FILE_TYPES_COMMA_SEPARATED)]
    UnrecognisedExtension(PathBuf),

    #[error("Couldn't decode toml structure from '{}': {err}", .file.display())]
    Toml { file: PathBuf, err: toml::de::Error },

    #[error("Couldn't decode json structure from '{}': {err}", .file.display())]
    Json {
        file: PathBuf,
        err: serde_json::Error,
    },

    #[error("Telescope '{0}' is configured more than once")]
    DuplicateTelescope(String),

    #[error("Table '{0}' is configured more than once")]
    DuplicateTable(String),

    #[error("{context} refers to table '{table}', which isn't configured")]
    UnknownTable { context: String, table: String },

    #[error("Instrument '{instrument}' refers to telescope '{telescope}', which isn't configured")]
    UnknownTelescope {
        instrument: String,
        telescope: String,
    },

    #[error("'{0}' is not a valid column name")]
    InvalidColumn(String),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
