// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error handling for the command-line interface.
//!
//! Library errors are converted into [`OmpError`], so that whoever is running
//! `omp` gets one category of message per kind of problem.

use thiserror::Error;

use crate::{
    ledger::{LedgerError, EVENT_KINDS_COMMA_SEPARATED},
    msb::{DocumentError, MsbError, NotFoundError},
    query::{ConfigError, MalformedQueryError},
    range::InvalidRangeError,
};

/// The *only* publicly visible error from omp.
#[derive(Error, Debug)]
pub enum OmpError {
    /// A query that couldn't be turned into SQL.
    #[error("{0}")]
    Query(String),

    /// An archive configuration file problem.
    #[error("{0}\n\nThe built-in configuration is used when --config isn't given")]
    Config(String),

    /// A science programme that couldn't be read or consolidated.
    #[error("{0}")]
    Msb(String),

    /// MSB-done ledger events that couldn't be read.
    #[error("{0}\n\nValid event kinds are: {}", *EVENT_KINDS_COMMA_SEPARATED)]
    Ledger(String),

    /// An error related to reading or writing files.
    #[error("{0}")]
    FileIO(String),

    /// A generic error that can't be clarified further with documentation.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<MalformedQueryError> for OmpError {
    fn from(e: MalformedQueryError) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<InvalidRangeError> for OmpError {
    fn from(e: InvalidRangeError) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<ConfigError> for OmpError {
    fn from(e: ConfigError) -> Self {
        let s = e.to_string();
        match e {
            ConfigError::IO(e) => Self::from(e),
            _ => Self::Config(s),
        }
    }
}

impl From<MsbError> for OmpError {
    fn from(e: MsbError) -> Self {
        Self::Msb(e.to_string())
    }
}

impl From<DocumentError> for OmpError {
    fn from(e: DocumentError) -> Self {
        Self::Msb(e.to_string())
    }
}

impl From<NotFoundError> for OmpError {
    fn from(e: NotFoundError) -> Self {
        Self::Msb(e.to_string())
    }
}

impl From<LedgerError> for OmpError {
    fn from(e: LedgerError) -> Self {
        let s = e.to_string();
        match e {
            LedgerError::IO(e) => Self::from(e),
            LedgerError::UnrecognisedExtension(_) => Self::FileIO(s),
            LedgerError::Json(_) | LedgerError::Yaml(_) => Self::Ledger(s),
        }
    }
}

impl From<std::io::Error> for OmpError {
    fn from(e: std::io::Error) -> Self {
        Self::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for OmpError {
    fn from(e: serde_json::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
