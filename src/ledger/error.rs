// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

use super::LEDGER_FILE_TYPES_COMMA_SEPARATED;

/// Errors associated with reading MSB-done ledger events.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger file '{}' doesn't have a recognised file extension! Valid extensions are: {}", .0.display(), *LEDGER_FILE_TYPES_COMMA_SEPARATED)]
    UnrecognisedExtension(PathBuf),

    #[error("Couldn't decode json ledger events: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Couldn't decode yaml ledger events: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
