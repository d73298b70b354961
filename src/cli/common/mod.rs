// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Things shared between `omp` subcommands.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::path::Path;

use log::debug;

use crate::query::{ArchiveConfig, ConfigError, CONFIG_FILE_TYPES_COMMA_SEPARATED};

lazy_static::lazy_static! {
    pub(super) static ref CONFIG_HELP: String =
        format!("An archive configuration file describing telescopes, tables and columns. The built-in UKIRT and JCMT configuration is used if this isn't given. Supported formats: {}", *CONFIG_FILE_TYPES_COMMA_SEPARATED);
}

/// Read the archive configuration from the given file, or use the built-in
/// one.
pub(super) fn load_config(file: Option<&Path>) -> Result<ArchiveConfig, ConfigError> {
    match file {
        Some(file) => ArchiveConfig::from_file(file),
        None => {
            debug!("Using the built-in archive configuration");
            Ok(ArchiveConfig::default())
        }
    }
}
