// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Summarise MSB-done ledger events.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::OmpError;
use crate::ledger::{read_events_file, summarize};

#[derive(Parser, Debug)]
pub struct LedgerSummaryArgs {
    /// Path to a json or yaml file holding an array of ledger events.
    #[clap(name = "EVENTS_FILE", parse(from_os_str))]
    events: PathBuf,
}

impl LedgerSummaryArgs {
    pub fn run(&self) -> Result<(), OmpError> {
        let events = read_events_file(&self.events)?;
        info!("Read {} events from {}", events.len(), self.events.display());

        let summaries = summarize(events);
        info!("{} MSBs:", summaries.len());
        println!("{}", serde_json::to_string_pretty(&summaries)?);

        Ok(())
    }
}
